//! Captured HTTP responses.

use bytes::Bytes;

/// Response headers that belong to one client and never go into a shared cache.
const PER_CLIENT_HEADERS: &[&str] = &["set-cookie", "set-cookie2"];

/// A full response snapshot: status, headers and body.
///
/// The same type carries network responses through the router and cached
/// entries out of storage, so a hit and a fresh fetch look alike to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Cache key of the request that produced this response.
    pub url: String,
    pub status: u16,
    /// Response headers in arrival order; names are lower case.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// RFC 3339 timestamp of when the response was received.
    pub fetched_at: String,
}

impl Snapshot {
    pub fn new(url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: headers.into_iter().map(|(n, v)| (n.to_ascii_lowercase(), v)).collect(),
            body: body.into(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// A JSON response built locally rather than received.
    pub fn json(url: impl Into<String>, status: u16, value: &serde_json::Value) -> Self {
        Self::new(
            url,
            status,
            vec![("content-type".into(), "application/json".into())],
            value.to_string().into_bytes(),
        )
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether `Cache-Control` forbids a shared cache from keeping this response.
    pub fn is_private(&self) -> bool {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("cache-control"))
            .flat_map(|(_, v)| v.split(','))
            .map(|directive| directive.trim().split('=').next().unwrap_or_default().to_ascii_lowercase())
            .any(|directive| directive == "private" || directive == "no-store")
    }

    /// The copy a cache shared by every client may store: per-client headers
    /// such as `set-cookie` removed. `None` for a private or no-store response.
    pub fn shareable(&self) -> Option<Snapshot> {
        if self.is_private() {
            return None;
        }
        let mut copy = self.clone();
        copy.headers.retain(|(n, _)| !PER_CLIENT_HEADERS.iter().any(|h| n.eq_ignore_ascii_case(h)));
        Some(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lowercases_header_names() {
        let s = Snapshot::new("https://app.test/", 200, vec![("Content-Type".into(), "text/html".into())], "ok");
        assert_eq!(s.headers[0].0, "content-type");
        assert_eq!(s.content_type(), Some("text/html"));
    }

    #[test]
    fn test_is_ok() {
        assert!(Snapshot::new("u", 200, vec![], "").is_ok());
        assert!(Snapshot::new("u", 204, vec![], "").is_ok());
        assert!(!Snapshot::new("u", 304, vec![], "").is_ok());
        assert!(!Snapshot::new("u", 404, vec![], "").is_ok());
    }

    #[test]
    fn test_shareable_strips_cookies() {
        let s = Snapshot::new(
            "https://app.test/static/app.js",
            200,
            vec![
                ("Content-Type".into(), "application/javascript".into()),
                ("Set-Cookie".into(), "sessionid=alice-secret".into()),
            ],
            "js",
        );
        let shared = s.shareable().unwrap();
        assert_eq!(shared.header("set-cookie"), None);
        assert_eq!(shared.content_type(), Some("application/javascript"));
        assert_eq!(shared.body, s.body);
        assert_eq!(s.header("set-cookie"), Some("sessionid=alice-secret"));
    }

    #[test]
    fn test_private_and_no_store_not_shareable() {
        for value in ["private", "no-store", "max-age=60, Private", "private=\"set-cookie\""] {
            let s = Snapshot::new("u", 200, vec![("cache-control".into(), value.into())], "");
            assert!(s.is_private(), "{value}");
            assert!(s.shareable().is_none(), "{value}");
        }

        let s = Snapshot::new("u", 200, vec![("cache-control".into(), "public, max-age=31536000".into())], "");
        assert!(!s.is_private());
        assert!(s.shareable().is_some());
    }

    #[test]
    fn test_json_snapshot() {
        let s = Snapshot::json("https://app.test/api/x", 503, &serde_json::json!({"error": "down"}));
        assert_eq!(s.status, 503);
        assert_eq!(s.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&s.body).unwrap();
        assert_eq!(body["error"], "down");
    }
}
