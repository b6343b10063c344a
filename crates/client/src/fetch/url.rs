//! Origin canonicalization and request URL resolution.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not a path: {0}")]
    NotAPath(String),
}

/// Canonicalize the upstream origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to http:// if missing
/// 3. Lowercase the host
/// 4. Drop path, query and fragment; only scheme, host and port remain
pub fn canonicalize_origin(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a path (with optional query) against the origin.
///
/// Only origin-relative paths are accepted, so a request can never be
/// steered to another host.
pub fn resolve(origin: &url::Url, path_and_query: &str) -> Result<url::Url, UrlError> {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return Err(UrlError::NotAPath(path_and_query.to_string()));
    }

    let mut resolved = origin
        .join(path_and_query)
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);

    Ok(resolved)
}
