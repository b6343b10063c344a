//! Cache key generation.

use url::Url;

/// Compute the key a response to `url` is cached under.
///
/// The fragment never reaches the server, so it is not part of the key.
/// The query string is kept as-is.
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}
