use crate::UrlError;
use url::Url;

/// Normalizes a URL for use as a crawl key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host
/// 4. Remove the fragment (everything after #)
///
/// Host lowercasing, dot-segment removal and the empty-path-to-`/` rule are
/// applied by the parser itself. Trailing slashes are kept because they
/// decide the on-disk location of a page (`/docs/` maps to
/// `docs/index.html`, `/docs` maps to `docs`).
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/a/../b#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/b");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolves a raw `href`/`src` value against the URL of the page it was found on
///
/// The fragment is stripped before resolving; a reference that is empty
/// after stripping (`#top`, `""`) has no target. Results that are not HTTP(S)
/// (`mailto:`, `javascript:`, `data:`) are discarded.
pub fn resolve_reference(raw: &str, base: &Url) -> Option<Url> {
    let without_fragment = raw.split('#').next().unwrap_or_default().trim();
    if without_fragment.is_empty() {
        return None;
    }

    let resolved = base.join(without_fragment).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Returns true when both URLs share scheme, host and port
pub fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

/// Returns true when two URLs address the same page, ignoring a trailing slash
pub fn is_same_page(a: &Url, b: &Url) -> bool {
    a.as_str().trim_end_matches('/') == b.as_str().trim_end_matches('/')
}
