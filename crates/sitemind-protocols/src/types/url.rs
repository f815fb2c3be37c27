//! URL keys: normalized cache patterns and hostname domains.

use url::Url;

/// Domain used when a URL carries no hostname.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Normalize a URL into a cache pattern: `host + path`, trailing slash
/// stripped, query and fragment dropped. Only the host is lowercased.
///
/// The result is itself a valid input, so the operation is idempotent:
///
/// ```
/// use sitemind_protocols::normalize_url;
///
/// let a = normalize_url("https://X.com/a/?sid=123");
/// assert_eq!(a, "x.com/a");
/// assert_eq!(normalize_url(&a), a);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(parsed) = Url::parse(raw) {
        if let Some(host) = parsed.host_str() {
            let path = parsed.path().trim_end_matches('/');
            return format!("{}{}", host.to_ascii_lowercase(), path);
        }
    }
    normalize_textual(raw)
}

/// Hostname of a URL, lowercased. Never the full URL.
pub fn domain_of(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(parsed) = Url::parse(raw) {
        if let Some(host) = parsed.host_str() {
            return host.to_ascii_lowercase();
        }
    }

    let rest = strip_scheme(raw);
    let host = rest
        .split(['/', ':', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if host.is_empty() {
        UNKNOWN_DOMAIN.to_string()
    } else {
        host
    }
}

/// Whether `target` is an absolute http(s) URL rather than a selector.
pub fn is_absolute_url(target: &str) -> bool {
    Url::parse(target.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn strip_scheme(raw: &str) -> &str {
    match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    }
}

fn normalize_textual(raw: &str) -> String {
    let rest = strip_scheme(raw);
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let rest = rest[..end].trim_end_matches('/');

    match rest.split_once('/') {
        Some((host, path)) => format!("{}/{}", host.to_ascii_lowercase(), path),
        None => rest.to_ascii_lowercase(),
    }
}
