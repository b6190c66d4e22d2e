//! URL helpers shared by the session and the extraction adapters.

use url::Url;

/// Whether the browser session may load `url`: absolute http(s) only
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

/// Lowercased host of a URL, used to key per-host pacing
#[must_use]
pub fn host_key(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Resolve an `href` found on `base` into an absolute http(s) URL
///
/// Returns `None` for fragments, `javascript:` links and anything that does
/// not resolve to http(s).
#[must_use]
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let base = Url::parse(base).ok()?;
    let mut joined = base.join(href).ok()?;
    if !matches!(joined.scheme(), "http" | "https") {
        return None;
    }
    joined.set_fragment(None);
    Some(joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_href() {
        assert_eq!(
            resolve_href("https://jobs.example.com/search?q=rust", "/view/42").as_deref(),
            Some("https://jobs.example.com/view/42")
        );
        assert_eq!(
            resolve_href("https://jobs.example.com/a/b", "c#apply").as_deref(),
            Some("https://jobs.example.com/a/c")
        );
        assert_eq!(resolve_href("https://jobs.example.com/", "#top"), None);
        assert_eq!(
            resolve_href("https://jobs.example.com/", "javascript:void(0)"),
            None
        );
    }

    #[test]
    fn test_host_key_is_lowercase() {
        assert_eq!(
            host_key("https://WWW.LinkedIn.com/jobs").as_deref(),
            Some("www.linkedin.com")
        );
        assert_eq!(host_key("not a url"), None);
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://remoteok.com/remote-rust-jobs"));
        assert!(!is_valid_url("mailto:jobs@example.com"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("ftp://example.com"));
    }
}
