//! Subject-key normalization.
//!
//! The same page must map to the same cache row no matter how the caller
//! spelled its URL. Non-URL keys (article ids) pass through trimmed.

use url::Url;

/// Normalize a subject key.
///
/// For URLs: the fragment is dropped (it never changes the document) and a
/// trailing slash on a non-root path is removed. Scheme and host casing are
/// normalized by the URL parser. Anything that does not parse as a URL is
/// treated as an opaque id and only trimmed.
pub fn normalize_subject_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/').to_string();
        url.set_path(&stripped);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_dropped() {
        assert_eq!(
            normalize_subject_key("https://example.com/about#team"),
            "https://example.com/about"
        );
    }

    #[test]
    fn test_trailing_slash_stripped() {
        assert_eq!(
            normalize_subject_key("https://example.com/about/"),
            "https://example.com/about"
        );
    }

    #[test]
    fn test_root_slash_kept() {
        assert_eq!(normalize_subject_key("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_host_case_normalized() {
        assert_eq!(
            normalize_subject_key("HTTPS://Example.COM/About"),
            "https://example.com/About"
        );
    }

    #[test]
    fn test_spellings_converge() {
        let a = normalize_subject_key("https://example.com/blog/post-1/");
        let b = normalize_subject_key("https://example.com/blog/post-1#comments");
        assert_eq!(a, b);
    }

    #[test]
    fn test_opaque_id_trimmed() {
        assert_eq!(normalize_subject_key("  article:42 "), "article:42");
    }
}
