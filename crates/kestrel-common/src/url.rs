//! URL resolution utilities.
//!
//! [URL Standard](https://url.spec.whatwg.org/)
//!
//! Kestrel only needs enough URL handling to follow links, fetch
//! subresources, and submit forms, so URLs stay plain strings.

/// [§ 2.5 URLs](https://html.spec.whatwg.org/multipage/urls-and-fetching.html#resolving-urls)
///
/// Resolve a potentially relative URL against a base URL.
///
/// # Algorithm
///
/// STEP 1: "If url is an absolute URL, return url."
///
/// STEP 2: "Otherwise, resolve url relative to base."
///
/// Relative paths walk `..` segments up the base directory.
#[must_use]
pub fn resolve_url(href: &str, base_url: Option<&str>) -> String {
    // STEP 1: Check if href is already absolute.
    if href.contains("://") || href.starts_with("data:") || href.starts_with("about:") {
        return href.to_string();
    }

    // STEP 2: Resolve relative URL against base.
    let Some(base) = base_url else {
        return href.to_string();
    };

    let scheme_end = base.find("://");

    if let Some(rest) = href.strip_prefix("//") {
        // Protocol-relative URL - prepend scheme from base
        let scheme = scheme_end.map_or("http", |end| &base[..end]);
        return format!("{scheme}://{rest}");
    }

    // Origin is everything up to the first '/' after "scheme://".
    let (origin, path) = scheme_end.map_or(("", base), |end| {
        let after_scheme = &base[end + 3..];
        after_scheme.find('/').map_or((base, "/"), |path_start| {
            base.split_at(end + 3 + path_start)
        })
    });

    if href.starts_with('/') {
        return format!("{origin}{href}");
    }

    let mut dir = path.rsplit_once('/').map_or("", |(dir, _)| dir).to_string();
    let mut rest = href;
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
        if let Some((parent, _)) = dir.rsplit_once('/') {
            dir = parent.to_string();
        }
    }
    format!("{origin}{dir}/{rest}")
}

/// [§ 4.10.21.8 URL-encoded form data](https://url.spec.whatwg.org/#urlencoded-serializing)
///
/// Percent-encode a form field name or value for an
/// `application/x-www-form-urlencoded` body. Unreserved characters pass
/// through unchanged and a space becomes `%20`.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_is_unchanged() {
        assert_eq!(
            resolve_url("http://example.org/a", Some("http://other.org/b")),
            "http://example.org/a"
        );
    }

    #[test]
    fn test_host_relative_url() {
        assert_eq!(
            resolve_url("/style.css", Some("http://example.org/dir/page.html")),
            "http://example.org/style.css"
        );
    }

    #[test]
    fn test_path_relative_url() {
        assert_eq!(
            resolve_url("next.html", Some("http://example.org/dir/page.html")),
            "http://example.org/dir/next.html"
        );
    }

    #[test]
    fn test_parent_segments_walk_up() {
        assert_eq!(
            resolve_url("../up.html", Some("http://example.org/a/b/page.html")),
            "http://example.org/a/up.html"
        );
    }

    #[test]
    fn test_file_paths_resolve_without_scheme() {
        assert_eq!(
            resolve_url("style.css", Some("/tmp/site/index.html")),
            "/tmp/site/style.css"
        );
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("hello world&x=1"), "hello%20world%26x%3D1");
        assert_eq!(percent_encode("a-b_c.d~"), "a-b_c.d~");
    }
}
