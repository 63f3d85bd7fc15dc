//! Canonical request pieces: URI, query string and headers.

use reqwest::header::HeaderMap;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Query parameters keyed by name, values kept in a list per key.
pub(crate) type QueryValues = BTreeMap<String, Vec<String>>;

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

fn escape(s: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) || (keep_slash && b == b'/') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Percent-encode a query key or value. Spaces become `%20`, never `+`.
pub(crate) fn escape_query(s: &str) -> String {
    escape(s, false)
}

/// Percent-encode a path, leaving `/` separators alone.
pub(crate) fn escape_path(s: &str) -> String {
    escape(s, true)
}

/// Path component of the canonical request.
///
/// For an opaque target (`//host/bucket/key`) the first three `/`-separated parts are dropped
/// and the remainder is used verbatim; only a regular URL path is escaped.
pub(crate) fn canonical_uri(url: &Url, opaque: Option<&str>, escape_uri: bool) -> String {
    let uri = match opaque {
        Some(o) if !o.is_empty() => {
            let rest: Vec<&str> = o.split('/').skip(3).collect();
            format!("/{}", rest.join("/"))
        }
        _ if escape_uri => escape_path(url.path()),
        _ => url.path().to_string(),
    };
    if uri.is_empty() {
        "/".to_string()
    } else {
        uri
    }
}

pub(crate) fn parse_query(url: &Url) -> QueryValues {
    let mut values = QueryValues::new();
    for (k, v) in url.query_pairs() {
        values.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    values
}

/// Encode query values sorted by key, and by value within a key.
pub(crate) fn canonical_query(values: &QueryValues) -> String {
    let mut parts = Vec::new();
    for (key, vals) in values {
        let mut sorted: Vec<&String> = vals.iter().collect();
        sorted.sort();
        let key = escape_query(key);
        for v in sorted {
            parts.push(format!("{}={}", key, escape_query(v)));
        }
    }
    parts.join("&")
}

/// Trim surrounding spaces and collapse inner runs of spaces to one.
pub(crate) fn strip_excess_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for c in s.trim_matches(' ').chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}

/// `host[:port]` as written in the URL.
pub(crate) fn url_authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Result of header canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CanonicalHeaders {
    /// `name:value` lines joined with `\n` (no trailing newline).
    pub canonical: String,
    /// Sorted lowercase names joined with `;`.
    pub signed: String,
}

/// Canonicalize `headers`, always including `host`. `ignore` filters out names.
///
/// Repeated values of a header are comma-joined in insertion order.
pub(crate) fn canonical_headers(
    headers: &HeaderMap,
    host: &str,
    ignore: impl Fn(&str) -> bool,
) -> CanonicalHeaders {
    let mut names: BTreeSet<String> = BTreeSet::new();
    names.insert("host".to_string());
    for name in headers.keys() {
        let name = name.as_str();
        if name == "host" || ignore(name) {
            continue;
        }
        names.insert(name.to_string());
    }

    let lines: Vec<String> = names
        .iter()
        .map(|name| {
            if name == "host" {
                return format!("host:{}", strip_excess_spaces(host));
            }
            let values: Vec<String> = headers
                .get_all(name.as_str())
                .iter()
                .map(|v| strip_excess_spaces(&String::from_utf8_lossy(v.as_bytes())))
                .collect();
            format!("{}:{}", name, values.join(","))
        })
        .collect();

    CanonicalHeaders {
        canonical: lines.join("\n"),
        signed: names.into_iter().collect::<Vec<_>>().join(";"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn query_is_sorted_and_uses_percent20() {
        let url = Url::parse("https://cp.example.com/api?b=2&a=x+y&a=b%2Bc&empty=").unwrap();
        let q = parse_query(&url);
        assert_eq!(canonical_query(&q), "a=b%2Bc&a=x%20y&b=2&empty=");
    }

    #[test]
    fn unreserved_characters_survive_escaping() {
        assert_eq!(escape_query("AZaz09-_.~"), "AZaz09-_.~");
        assert_eq!(escape_query("a/b:c"), "a%2Fb%3Ac");
        assert_eq!(escape_path("/api/v1/instances/kf-1/acls:enable"), "/api/v1/instances/kf-1/acls%3Aenable");
    }

    #[test]
    fn opaque_uri_drops_scheme_and_host_components() {
        let url = Url::parse("https://dynamodb.private.amazonaws.com").unwrap();
        let uri = canonical_uri(&url, Some("//example.org/bucket/key-._~,!@#$%^&*()"), true);
        assert_eq!(uri, "/bucket/key-._~,!@#$%^&*()");
    }

    #[test]
    fn regular_paths_are_escaped_unless_disabled() {
        let url = Url::parse("https://cp.example.com/api/v1/instances/kf-1/acls:enable").unwrap();
        assert_eq!(canonical_uri(&url, None, true), "/api/v1/instances/kf-1/acls%3Aenable");
        assert_eq!(canonical_uri(&url, None, false), "/api/v1/instances/kf-1/acls:enable");
    }

    #[test]
    fn empty_path_becomes_slash() {
        let url = Url::parse("https://cp.example.com").unwrap();
        assert_eq!(canonical_uri(&url, None, true), "/");
    }

    #[test]
    fn header_values_are_trimmed_and_collapsed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-automq-meta-a", HeaderValue::from_static("  one   two  three "));
        let c = canonical_headers(&headers, "cp.example.com", |_| false);
        assert_eq!(c.canonical, "host:cp.example.com\nx-automq-meta-a:one two three");
        assert_eq!(c.signed, "host;x-automq-meta-a");
    }

    #[test]
    fn repeated_headers_join_in_insertion_order() {
        let mut headers = HeaderMap::new();
        let name = HeaderName::from_static("x-automq-meta-multi");
        headers.append(name.clone(), HeaderValue::from_static("second"));
        headers.append(name, HeaderValue::from_static("first"));
        let c = canonical_headers(&headers, "h", |_| false);
        assert!(c.canonical.ends_with("x-automq-meta-multi:second,first"));
    }

    #[test]
    fn ignored_headers_are_dropped_and_host_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("old"));
        headers.insert("host", HeaderValue::from_static("override.example.com"));
        let c = canonical_headers(&headers, "override.example.com", |n| n == "authorization");
        assert_eq!(c.signed, "host");
        assert_eq!(c.canonical, "host:override.example.com");
    }

    #[test]
    fn authority_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/api").unwrap();
        assert_eq!(url_authority(&url), "127.0.0.1:8080");
        let url = Url::parse("https://cp.example.com/api").unwrap();
        assert_eq!(url_authority(&url), "cp.example.com");
    }
}
