//! Header classification rules for canonicalization and presign hoisting.
//!
//! All matching is done on lowercase header names (`http::HeaderName` is always lowercase).

/// Headers never included in the signature.
const IGNORED_HEADERS: &[&str] = &["authorization", "user-agent"];

/// Headers that must stay signed headers even when presigning.
const REQUIRED_SIGNED_HEADERS: &[&str] = &[
    "cache-control",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-md5",
    "content-type",
    "expires",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-unmodified-since",
    "range",
    "x-automq-content-sha256",
];

const REQUIRED_SIGNED_PREFIXES: &[&str] = &["x-automq-meta-"];

/// Prefix of headers eligible for hoisting into the query string.
const HOISTABLE_PREFIX: &str = "x-automq-";

pub(crate) fn is_ignored(name: &str) -> bool {
    IGNORED_HEADERS.contains(&name)
}

pub(crate) fn is_required_signed(name: &str) -> bool {
    REQUIRED_SIGNED_HEADERS.contains(&name)
        || REQUIRED_SIGNED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// `X-Automq-*` headers that are not required-signed move to the query when presigning.
pub(crate) fn is_hoistable(name: &str) -> bool {
    name.starts_with(HOISTABLE_PREFIX) && !is_required_signed(name)
}

/// Canonical MIME form of a header name: `x-automq-target` -> `X-Automq-Target`.
pub(crate) fn canonical_mime_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = c == '-';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_and_user_agent_are_ignored() {
        assert!(is_ignored("authorization"));
        assert!(is_ignored("user-agent"));
        assert!(!is_ignored("content-type"));
    }

    #[test]
    fn meta_headers_are_never_hoisted() {
        assert!(is_required_signed("x-automq-meta-owner"));
        assert!(!is_hoistable("x-automq-meta-owner"));
        assert!(!is_hoistable("x-automq-content-sha256"));
        assert!(is_hoistable("x-automq-target"));
        assert!(!is_hoistable("content-type"));
    }

    #[test]
    fn canonical_mime_key_capitalizes_segments() {
        assert_eq!(canonical_mime_key("x-automq-target"), "X-Automq-Target");
        assert_eq!(
            canonical_mime_key("x-automq-meta-other-header_with_underscore"),
            "X-Automq-Meta-Other-Header_with_underscore"
        );
    }
}
