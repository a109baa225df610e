//! Percent-encoding and header-folding primitives.
//!
//! The character sets here are deliberately narrow: a literal `+` is never
//! encoded, so it reaches the wire unchanged whichever calling convention
//! produced the request.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters encoded in a path segment.
///
/// `/` is included, so a substituted value never adds path segments.
pub const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

/// Characters encoded in a query parameter name or value.
pub const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'%')
    .add(b'&')
    .add(b'=')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

/// Characters encoded in a host substitution.
///
/// URL structure (`:`, `/`, `?`, `@`) survives, so a host parameter may carry
/// a complete base URL.
pub const HOST: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'%')
    .add(b'^')
    .add(b'|');

/// Percent-encode `value` against `set`.
///
/// Not idempotent: encoding already-encoded text turns every `%` into `%25`.
///
/// # Example
///
/// ```
/// use courier_core::encoding::{PATH_SEGMENT, percent_encode};
///
/// assert_eq!(percent_encode("with path+param", PATH_SEGMENT), "with%20path+param");
/// assert_eq!(percent_encode("A%20Z", PATH_SEGMENT), "A%2520Z");
/// ```
#[must_use]
pub fn percent_encode(value: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(value, set).to_string()
}

/// Normalize a value the caller asserts is already percent-encoded.
///
/// Valid `%HH` escapes and `+` are kept verbatim. A literal space becomes
/// `%20` and a `%` that does not start a valid escape becomes `%25`, so
/// `"with path"` and `"with%20path"` normalize to the same text.
#[must_use]
pub fn normalize_encoded(value: &str) -> Cow<'_, str> {
    let bytes = value.as_bytes();
    let needs_work = bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b' ' || (*b == b'%' && !is_escape(bytes, i)));
    if !needs_work {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for (i, ch) in value.char_indices() {
        match ch {
            ' ' => out.push_str("%20"),
            '%' if !is_escape(bytes, i) => out.push_str("%25"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn is_escape(bytes: &[u8], at: usize) -> bool {
    matches!(
        bytes.get(at + 1..at + 3),
        Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
    )
}

/// Fold header values into one, joined by `,`.
#[must_use]
pub fn join_header_values<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(value.as_ref());
    }
    out
}

/// Split a folded header value on `,`.
///
/// Splits on the exact delimiter only; surrounding whitespace is kept.
#[must_use]
pub fn split_header_value(value: &str) -> Vec<&str> {
    value.split(',').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segment_encodes_space_and_slash() {
        assert_eq!(
            percent_encode("with path param", PATH_SEGMENT),
            "with%20path%20param"
        );
        assert_eq!(percent_encode("a/b", PATH_SEGMENT), "a%2Fb");
    }

    #[test]
    fn plus_is_never_encoded() {
        assert_eq!(percent_encode("with+path+param", PATH_SEGMENT), "with+path+param");
        assert_eq!(percent_encode("x+y", QUERY_COMPONENT), "x+y");
        assert_eq!(percent_encode("x+y", HOST), "x+y");
    }

    #[test]
    fn percent_is_double_encoded() {
        assert_eq!(percent_encode("A%20Z", QUERY_COMPONENT), "A%2520Z");
        let once = percent_encode("a b", QUERY_COMPONENT);
        assert_eq!(percent_encode(&once, QUERY_COMPONENT), "a%2520b");
    }

    #[test]
    fn query_component_encodes_delimiters() {
        assert_eq!(percent_encode("a&b=c", QUERY_COMPONENT), "a%26b%3Dc");
        assert_eq!(percent_encode("x/y?z", QUERY_COMPONENT), "x/y?z");
    }

    #[test]
    fn host_keeps_url_structure() {
        assert_eq!(
            percent_encode("https://vault.example.net:443/", HOST),
            "https://vault.example.net:443/"
        );
    }

    #[test]
    fn non_ascii_is_utf8_encoded() {
        assert_eq!(percent_encode("café", PATH_SEGMENT), "caf%C3%A9");
    }

    #[test]
    fn normalize_encoded_space_and_escape_agree() {
        assert_eq!(normalize_encoded("with path param"), "with%20path%20param");
        assert_eq!(normalize_encoded("with%20path%20param"), "with%20path%20param");
        assert_eq!(normalize_encoded("with+path+param"), "with+path+param");
    }

    #[test]
    fn normalize_encoded_borrows_when_clean() {
        assert!(matches!(normalize_encoded("x%2Fy"), Cow::Borrowed(_)));
    }

    #[test]
    fn normalize_encoded_fixes_lone_percent() {
        assert_eq!(normalize_encoded("100%"), "100%25");
        assert_eq!(normalize_encoded("%zz"), "%25zz");
        assert_eq!(normalize_encoded("%2"), "%252");
    }

    #[test]
    fn header_values_round_trip() {
        let joined = join_header_values(["My", "Header", "Value"]);
        assert_eq!(joined, "My,Header,Value");
        assert_eq!(split_header_value(&joined), vec!["My", "Header", "Value"]);
    }

    #[test]
    fn split_header_value_does_not_trim() {
        assert_eq!(split_header_value("a, b"), vec!["a", " b"]);
        assert_eq!(split_header_value("single"), vec!["single"]);
        assert_eq!(split_header_value(""), vec![""]);
    }

    #[test]
    fn join_header_values_empty() {
        assert_eq!(join_header_values(Vec::<String>::new()), "");
    }
}
