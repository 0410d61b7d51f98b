//! Outlet map: route segments navigated in each part or view outlet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Route segments keyed by part or view id.
pub type Outlets = BTreeMap<String, Vec<UrlSegment>>;

/// One `/`-separated route segment with its matrix parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSegment {
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl UrlSegment {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Characters with a meaning in the path syntax, and their escapes.
const RESERVED: [(char, &str); 4] = [('%', "%25"), ('/', "%2F"), (';', "%3B"), ('=', "%3D")];

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match RESERVED.iter().find(|(reserved, _)| *reserved == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Undo [`escape`]. Any other `%` sequence is kept verbatim.
fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        match RESERVED
            .iter()
            .find(|(_, code)| tail.get(..3).is_some_and(|head| head.eq_ignore_ascii_case(code)))
        {
            Some((reserved, _)) => {
                out.push(*reserved);
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `a;x=1/b` into segments. Empty segments are skipped; a parameter
/// without `=` maps to the empty string. `%2F`, `%3B`, `%3D` and `%25`
/// decode to `/`, `;`, `=` and `%`.
#[must_use]
pub fn parse_path(path: &str) -> Vec<UrlSegment> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut pieces = segment.split(';');
            let mut parsed = UrlSegment::new(unescape(pieces.next().unwrap_or_default()));
            for parameter in pieces.filter(|piece| !piece.is_empty()) {
                let (key, value) = parameter.split_once('=').unwrap_or((parameter, ""));
                let _ = parsed.parameters.insert(unescape(key), unescape(value));
            }
            parsed
        })
        .collect()
}

/// Format segments so that [`parse_path`] returns them unchanged, provided
/// every segment has a non-empty path or at least one parameter.
///
/// The text itself is normalized: parameters come out sorted and always
/// carry `=`, so `a;flag` formats as `a;flag=`.
#[must_use]
pub fn format_path(segments: &[UrlSegment]) -> String {
    segments
        .iter()
        .map(|segment| {
            segment
                .parameters
                .iter()
                .fold(escape(&segment.path), |mut out, (key, value)| {
                    out.push(';');
                    out.push_str(&escape(key));
                    out.push('=');
                    out.push_str(&escape(value));
                    out
                })
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segments_and_matrix_parameters() {
        let segments = parse_path("/todos;filter=open;page=2/detail/");
        assert_eq!(
            segments,
            vec![
                UrlSegment::new("todos")
                    .with_parameter("filter", "open")
                    .with_parameter("page", "2"),
                UrlSegment::new("detail"),
            ]
        );
    }

    #[test]
    fn parameter_without_value_is_empty() {
        let segments = parse_path("a;flag");
        assert_eq!(segments[0].parameters.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn empty_path_has_no_segments() {
        assert!(parse_path("").is_empty());
        assert!(parse_path("//").is_empty());
    }

    #[test]
    fn format_is_inverse_of_parse() {
        let path = "todos;filter=open/detail";
        assert_eq!(format_path(&parse_path(path)), path);
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let segments = vec![
            UrlSegment::new("a/b;c").with_parameter("q=1", "x/y;z=%"),
            UrlSegment::new("plain").with_parameter("flag", ""),
        ];
        let formatted = format_path(&segments);
        assert_eq!(formatted, "a%2Fb%3Bc;q%3D1=x%2Fy%3Bz%3D%25/plain;flag=");
        assert_eq!(parse_path(&formatted), segments);
    }

    #[test]
    fn unknown_escapes_are_kept_verbatim() {
        let segments = parse_path("100%;k=%41%2f%");
        assert_eq!(segments[0].path, "100%");
        assert_eq!(segments[0].parameters.get("k").map(String::as_str), Some("%41/%"));
        assert_eq!(parse_path(&format_path(&segments)), segments);
    }

    #[test]
    fn valueless_parameter_is_normalized_but_survives() {
        let segments = parse_path("a;flag");
        assert_eq!(format_path(&segments), "a;flag=");
        assert_eq!(parse_path(&format_path(&segments)), segments);
    }

    mod round_trip {
        use super::*;
        use proptest::prelude::*;

        fn text() -> impl Strategy<Value = String> {
            "[a-z0-9/;=%. ]{0,8}"
        }

        fn segment() -> impl Strategy<Value = UrlSegment> {
            (
                "[a-z0-9/;=%. ]{1,8}",
                prop::collection::btree_map(text(), text(), 0..3),
            )
                .prop_map(|(path, parameters)| UrlSegment { path, parameters })
        }

        proptest! {
            #[test]
            fn parse_inverts_format(segments in prop::collection::vec(segment(), 0..4)) {
                prop_assert_eq!(parse_path(&format_path(&segments)), segments);
            }
        }
    }
}
