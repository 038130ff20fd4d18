//! Parses, escapes, compares and resolves pairs of URIs.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use percent_encoding::{
    AsciiSet, CONTROLS, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode,
};
use url::{Host, ParseError, Position, Url, form_urlencoded};

/// Characters escaped by the lenient escaping variant.
const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Base used only to check that a relative reference is well formed.
const SYNTAX_BASE: &str = "http://syntax.invalid/";

/// Two candidate URIs cut out of one fuzz input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPair {
    pub domain_relative: bool,
    pub first: String,
    pub second: String,
}

impl UriPair {
    /// Last byte selects root-relative output for base removal, the rest is
    /// split in half. Each half ends at its first NUL, like a C string would.
    pub fn split(data: &[u8]) -> Self {
        let (domain_relative, rest) = match data.split_last() {
            Some((&flag, rest)) => (flag & 1 == 1, rest),
            None => (false, data),
        };
        let (first, second) = rest.split_at(rest.len() / 2);
        Self {
            domain_relative,
            first: c_string_lossy(first),
            second: c_string_lossy(second),
        }
    }
}

fn c_string_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// A parsed URI reference: absolute, or relative and kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriRef {
    Absolute(Url),
    Relative(String),
}

impl UriRef {
    /// Relative references must resolve against a base and must not carry
    /// whitespace or control characters, which `url` would silently escape.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match Url::parse(text) {
            Ok(url) => Ok(Self::Absolute(url)),
            Err(ParseError::RelativeUrlWithoutBase) => {
                if text.chars().any(|c| c.is_whitespace() || c.is_control()) {
                    return Err(ParseError::RelativeUrlWithoutBase);
                }
                Url::parse(SYNTAX_BASE)?.join(text)?;
                Ok(Self::Relative(text.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Absolute(url) => url.as_str(),
            Self::Relative(text) => text,
        }
    }

    /// Absolute references are reparsed from their serialization; relative
    /// ones are left alone.
    fn normalized(self) -> Self {
        match self {
            Self::Absolute(url) => {
                let reparsed = discard("uri normalize", Url::parse(url.as_str()));
                Self::Absolute(reparsed.unwrap_or(url))
            }
            relative => relative,
        }
    }
}

/// What the URI calls produced; only used to observe the harness in tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UriReport {
    pub serialized: Option<String>,
    pub equal: Option<bool>,
    pub joined: Option<String>,
    pub relative: Option<String>,
}
fn normalize_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\r\n")
}

fn escapes(text: &str) {
    for normalize in [true, false] {
        let source = if normalize {
            normalize_breaks(text)
        } else {
            text.to_string()
        };
        for space_to_plus in [true, false] {
            let escaped: String = if space_to_plus {
                form_urlencoded::byte_serialize(source.as_bytes()).collect()
            } else {
                utf8_percent_encode(&source, NON_ALPHANUMERIC).to_string()
            };
            let _ = discard("uri unescape", percent_decode_str(&escaped).decode_utf8());
        }
        let _ = utf8_percent_encode(&source, FRAGMENT).to_string();
    }
}

fn file_names(text: &str) {
    let path = format!("/{}", text.trim_start_matches('/'));
    if let Ok(url) = Url::from_file_path(&path) {
        let _ = url.to_file_path();
    }
}

fn ipv4(text: &str) {
    let _ = discard("uri host", Host::parse(text));
}

/// `source` expressed relative to `base`. Root-relative output keeps the
/// whole path from `/` and only drops the shared scheme and authority.
fn remove_base(source: &Url, base: &Url, root_relative: bool) -> Option<String> {
    if !root_relative {
        return base.make_relative(source);
    }
    let authority = Position::BeforeUsername..Position::AfterPort;
    if source.scheme() != base.scheme() || source[authority.clone()] != base[authority] {
        return None;
    }
    Some(source[Position::BeforePath..].to_string())
}

/// Runs the full URI sequence on a pair, stopping where a parse fails.
///
/// The second URI is the base: the first is resolved against it, then
/// expressed relative to it again.
pub fn exercise_pair(pair: &UriPair) -> UriReport {
    let mut report = UriReport::default();
    for text in [&pair.first, &pair.second] {
        escapes(text);
        file_names(text);
        ipv4(text);
    }

    let Some(first) = discard("uri parse first", UriRef::parse(&pair.first)) else {
        return report;
    };
    report.serialized = Some(first.as_str().to_string());

    let Some(second) = discard("uri parse second", UriRef::parse(&pair.second)) else {
        return report;
    };
    report.equal = Some(first == second);

    let source = first.normalized();
    let UriRef::Absolute(base) = second else {
        return report;
    };
    report.joined = discard("uri add base", base.join(source.as_str())).map(String::from);
    if let UriRef::Absolute(source) = &source {
        report.relative = remove_base(source, &base, pair.domain_relative);
    }
    report
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UriParseHarness;

impl Harness for UriParseHarness {
    fn name(&self) -> &'static str {
        "uri-parse"
    }

    fn exercise(&self, data: &[u8], _ctx: &HarnessContext) -> Outcome {
        let _ = exercise_pair(&UriPair::split(data));
        Outcome::Exercised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(domain_relative: bool, first: &str, second: &str) -> Vec<u8> {
        let mut data = first.as_bytes().to_vec();
        data.extend_from_slice(second.as_bytes());
        data.push(u8::from(domain_relative));
        data
    }

    fn uri_pair(domain_relative: bool, first: &str, second: &str) -> UriPair {
        UriPair {
            domain_relative,
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    #[test]
    fn split_takes_flag_from_last_byte_and_halves_the_rest() {
        let split = UriPair::split(&pair(true, "http://a/", "http://b/"));
        assert!(split.domain_relative);
        assert_eq!(split.first, "http://a/");
        assert_eq!(split.second, "http://b/");

        let split = UriPair::split(b"http://a/http://b/\x02");
        assert!(!split.domain_relative);
        assert_eq!(split.first, "http://a/");

        let empty = UriPair::split(&[]);
        assert!(!empty.domain_relative);
        assert!(empty.first.is_empty() && empty.second.is_empty());
    }

    #[test]
    fn split_stops_each_half_at_nul() {
        let split = UriPair::split(b"ab\x00dxy\x00z\x01");
        assert!(split.domain_relative);
        assert_eq!(split.first, "ab");
        assert_eq!(split.second, "dxy");
    }

    #[test]
    fn relative_first_uri_resolves_against_the_base() {
        let report = exercise_pair(&uri_pair(false, "../d?q", "http://h/a/b/c"));
        assert_eq!(report.serialized.as_deref(), Some("../d?q"));
        assert_eq!(report.equal, Some(false));
        assert_eq!(report.joined.as_deref(), Some("http://h/a/d?q"));
        assert_eq!(report.relative, None);
    }

    #[test]
    fn absolute_source_is_made_relative_to_the_base() {
        let report = exercise_pair(&uri_pair(
            false,
            "http://example.com/a/d",
            "http://example.com/a/b/c",
        ));
        assert_eq!(report.serialized.as_deref(), Some("http://example.com/a/d"));
        assert_eq!(report.equal, Some(false));
        assert_eq!(report.joined.as_deref(), Some("http://example.com/a/d"));
        assert_eq!(report.relative.as_deref(), Some("../d"));

        let report = exercise_pair(&uri_pair(
            true,
            "http://example.com/a/d?x#f",
            "http://example.com/a/b/c",
        ));
        assert_eq!(report.relative.as_deref(), Some("/a/d?x#f"));

        let report = exercise_pair(&uri_pair(true, "http://other.com/a", "http://example.com/"));
        assert_eq!(report.relative, None);
    }

    #[test]
    fn relative_base_skips_resolution() {
        let report = exercise_pair(&uri_pair(false, "http://example.com/", "a/b"));
        assert_eq!(report.equal, Some(false));
        assert_eq!(report.joined, None);
        assert_eq!(report.relative, None);
    }

    #[test]
    fn stops_after_first_unparseable_uri() {
        let report = exercise_pair(&uri_pair(true, "http://example.com/", "not a uri"));
        assert!(report.serialized.is_some());
        assert_eq!(report.equal, None);
        assert_eq!(report.joined, None);

        let report = exercise_pair(&uri_pair(false, "http://[::1", "http://example.com/"));
        assert_eq!(report, UriReport::default());
    }

    #[test]
    fn harness_handles_arbitrary_bytes() {
        let ctx = HarnessContext::default();
        let inputs: [&[u8]; 4] = [b"", b"\x01", b"\xff\xfe\r\n%%%", b"\x00http://[::1]:80/\x00"];
        for data in inputs {
            assert_eq!(UriParseHarness.exercise(data, &ctx), Outcome::Exercised);
        }
    }
}
