use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// First segment of every route served by the monitoring service.
pub const STATUS_PREFIX: &str = "status";

/// Bytes escaped inside a single segment. Only RFC 3986 unreserved characters pass through.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Path on the monitoring service, kept as individual segments until rendered.
///
/// Rendering percent-encodes every segment, so a field value can never add
/// segments or a query string to the outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPath {
    segments: Vec<String>,
}

/// Failure to turn a [`StatusPath`] into an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A segment that URL parsing would collapse as `.` or `..`.
    DotSegment(String),
    /// The joined URL did not parse.
    Url(url::ParseError),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DotSegment(segment) => write!(f, "invalid path segment {:?}", segment),
            Self::Url(e) => write!(f, "invalid status url: {}", e),
        }
    }
}

impl std::error::Error for PathError {}

impl StatusPath {
    /// Path for `route` under [`STATUS_PREFIX`], e.g. `/status/get_machines`.
    pub fn new(route: &str) -> Self {
        Self { segments: vec![STATUS_PREFIX.to_owned(), route.to_owned()] }
    }

    /// Append a segment rendered from `value`.
    #[must_use]
    pub fn segment(mut self, value: impl fmt::Display) -> Self {
        self.segments.push(value.to_string());
        self
    }

    /// Join this path onto `base`, keeping any path prefix `base` already has.
    ///
    /// Query and fragment of `base` are dropped.
    pub fn to_url(&self, base: &Url) -> Result<Url, PathError> {
        // Url::parse resolves `.`/`..` even when percent-encoded.
        if let Some(dot) = self.segments.iter().find(|s| matches!(s.as_str(), "." | "..")) {
            return Err(PathError::DotSegment(dot.clone()));
        }
        let mut base = base.clone();
        base.set_query(None);
        base.set_fragment(None);
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), self);
        Url::parse(&joined).map_err(PathError::Url)
    }
}

impl fmt::Display for StatusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", utf8_percent_encode(segment, SEGMENT))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_segments_verbatim() {
        let path = StatusPath::new("get_sysinfo").segment("abc-123").segment(42);
        assert_eq!(path.to_string(), "/status/get_sysinfo/abc-123/42");
    }

    #[test]
    fn encodes_reserved_characters() {
        let path = StatusPath::new("get_netinfo").segment("a/b?c=d#e f");
        assert_eq!(path.to_string(), "/status/get_netinfo/a%2Fb%3Fc%3Dd%23e%20f");
    }

    #[test]
    fn keeps_empty_segment() {
        let path = StatusPath::new("get_planners").segment("");
        assert_eq!(path.to_string(), "/status/get_planners/");
    }

    #[test]
    fn joins_onto_base_with_and_without_trailing_slash() {
        let path = StatusPath::new("get_machines");
        for base in ["http://127.0.0.1:8016", "http://127.0.0.1:8016/"] {
            let url = path.to_url(&Url::parse(base).unwrap()).unwrap();
            assert_eq!(url.as_str(), "http://127.0.0.1:8016/status/get_machines");
        }
    }

    #[test]
    fn keeps_base_path_prefix() {
        let base = Url::parse("http://monitor.local/prefix/").unwrap();
        let url = StatusPath::new("get_netinfo").segment("m1").to_url(&base).unwrap();
        assert_eq!(url.path(), "/prefix/status/get_netinfo/m1");
    }

    #[test]
    fn drops_base_query() {
        let base = Url::parse("http://127.0.0.1:8016/?token=x#top").unwrap();
        let url = StatusPath::new("get_machines").to_url(&base).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8016/status/get_machines");
    }

    #[test]
    fn rejects_dot_segments() {
        let base = Url::parse("http://127.0.0.1:8016").unwrap();
        let err = StatusPath::new("get_netinfo").segment("..").to_url(&base).unwrap_err();
        assert_eq!(err, PathError::DotSegment("..".to_owned()));
    }
}
