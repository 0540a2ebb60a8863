//! Raw header-line parsing.
//!
//! The transport hands over response head lines exactly as received
//! (`HTTP/1.1 200 OK\r\n`, `Content-Type: text/plain; charset=utf-8\r\n`, ...).
//! Matching is case-insensitive: each line is lowercased before parsing, so the
//! recorded content type is lowercase too.

const STATUS_LINE_PREFIX: &str = "http/";
const CONTENT_TYPE_PREFIX: &str = "content-type";

/// Last status code and content type seen on the wire.
///
/// With redirects followed, several response heads go by; each new status
/// line or content-type line replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderState {
    status_code:  u16,
    content_type: String,
}

impl HeaderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw header line.
    pub fn observe(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line).to_ascii_lowercase();
        if line.starts_with(STATUS_LINE_PREFIX) {
            self.status_code = parse_status_line(&line);
        } else if line.starts_with(CONTENT_TYPE_PREFIX) {
            self.content_type = parse_content_type(&line);
        }
    }

    /// Last status code, `0` if none was parsed.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Last content type without parameters, empty if none was seen.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Parse `<version> <code> ...`, returning `0` when the code is missing or
/// not a number.
pub fn parse_status_line(line: &str) -> u16 {
    let mut tokens = line.split_whitespace();
    let _version = tokens.next();
    tokens
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .unwrap_or(0)
}

/// Parse `<field> <value>[;params]`, keeping the value up to the first `;`.
///
/// The value is the second whitespace-separated token, so a line without a
/// space after the colon yields an empty value.
pub fn parse_content_type(line: &str) -> String {
    line.split_whitespace()
        .nth(1)
        .and_then(|value| value.split(';').next())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let mut state = HeaderState::new();
        state.observe(b"HTTP/1.1 200 OK\r\n");
        assert_eq!(state.status_code(), 200);

        state.observe(b"HTTP/2 404\r\n");
        assert_eq!(state.status_code(), 404);
    }

    #[test]
    fn test_status_line_without_code_resets_to_zero() {
        let mut state = HeaderState::new();
        state.observe(b"HTTP/1.1 301 Moved Permanently\r\n");
        state.observe(b"HTTP/1.1 abc\r\n");
        assert_eq!(state.status_code(), 0);
    }

    #[test]
    fn test_content_type_drops_parameters() {
        let mut state = HeaderState::new();
        state.observe(b"Content-Type: text/plain; charset=utf-8\r\n");
        assert_eq!(state.content_type(), "text/plain");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let mut state = HeaderState::new();
        state.observe(b"content-TYPE: Audio/X-MpegURL\r\n");
        state.observe(b"http/1.0 206 Partial Content\r\n");
        assert_eq!(state.content_type(), "audio/x-mpegurl");
        assert_eq!(state.status_code(), 206);
    }

    #[test]
    fn test_last_seen_values_win() {
        let mut state = HeaderState::new();
        state.observe(b"HTTP/1.1 302 Found\r\n");
        state.observe(b"Content-Type: text/html\r\n");
        state.observe(b"\r\n");
        state.observe(b"HTTP/1.1 200 OK\r\n");
        state.observe(b"Content-Type: application/json\r\n");
        assert_eq!(state.status_code(), 200);
        assert_eq!(state.content_type(), "application/json");
    }

    #[test]
    fn test_unrelated_lines_are_ignored() {
        let mut state = HeaderState::new();
        state.observe(b"Content-Length: 5\r\n");
        state.observe(b"Server: http-thing\r\n");
        state.observe(b"\r\n");
        assert_eq!(state, HeaderState::default());
    }

    #[test]
    fn test_content_type_without_space() {
        assert_eq!(parse_content_type("content-type:text/plain"), "");
        assert_eq!(parse_content_type("content-type: ;charset=utf-8"), "");
    }
}
