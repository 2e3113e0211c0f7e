//! Length-prefixed stream framing for the daemon transport.
//!
//! Requests ride a netstring envelope: the header block
//! (`CONTENT_LENGTH` and the protocol id, NUL-delimited) is prefixed with
//! its own byte length and a colon, followed by a comma and the encoded
//! body. Responses arrive as a CGI-style header block terminated by a
//! blank line, then the response document.

/// Frame an encoded request body for the stream transport.
#[must_use]
pub fn frame_request(body: &[u8]) -> Vec<u8> {
    let headers = format!("CONTENT_LENGTH\0{}\0SCGI\01\0", body.len());
    let mut out = Vec::with_capacity(headers.len() + body.len() + 8);
    out.extend_from_slice(format!("{}:", headers.len()).as_bytes());
    out.extend_from_slice(headers.as_bytes());
    out.push(b',');
    out.extend_from_slice(body);
    out
}

/// Slice the response document out of a buffered response stream.
///
/// The daemon prefixes its reply with CGI-style headers; everything past
/// the first blank line is the document. A reply with no header block is
/// passed through unchanged so the decoder can judge it.
#[must_use]
pub fn response_body(raw: &[u8]) -> &[u8] {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        return &raw[pos + 4..];
    }
    if let Some(pos) = find(raw, b"\n\n") {
        return &raw[pos + 2..];
    }
    raw
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framed_request_has_netstring_shape() {
        let framed = frame_request(b"<xml/>");
        let text = String::from_utf8_lossy(&framed);
        // header block "CONTENT_LENGTH\0" "6\0" "SCGI\0" "1\0" is 24 bytes
        assert!(text.starts_with("24:CONTENT_LENGTH\u{0}6\u{0}SCGI\u{0}1\u{0},"));
        assert!(text.ends_with("<xml/>"));
    }

    #[test]
    fn response_body_strips_cgi_headers() {
        let raw = b"Status: 200 OK\r\nContent-Type: text/xml\r\n\r\n<doc/>";
        assert_eq!(response_body(raw), b"<doc/>");
    }

    #[test]
    fn headerless_response_passes_through() {
        assert_eq!(response_body(b"<doc/>"), b"<doc/>");
    }
}
