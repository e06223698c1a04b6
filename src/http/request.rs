use crate::body::Body;
use crate::http::url::Target;

/// A request ready for the transport.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub target: Target,
    /// `Name: value` lines, in the order they are sent.
    pub headers: Vec<String>,
    pub body: Body,
}

impl Request {
    /// Whether header `name` is set, case-insensitively.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| header_name(h).eq_ignore_ascii_case(name))
    }

    /// Drop every header called `name`.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|h| !header_name(h).eq_ignore_ascii_case(name));
    }

    pub fn expects_continue(&self) -> bool {
        self.headers.iter().any(|h| {
            let (name, value) = h.split_once(':').unwrap_or((h, ""));
            name.trim().eq_ignore_ascii_case("expect")
                && value.trim().eq_ignore_ascii_case("100-continue")
        })
    }

    /// Request line and header lines, without terminators.
    ///
    /// `Host` and `Content-Length` are filled in unless the caller set them.
    pub fn head_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{} {} HTTP/1.1", self.method, self.target.path)];

        if !self.has_header("host") {
            lines.push(format!("Host: {}", self.target.host_header()));
        }
        lines.extend(self.headers.iter().cloned());
        if let Some(len) = self.body.len() {
            if !self.has_header("content-length") {
                lines.push(format!("Content-Length: {}", len));
            }
        }
        lines.push("Connection: close".to_string());

        lines
    }
}

/// Build the request head as bytes, ending with the blank line.
///
/// # Arguments
///
/// * `request` - The request whose head to serialize.
///
/// # Returns
///
/// * `Vec<u8>` - The bytes to write before the body.
pub fn build(request: &Request) -> Vec<u8> {
    let mut head = String::new();
    for line in request.head_lines() {
        head.push_str(&line);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// The name part of a `Name: value` header line.
pub fn header_name(line: &str) -> &str {
    line.split_once(':').map(|(name, _)| name.trim()).unwrap_or(line.trim())
}
