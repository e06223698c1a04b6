use std::io::{BufRead, Read};

use crate::error::RequestError;

/// Cap on a single status or header line.
const MAX_LINE: usize = 16 * 1024;

/// A parsed HTTP/1.x response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// The status line, e.g. `HTTP/1.1 302 Found`.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            format!("{} {}", self.version, self.status)
        } else {
            format!("{} {} {}", self.version, self.status, self.reason)
        }
    }

    /// First value of header `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location").filter(|l| !l.is_empty())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }
}

/// Read a status line and headers. The body is left unread.
pub fn read_head<R: BufRead>(reader: &mut R) -> Result<Response, RequestError> {
    let status_line = read_line(reader)?.ok_or(RequestError::NoResponseError)?;
    let (version, status, reason) = parse_status_line(&status_line)?;

    let mut headers = Vec::new();
    loop {
        let line = read_line(reader)?
            .ok_or_else(|| RequestError::InvalidResponse("truncated headers".to_string()))?;
        if line.is_empty() {
            break;
        }
        match line.split_once(':') {
            Some((name, value)) => headers.push((name.trim().to_string(), value.trim().to_string())),
            None => {
                return Err(RequestError::InvalidResponse(format!(
                    "malformed header line: {}",
                    line
                )))
            }
        }
    }

    Ok(Response {
        version,
        status,
        reason,
        headers,
        body: Vec::new(),
    })
}

/// Read a complete response, skipping interim 1xx responses.
///
/// # Arguments
///
/// * `reader` - The connection, buffered.
/// * `head_request` - The request was HEAD, so no body follows.
///
/// # Returns
///
/// * `Result<Response, RequestError>` - The final response with its decoded body.
pub fn read_response<R: BufRead>(reader: &mut R, head_request: bool) -> Result<Response, RequestError> {
    let mut response = read_head(reader)?;
    while (100..200).contains(&response.status) && response.status != 101 {
        response = read_head(reader)?;
    }
    read_body(reader, &mut response, head_request)?;
    Ok(response)
}

/// Read the body that follows `response`'s head.
pub fn read_body<R: BufRead>(
    reader: &mut R,
    response: &mut Response,
    head_request: bool,
) -> Result<(), RequestError> {
    if head_request || matches!(response.status, 100..=199 | 204 | 304) {
        return Ok(());
    }

    if response.is_chunked() {
        response.body = decode_chunked_transfer(reader)?;
    } else if let Some(length) = response.content_length() {
        let mut body = Vec::with_capacity(length.min(1024 * 1024) as usize);
        reader
            .by_ref()
            .take(length)
            .read_to_end(&mut body)
            .map_err(|e| RequestError::ReadError(e.to_string()))?;
        if (body.len() as u64) < length {
            return Err(RequestError::ReadError(format!(
                "connection closed after {} of {} bytes",
                body.len(),
                length
            )));
        }
        response.body = body;
    } else {
        reader
            .read_to_end(&mut response.body)
            .map_err(|e| RequestError::ReadError(e.to_string()))?;
    }

    Ok(())
}

/// Parse the status line of an HTTP response.
///
/// # Returns
///
/// * `Result<(String, u16, String), RequestError>` - Version, status code and reason phrase.
pub fn parse_status_line(line: &str) -> Result<(String, u16, String), RequestError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(RequestError::InvalidResponse(format!("bad status line: {}", line)));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| RequestError::InvalidResponse(format!("missing status code: {}", line)))?;
    let reason = parts.next().unwrap_or_default().trim().to_string();

    Ok((version.to_string(), status, reason))
}

/// Decode a chunked transfer encoded body, consuming trailers.
pub fn decode_chunked_transfer<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, RequestError> {
    let mut result = Vec::new();

    loop {
        let size_line = read_line(reader)?
            .ok_or_else(|| RequestError::ReadError("truncated chunked body".to_string()))?;
        // Chunk extensions follow a ';'
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let chunk_size = u64::from_str_radix(size_hex, 16)
            .map_err(|_| RequestError::InvalidResponse(format!("bad chunk size: {}", size_line)))?;

        if chunk_size == 0 {
            while let Some(trailer) = read_line(reader)? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(result);
        }

        let start = result.len();
        let expected = (start as u64)
            .checked_add(chunk_size)
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| RequestError::InvalidResponse(format!("chunk size too large: {}", size_hex)))?;
        reader
            .by_ref()
            .take(chunk_size)
            .read_to_end(&mut result)
            .map_err(|e| RequestError::ReadError(e.to_string()))?;
        if result.len() < expected {
            return Err(RequestError::ReadError(format!(
                "connection closed after {} of {} chunk bytes",
                result.len() - start,
                chunk_size
            )));
        }

        let mut crlf = [0u8; 2];
        reader
            .read_exact(&mut crlf)
            .map_err(|e| RequestError::ReadError(e.to_string()))?;
        if &crlf != b"\r\n" {
            return Err(RequestError::InvalidResponse("missing CRLF after chunk".to_string()));
        }
    }
}

/// One CRLF- or LF-terminated line without its terminator. `None` on EOF.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, RequestError> {
    let mut buf = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE as u64)
        .read_until(b'\n', &mut buf)
        .map_err(|e| RequestError::ReadError(e.to_string()))?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && n >= MAX_LINE {
        return Err(RequestError::InvalidResponse("line too long".to_string()));
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
