use std::fs::File;
use std::io::{self, Read, Write};

use rand::RngCore;

use super::form::FormData;
use super::BodyError;

/// Streaming `multipart/form-data` writer.
///
/// Parts are written straight into `W`; nothing is buffered besides what `W`
/// itself buffers.
pub struct MultipartWriter<W: Write> {
    inner: W,
    boundary: String,
    parts: usize,
}

impl<W: Write> MultipartWriter<W> {
    /// Create a writer with a fresh random boundary.
    pub fn new(inner: W) -> Self {
        let mut bytes = [0u8; 30];
        rand::thread_rng().fill_bytes(&mut bytes);
        let boundary = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Self::with_boundary(inner, boundary)
    }

    pub fn with_boundary(inner: W, boundary: String) -> Self {
        Self {
            inner,
            boundary,
            parts: 0,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write a literal part.
    pub fn write_field(
        &mut self,
        name: &str,
        value: &[u8],
        content_type: Option<&str>,
    ) -> io::Result<()> {
        self.part_header(name, None, content_type)?;
        self.inner.write_all(value)
    }

    /// Write a file part, streaming its content from `reader`.
    pub fn write_file<R: Read>(
        &mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        reader: &mut R,
    ) -> io::Result<u64> {
        self.part_header(name, Some(filename), Some(content_type))?;
        io::copy(reader, &mut self.inner)
    }

    /// Emit the closing boundary and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.parts > 0 {
            write!(self.inner, "\r\n--{}--\r\n", self.boundary)?;
        } else {
            write!(self.inner, "--{}--\r\n", self.boundary)?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn part_header(
        &mut self,
        name: &str,
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> io::Result<()> {
        if self.parts > 0 {
            write!(self.inner, "\r\n--{}\r\n", self.boundary)?;
        } else {
            write!(self.inner, "--{}\r\n", self.boundary)?;
        }
        self.parts += 1;

        write!(
            self.inner,
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        )?;
        if let Some(filename) = filename {
            write!(self.inner, "; filename=\"{}\"", escape_quotes(filename))?;
        }
        self.inner.write_all(b"\r\n")?;
        if let Some(content_type) = content_type {
            write!(self.inner, "Content-Type: {}\r\n", content_type)?;
        }
        self.inner.write_all(b"\r\n")
    }
}

/// Write every field of `form` as one part, then close the body.
///
/// # Returns
///
/// * `Result<(String, W), BodyError>` - The `Content-Type` value carrying the
///   boundary, and the writer's sink.
pub fn write_form<W: Write>(
    form: &FormData,
    mut writer: MultipartWriter<W>,
) -> Result<(String, W), BodyError> {
    for (name, field) in form {
        if field.is_file {
            let mut file = File::open(&field.value).map_err(|source| BodyError::FormFile {
                path: field.value.clone(),
                source,
            })?;
            let content_type = field
                .content_type
                .as_deref()
                .unwrap_or_else(|| mime_from_extension(&field.filealias));
            writer.write_file(name, &field.filealias, content_type, &mut file)?;
        } else {
            writer.write_field(name, field.value.as_bytes(), field.content_type.as_deref())?;
        }
    }

    let content_type = writer.content_type();
    let inner = writer.finish()?;
    Ok((content_type, inner))
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn mime_from_extension(filename: &str) -> &'static str {
    let ext = match filename.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return "application/octet-stream",
    };
    match ext.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "js" => "text/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
