//! Request body construction.
//!
//! `data` turns the `--data*` flags into URL-encoded fragments, `form` parses
//! `-F` values, `multipart` streams a form into a multipart body, and
//! [`compose`] picks the final body, method and `Content-Type`.

pub mod data;
pub mod form;
pub mod multipart;

use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use log::debug;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::progress;
use data::Fragment;
use form::FormData;
use multipart::MultipartWriter;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Errors raised while assembling a body.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("only one type of body can be accepted : either multipart form or url encoded values")]
    Conflict,

    #[error("unable to create http request; cannot open {path}: {source}")]
    FormFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to create http request; {0}")]
    Io(#[from] io::Error),
}

/// Request payload.
pub enum Body {
    Empty,
    /// Fully assembled in memory, so it can be replayed on 307/308.
    Bytes(Vec<u8>),
    /// Streamed from a reader of known length; sent once.
    Stream { reader: Box<dyn Read>, len: u64 },
}

impl Body {
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Empty => None,
            Body::Bytes(bytes) => Some(bytes.len() as u64),
            Body::Stream { len, .. } => Some(*len),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Body::Stream { len, .. } => write!(f, "Body::Stream({} bytes)", len),
        }
    }
}

/// Everything the composer needs besides the method and headers.
#[derive(Debug, Clone, Copy)]
pub struct BodySource<'a> {
    pub fragments: &'a [Fragment],
    pub form: &'a FormData,
    pub upload: Option<&'a str>,
    /// Draw a progress bar while the upload is read.
    pub progress: bool,
}

/// Method, headers and body after composition.
#[derive(Debug)]
pub struct Composed {
    pub method: String,
    pub headers: Vec<String>,
    pub body: Body,
}

/// Reject a plan that carries both URL-encoded data and a multipart form.
pub fn check_exclusive(fragments: &[Fragment], form: &FormData) -> std::result::Result<(), BodyError> {
    if !fragments.is_empty() && !form.is_empty() {
        return Err(BodyError::Conflict);
    }
    Ok(())
}

/// Decide the final body and `Content-Type`.
///
/// # Arguments
///
/// * `method` - The method given with `-X`/`-I`, if any.
/// * `headers` - The user's headers, in order.
/// * `source` - Data fragments, form fields and upload path.
///
/// # Returns
///
/// * `Result<Composed>` - The method, headers and body to send.
pub fn compose(method: Option<&str>, headers: &[String], source: BodySource<'_>) -> Result<Composed> {
    let mut headers = headers.to_vec();

    if let Some(path) = source.upload {
        let file = File::open(path).map_err(|source| Error::UploadFile {
            path: path.to_string(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| Error::UploadFile {
                path: path.to_string(),
                source,
            })?
            .len();
        debug!("Uploading {} ({} bytes)", path, len);

        let reader: Box<dyn Read> = if source.progress {
            Box::new(progress::wrap(file, len))
        } else {
            Box::new(file)
        };
        headers.push("Expect: 100-continue".to_string());
        return Ok(Composed {
            method: "PUT".to_string(),
            headers,
            body: Body::Stream { reader, len },
        });
    }

    check_exclusive(source.fragments, source.form)?;

    if !source.fragments.is_empty() {
        headers.insert(0, format!("Content-Type: {}", FORM_URLENCODED));
        return Ok(Composed {
            method: body_method(method),
            headers,
            body: Body::Bytes(data::join(source.fragments)),
        });
    }

    if !source.form.is_empty() {
        let (content_type, bytes) = multipart::write_form(source.form, MultipartWriter::new(Vec::new()))?;
        headers.insert(0, format!("Content-Type: {}", content_type));
        return Ok(Composed {
            method: body_method(method),
            headers,
            body: Body::Bytes(bytes),
        });
    }

    Ok(Composed {
        method: method.unwrap_or("GET").to_string(),
        headers,
        body: Body::Empty,
    })
}

/// POST, unless the caller already asked for a method that carries a body.
fn body_method(method: Option<&str>) -> String {
    match method {
        Some(m) if !m.eq_ignore_ascii_case("GET") && !m.eq_ignore_ascii_case("HEAD") => {
            m.to_string()
        }
        _ => "POST".to_string(),
    }
}
