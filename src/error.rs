use std::io;

use thiserror::Error;

use crate::body::{form::FormError, BodyError};

/// Error type for a whole invocation.
///
/// Fatal variants abort every remaining target; the others only abort the
/// target that produced them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to read file {path} for data element {key}: {source}")]
    DataFile {
        path: String,
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed data '{0}': expected key=value")]
    MalformedData(String),

    #[error("Error opening {path}: {source}")]
    UploadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to create/open file '{path}' for output: {source}")]
    OutputFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid value for {flag}: {value}")]
    InvalidFlag { flag: &'static str, value: String },

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Body(#[from] BodyError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Write error: {0}")]
    Output(#[source] io::Error),
}

impl Error {
    /// Whether the error must terminate the process instead of moving on to
    /// the next target.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DataFile { .. }
                | Error::MalformedData(_)
                | Error::UploadFile { .. }
                | Error::OutputFile { .. }
                | Error::InvalidFlag { .. }
        )
    }
}

/// Error type for request operations
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Invalid HTTP response: {0}")]
    InvalidResponse(String),

    #[error("No response received")]
    NoResponseError,
}

pub type Result<T> = std::result::Result<T, Error>;
