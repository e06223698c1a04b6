use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::DateTime;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::http::Response;

/// Where the response body goes.
pub enum Output {
    Stdout(io::Stdout),
    File {
        file: File,
        path: String,
        resume_from: u64,
        /// The file did not exist before this run.
        created: bool,
    },
}

impl Output {
    /// Open the output sink. `None` means stdout.
    ///
    /// Files are created if missing but existing content is left alone until
    /// [`Output::begin`] runs.
    pub fn open(path: Option<&str>, resume_from: u64) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout()));
        };

        let open_error = |source| Error::OutputFile {
            path: path.to_string(),
            source,
        };
        let created = !Path::new(path).exists();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(open_error)?;

        Ok(Output::File {
            file,
            path: path.to_string(),
            resume_from,
            created,
        })
    }

    /// Cut the file back to the resume offset and position the cursor there,
    /// so a resumed transfer appends and a fresh one replaces the old content.
    pub fn begin(&mut self) -> Result<()> {
        let Output::File {
            file,
            path,
            resume_from,
            ..
        } = self
        else {
            return Ok(());
        };
        let open_error = |source| Error::OutputFile {
            path: path.clone(),
            source,
        };
        file.set_len(*resume_from).map_err(open_error)?;
        file.seek(SeekFrom::Start(*resume_from)).map_err(open_error)?;
        Ok(())
    }

    /// Give up on the transfer. A file this run created is removed; an
    /// existing one keeps its content.
    pub fn discard(self) {
        if let Output::File {
            file,
            path,
            created: true,
            ..
        } = self
        {
            drop(file);
            if let Err(err) = fs::remove_file(&path) {
                debug!("Could not remove '{}': {}", path, err);
            }
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Output::Stdout(_) => None,
            Output::File { path, .. } => Some(path),
        }
    }

    /// Write the response body.
    pub fn write_body(&mut self, body: &[u8]) -> Result<()> {
        let written = match self {
            Output::Stdout(out) => {
                let mut lock = out.lock();
                lock.write_all(body).and_then(|_| lock.flush())
            }
            Output::File { file, .. } => file.write_all(body).and_then(|_| file.flush()),
        };
        written.map_err(Error::Output)?;
        if let Some(path) = self.path() {
            info!("Saved {} bytes to '{}'", body.len(), path);
        }
        Ok(())
    }

    /// Set the file's modification time from `Last-Modified`, for `-R`.
    ///
    /// Does nothing for stdout or when the header is missing or unparsable.
    pub fn apply_remote_time(&self, response: &Response) -> Result<()> {
        let Output::File { file, .. } = self else {
            return Ok(());
        };
        let Some(modified) = response.header("last-modified").and_then(remote_time) else {
            debug!("No usable Last-Modified header");
            return Ok(());
        };
        file.set_modified(modified).map_err(Error::Output)
    }
}

/// Parse an HTTP date such as `Wed, 21 Oct 2015 07:28:00 GMT`.
pub fn remote_time(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}
