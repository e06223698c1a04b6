//! The request plan.
//!
//! [`Options`] is built once from [`Args`] and never mutated afterwards.
//! [`Options::prepare`] specializes it for one target URL.

use std::fs;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;

use crate::args::Args;
use crate::body::data::{self, DataFlags, Fragment};
use crate::body::form::{self, FormData};
use crate::body::{self, BodySource};
use crate::error::{Error, Result};
use crate::http::{url, HttpTransport, Request};
use crate::redirect::RedirectPolicy;

/// Where `-C` resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueAt {
    Offset(u64),
    /// `-C -`: the current size of the output file.
    Auto,
}

/// Options shared by every target of one invocation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Method given with `-X` (upper-cased) or `-I`.
    pub method: Option<String>,
    /// User agent, auth, cookie and `-H` headers, in that order.
    pub headers: Vec<String>,
    /// URL-encoded body fragments from the `--data*` flags.
    pub fragments: Vec<Fragment>,
    pub form: FormData,
    pub upload: Option<String>,
    pub output: Option<String>,
    pub remote_name: bool,
    pub continue_at: Option<ContinueAt>,
    pub remote_time: bool,
    pub follow_redirect: bool,
    pub max_redirects: u32,
    pub max_time: Option<Duration>,
    pub expect_timeout: Duration,
    pub verbose: bool,
    pub silent: bool,
    pub head: bool,
    pub insecure: bool,
}

/// A request specialized for one target, plus where its response goes.
#[derive(Debug)]
pub struct PreparedRequest {
    pub request: Request,
    pub output: Option<String>,
    pub resume_from: u64,
}

impl Options {
    /// Build and validate the plan.
    ///
    /// Reads `@file` data eagerly; an unreadable file or a plan with both
    /// URL-encoded data and a multipart form is rejected here, before any
    /// request is sent.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut headers = Vec::new();
        let agent = args
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("kurl/{}", env!("CARGO_PKG_VERSION")));
        headers.push(format!("User-Agent: {}", agent));
        if let Some(user) = &args.user {
            headers.push(format!("Authorization: Basic {}", STANDARD.encode(user.as_bytes())));
        }
        if let Some(cookie) = &args.cookie {
            headers.push(format!("Cookie: {}", cookie));
        }
        headers.extend(args.headers.iter().cloned());

        let flags = DataFlags {
            ascii: args.data.iter().chain(&args.data_ascii).cloned().collect(),
            raw: args.data_raw.clone(),
            binary: args.data_binary.clone(),
            urlencode: args.data_urlencode.clone(),
        };
        let fragments = data::aggregate(&flags)?;
        let form = form::parse_form(&args.form)?;
        body::check_exclusive(&fragments, &form)?;

        let method = if args.head {
            Some("HEAD".to_string())
        } else {
            args.request.as_ref().map(|m| m.to_uppercase())
        };

        let continue_at = match args.continue_at.as_deref() {
            None => None,
            Some("-") => Some(ContinueAt::Auto),
            Some(value) => Some(ContinueAt::Offset(value.parse().map_err(|_| {
                Error::InvalidFlag {
                    flag: "--continue-at",
                    value: value.to_string(),
                }
            })?)),
        };

        Ok(Options {
            method,
            headers,
            fragments,
            form,
            upload: args.upload_file.clone(),
            output: args.output.clone(),
            remote_name: args.remote_name,
            continue_at,
            remote_time: args.remote_time,
            follow_redirect: args.location,
            max_redirects: args.max_redirs,
            max_time: (args.max_time > 0).then(|| Duration::from_secs(args.max_time)),
            expect_timeout: Duration::from_secs(args.expect100_timeout),
            verbose: args.verbose && !args.silent,
            silent: args.silent,
            head: args.head,
            insecure: args.insecure,
        })
    }

    /// A fresh redirect policy for one request chain.
    pub fn redirect_policy(&self) -> RedirectPolicy {
        RedirectPolicy::new(self.follow_redirect, self.max_redirects)
    }

    pub fn transport(&self) -> HttpTransport {
        HttpTransport {
            insecure: self.insecure,
            expect_timeout: self.expect_timeout,
        }
    }

    /// Output file for `target`: `-O` names it after the URL, else `-o`.
    pub fn output_path(&self, target: &str) -> Option<String> {
        if self.remote_name {
            Some(url::remote_name(target))
        } else {
            self.output.clone()
        }
    }

    /// Specialize the plan for `target`: output file, resume offset, body and method.
    pub fn prepare(&self, target: &str) -> Result<PreparedRequest> {
        let parsed = url::parse(target)?;
        let output = self.output_path(target);

        let resume_from = match self.continue_at {
            None => 0,
            Some(ContinueAt::Offset(offset)) => offset,
            Some(ContinueAt::Auto) => output
                .as_deref()
                .and_then(|path| fs::metadata(path).ok())
                .map(|meta| meta.len())
                .unwrap_or(0),
        };

        let mut headers = self.headers.clone();
        if resume_from > 0 {
            debug!("Resuming transfer from byte position {}", resume_from);
            headers.push(format!("Range: bytes={}-", resume_from));
        }

        let composed = body::compose(
            self.method.as_deref(),
            &headers,
            BodySource {
                fragments: &self.fragments,
                form: &self.form,
                upload: self.upload.as_deref(),
                progress: !self.silent,
            },
        )?;

        Ok(PreparedRequest {
            request: Request {
                method: composed.method,
                target: parsed,
                headers: composed.headers,
                body: composed.body,
            },
            output,
            resume_from,
        })
    }
}
