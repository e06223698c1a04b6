use log::info;

use crate::http::Response;
use crate::trace::Trace;

pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Outcome of a redirect check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Issue the next request.
    Follow,
    /// Keep the most recent response as the final one.
    Stop,
}

/// Redirect policy for one top-level request chain.
///
/// `taken` counts every 3xx hop offered to [`RedirectPolicy::check`]; at most
/// `max_redirects` of them are followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    follow: bool,
    max_redirects: u32,
    taken: u32,
    stopped: bool,
}

impl RedirectPolicy {
    pub fn new(follow: bool, max_redirects: u32) -> Self {
        Self {
            follow,
            max_redirects,
            taken: 0,
            stopped: false,
        }
    }

    pub fn taken(&self) -> u32 {
        self.taken
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Decide whether to follow the redirect `previous` points at.
    ///
    /// On `Follow` the previous response's status line and headers go to the
    /// incoming trace, since its body is discarded.
    pub fn check(&mut self, previous: &Response, next_url: &str, trace: &mut Trace) -> RedirectDecision {
        if self.stopped {
            return RedirectDecision::Stop;
        }
        self.taken += 1;

        if !self.follow || self.taken > self.max_redirects {
            if self.follow {
                info!("Maximum ({}) redirects followed", self.max_redirects);
            }
            self.stopped = true;
            return RedirectDecision::Stop;
        }

        trace.incoming(&previous.status_line());
        for (name, value) in &previous.headers {
            trace.incoming(&format!("{}: {}", name, value));
        }
        trace.incoming("");

        info!("Ignoring the response body");
        info!("Issuing request to this URL : {}", next_url);
        RedirectDecision::Follow
    }

    /// Mark the chain finished because no further hop is available.
    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::new(false, DEFAULT_MAX_REDIRECTS)
    }
}
