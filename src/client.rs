use log::{info, warn};

use crate::body::Body;
use crate::error::{RequestError, Result};
use crate::http::url::{self, Target};
use crate::http::{Request, Response, Transport};
use crate::options::Options;
use crate::output::Output;
use crate::redirect::{RedirectDecision, RedirectPolicy};
use crate::trace::Trace;

/// Send `request` and follow redirects as `policy` allows.
///
/// # Arguments
///
/// * `transport` - Sends one request at a time.
/// * `request` - The first request of the chain.
/// * `policy` - Redirect policy, fresh for this chain.
/// * `trace` - Diagnostic streams.
///
/// # Returns
///
/// * `Result<Response, RequestError>` - The final response, which is a 3xx when
///   the chain stopped on policy.
pub fn send_request<T: Transport>(
    transport: &mut T,
    mut request: Request,
    policy: &mut RedirectPolicy,
    trace: &mut Trace,
) -> std::result::Result<Response, RequestError> {
    loop {
        let streamed = matches!(request.body, Body::Stream { .. });
        let response = transport.send(&mut request, trace)?;

        if !response.is_redirect() {
            return Ok(response);
        }

        let Some(location) = response.location() else {
            policy.stop();
            return Ok(response);
        };
        let next = match url::resolve(&request.target.url, location) {
            Ok(next) => next,
            Err(err) => {
                warn!("Not following redirect to '{}': {}", location, err);
                policy.stop();
                return Ok(response);
            }
        };

        if policy.check(&response, next.url.as_str(), trace) == RedirectDecision::Stop {
            return Ok(response);
        }

        match redirect_request(request, response.status, next, streamed) {
            Some(next_request) => request = next_request,
            None => {
                warn!("Cannot resend a streamed upload body; stopping at {}", response.status);
                policy.stop();
                return Ok(response);
            }
        }
    }
}

/// Build the request for the next hop, or `None` when it would need to
/// resend a body that was already streamed.
fn redirect_request(mut previous: Request, status: u16, next: Target, streamed: bool) -> Option<Request> {
    let method = previous.method.to_ascii_uppercase();
    let to_get = match status {
        303 => method != "HEAD",
        301 | 302 => method != "GET" && method != "HEAD",
        _ => false,
    };

    if to_get {
        info!("Switching from {} to GET after {}", method, status);
        previous.method = "GET".to_string();
        previous.body = Body::Empty;
        for name in ["content-type", "content-length", "expect"] {
            previous.remove_header(name);
        }
    } else if streamed {
        return None;
    }

    if next.host != previous.target.host {
        previous.remove_header("authorization");
        previous.remove_header("cookie");
    }
    previous.target = next;
    Some(previous)
}

/// Run one target end to end: prepare, open the output, send, write the body.
pub fn fetch<T: Transport>(
    options: &Options,
    target: &str,
    transport: &mut T,
    trace: &mut Trace,
) -> Result<Response> {
    let prepared = options.prepare(target)?;
    let mut output = Output::open(prepared.output.as_deref(), prepared.resume_from)?;

    let mut policy = options.redirect_policy();
    let response = match send_request(transport, prepared.request, &mut policy, trace) {
        Ok(response) => response,
        Err(err) => {
            output.discard();
            return Err(err.into());
        }
    };
    output.begin()?;

    trace.incoming(&response.status_line());
    for (name, value) in &response.headers {
        trace.incoming(&format!("{}: {}", name, value));
    }
    trace.incoming("");
    trace.flush();

    output.write_body(&response.body)?;
    if options.remote_time {
        output.apply_remote_time(&response)?;
    }

    Ok(response)
}
