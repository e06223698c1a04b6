pub mod args;
pub mod body;
pub mod client;
pub mod error;
pub mod http;
pub mod options;
pub mod output;
pub mod progress;
pub mod redirect;
pub mod trace;

// Re-export main types for easy access
pub use args::Args;
pub use client::{fetch, send_request};
pub use error::{Error, RequestError};
pub use options::Options;
pub use redirect::{RedirectDecision, RedirectPolicy};
pub use trace::Trace;
