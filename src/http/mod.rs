pub mod client;
pub mod request;
pub mod response;
pub mod url;

pub use client::{HttpTransport, Transport};
pub use request::Request;
pub use response::Response;
