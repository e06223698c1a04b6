use url::{Host, Url};

use crate::error::RequestError;

/// Where a request goes: the full URL plus its connection details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: Url,
    /// Host to connect to; IPv6 literals are kept without brackets.
    pub host: String,
    pub port: u16,
    /// Path plus query, as written on the request line.
    pub path: String,
    pub is_https: bool,
}

impl Target {
    fn from_url(url: Url) -> Result<Self, RequestError> {
        let is_https = match url.scheme() {
            "https" => true,
            "http" => false,
            _ => {
                return Err(RequestError::InvalidUrl(
                    "URL must start with http:// or https://".to_string(),
                ))
            }
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(RequestError::InvalidUrl("Invalid host".to_string())),
        };
        let port = url
            .port_or_known_default()
            .unwrap_or(if is_https { 443 } else { 80 });

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Target {
            url,
            host,
            port,
            path,
            is_https,
        })
    }

    /// `Host` header value; the port is included only when not the default.
    pub fn host_header(&self) -> String {
        let host = self.url.host_str().unwrap_or(&self.host);
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

/// Parse a URL given on the command line. A missing scheme means `http://`.
///
/// # Arguments
///
/// * `url` - A string slice representing the URL to parse.
///
/// # Returns
///
/// * `Result<Target, RequestError>` - The parsed target, or why it is unusable.
pub fn parse(url: &str) -> Result<Target, RequestError> {
    let candidate = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    let parsed = Url::parse(&candidate).map_err(|e| match e {
        url::ParseError::EmptyHost => RequestError::InvalidUrl("Invalid host".to_string()),
        url::ParseError::InvalidPort => RequestError::InvalidUrl("Invalid port".to_string()),
        other => RequestError::InvalidUrl(other.to_string()),
    })?;
    Target::from_url(parsed)
}

/// Resolve a `Location` header against the URL that returned it.
pub fn resolve(base: &Url, location: &str) -> Result<Target, RequestError> {
    let next = base
        .join(location)
        .map_err(|e| RequestError::InvalidUrl(format!("{}: {}", location, e)))?;
    Target::from_url(next)
}

/// Last path segment of `url`, used by `-O`.
pub fn remote_name(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = trimmed.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, last)) if !last.is_empty() && !last.ends_with(':') => last.to_string(),
        _ => trimmed.to_string(),
    }
}
