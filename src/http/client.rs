use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};
use native_tls::{TlsConnector, TlsStream};

use crate::body::Body;
use crate::error::RequestError;
use crate::http::request::{self, Request};
use crate::http::response::{self, Response};
use crate::trace::Trace;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one request and returns its response. Redirects are not followed here.
pub trait Transport {
    fn send(&mut self, request: &mut Request, trace: &mut Trace) -> Result<Response, RequestError>;
}

/// Blocking HTTP/1.1 transport, one connection per request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Accept invalid certificates and hostnames (`-k`).
    pub insecure: bool,
    /// How long to wait for `100 Continue` before sending the body anyway.
    /// Zero sends the body straight after the head.
    pub expect_timeout: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            insecure: false,
            expect_timeout: Duration::from_secs(1),
        }
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    fn tcp(&self) -> &TcpStream {
        match self {
            Stream::Plain(s) => s,
            Stream::Tls(s) => s.get_ref(),
        }
    }

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.tcp().set_read_timeout(Some(timeout))
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// Set up TCP stream with appropriate timeouts
pub fn setup_tcp_stream(host: &str, port: u16) -> Result<TcpStream, RequestError> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|err| RequestError::ConnectionError(format!("DNS resolution error: {}", err)))?
        .collect();

    if addrs.is_empty() {
        return Err(RequestError::ConnectionError(
            "No DNS records found".to_string(),
        ));
    }

    let mut last_err = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(IO_TIMEOUT))
                    .and_then(|_| stream.set_write_timeout(Some(IO_TIMEOUT)))
                    .map_err(|err| {
                        RequestError::ConnectionError(format!("Failed to set timeouts: {}", err))
                    })?;
                return Ok(stream);
            }
            Err(err) => {
                debug!("Connect to {} failed: {}", addr, err);
                last_err = Some(err);
            }
        }
    }

    Err(RequestError::ConnectionError(format!(
        "{} ({}:{})",
        last_err.map(|e| e.to_string()).unwrap_or_default(),
        host,
        port
    )))
}

impl HttpTransport {
    fn connect(&self, request: &Request) -> Result<Stream, RequestError> {
        let target = &request.target;
        info!(
            "Connecting to {} port {}{}",
            target.host,
            target.port,
            if target.is_https { " (TLS)" } else { "" }
        );
        let tcp = setup_tcp_stream(&target.host, target.port)?;

        if !target.is_https {
            return Ok(Stream::Plain(tcp));
        }

        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(self.insecure)
            .danger_accept_invalid_hostnames(self.insecure)
            .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
            .build()
            .map_err(|err| RequestError::TlsError(err.to_string()))?;

        let tls = connector
            .connect(&target.host, tcp)
            .map_err(|err| RequestError::TlsError(format!("TLS handshake error: {}", err)))?;
        Ok(Stream::Tls(Box::new(tls)))
    }

    /// Wait for the server to acknowledge `Expect: 100-continue`.
    ///
    /// Returns `Some(response)` when the server answered with a final status
    /// instead, in which case the body must not be sent.
    fn await_continue(
        &self,
        reader: &mut BufReader<Stream>,
        head_request: bool,
    ) -> Result<Option<Response>, RequestError> {
        reader
            .get_ref()
            .set_read_timeout(self.expect_timeout)
            .map_err(|e| RequestError::ConnectionError(e.to_string()))?;

        let ready = match reader.fill_buf() {
            Ok(buf) => !buf.is_empty(),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => false,
            Err(e) => return Err(RequestError::ReadError(e.to_string())),
        };

        reader
            .get_ref()
            .set_read_timeout(IO_TIMEOUT)
            .map_err(|e| RequestError::ConnectionError(e.to_string()))?;

        if !ready {
            info!("Done waiting for 100-continue");
            return Ok(None);
        }

        let mut interim = response::read_head(reader)?;
        if interim.status == 100 {
            return Ok(None);
        }
        info!("Server answered {} before the body was sent", interim.status);
        response::read_body(reader, &mut interim, head_request)?;
        Ok(Some(interim))
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &mut Request, trace: &mut Trace) -> Result<Response, RequestError> {
        let mut stream = self.connect(request)?;

        for line in request.head_lines() {
            trace.outgoing(&line);
        }
        trace.outgoing("");
        trace.flush();

        stream
            .write_all(&request::build(request))
            .and_then(|_| stream.flush())
            .map_err(|err| RequestError::WriteError(err.to_string()))?;

        let head_request = request.method.eq_ignore_ascii_case("HEAD");
        let mut reader = BufReader::new(stream);

        if request.expects_continue() && !request.body.is_empty() && !self.expect_timeout.is_zero() {
            if let Some(early) = self.await_continue(&mut reader, head_request)? {
                return Ok(early);
            }
        }

        let written = write_body(reader.get_mut(), &mut request.body)
            .map_err(|err| RequestError::WriteError(err.to_string()))?;
        if written > 0 {
            debug!("Sent {} body bytes", written);
        }

        response::read_response(&mut reader, head_request)
    }
}

/// Write `body` to `out`. Streams are consumed and left empty.
fn write_body<W: Write>(out: &mut W, body: &mut Body) -> io::Result<u64> {
    let written = match body {
        Body::Empty => 0,
        Body::Bytes(bytes) => {
            out.write_all(bytes)?;
            bytes.len() as u64
        }
        Body::Stream { reader, .. } => io::copy(reader, out)?,
    };
    if let Body::Stream { .. } = body {
        *body = Body::Empty;
    }
    out.flush()?;
    Ok(written)
}
