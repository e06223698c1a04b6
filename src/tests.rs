use std::{
    fs,
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use clap::Parser;
use kurl::{fetch, Args, Options, Trace};

/// One request as the mock server saw it.
#[derive(Debug, Clone)]
struct Seen {
    request_line: String,
    headers: Vec<String>,
    body: Vec<u8>,
}

impl Seen {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|h| {
            let (k, v) = h.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

// Mock HTTP server for testing
struct MockServer {
    listener: TcpListener,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockServer {
    fn new() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        Self {
            listener,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn port(&self) -> u16 {
        self.listener.local_addr().unwrap().port()
    }

    fn handle_connection(stream: TcpStream, seen: Arc<Mutex<Vec<Seen>>>) {
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let request_line = request_line.trim_end().to_string();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            headers.push(line);
        }

        let mut seen_request = Seen {
            request_line,
            headers,
            body: Vec::new(),
        };

        if seen_request.header("expect") == Some("100-continue") {
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").unwrap();
        }
        if let Some(len) = seen_request.header("content-length").and_then(|l| l.parse::<usize>().ok()) {
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body).unwrap();
            seen_request.body = body;
        }

        let path = seen_request
            .request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or("/")
            .to_string();
        seen.lock().unwrap().push(seen_request.clone());

        let (status, extra, body): (&str, String, Vec<u8>) = match path.as_str() {
            "/hop1" => ("302 Found", "Location: /hop2\r\n".to_string(), Vec::new()),
            "/hop2" => ("302 Found", "Location: /hop3\r\n".to_string(), Vec::new()),
            "/hop3" => ("301 Moved Permanently", "Location: /final\r\n".to_string(), Vec::new()),
            "/final" => ("200 OK", String::new(), b"Arrived".to_vec()),
            "/echo" => ("200 OK", String::new(), seen_request.body.clone()),
            "/chunked" => {
                let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n7\r\nHello, \r\n6\r\nWorld!\r\n0\r\n\r\n";
                writer.write_all(raw.as_bytes()).unwrap();
                return;
            }
            "/dated" => (
                "200 OK",
                "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\n".to_string(),
                b"dated".to_vec(),
            ),
            _ => ("200 OK", String::new(), b"Hello, World!".to_vec()),
        };

        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            extra,
            body.len()
        );
        writer.write_all(head.as_bytes()).unwrap();
        writer.write_all(&body).unwrap();
        writer.flush().unwrap();
    }

    fn start(self) -> (u16, Arc<Mutex<Vec<Seen>>>) {
        let port = self.port();
        let seen = self.seen.clone();
        thread::spawn(move || {
            for stream in self.listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let seen = self.seen.clone();
                        thread::spawn(move || {
                            Self::handle_connection(stream, seen);
                        });
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                    }
                }
            }
        });
        (port, seen)
    }
}

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("kurl-e2e-{}-{}", std::process::id(), name))
        .to_string_lossy()
        .into_owned()
}

fn options(argv: &[&str]) -> Options {
    let mut full = vec!["kurl"];
    full.extend_from_slice(argv);
    Options::from_args(&Args::try_parse_from(full).unwrap()).unwrap()
}

fn run(opts: &Options, url: &str) -> kurl::error::Result<kurl::http::Response> {
    let mut transport = opts.transport();
    fetch(opts, url, &mut transport, &mut Trace::silent())
}

#[test]
fn test_basic_get_request() {
    let (port, seen) = MockServer::new().start();
    let out = temp_path("get.txt");
    let url = format!("http://127.0.0.1:{}/", port);

    let response = run(&options(&["-o", out.as_str(), url.as_str()]), &url).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(fs::read_to_string(&out).unwrap(), "Hello, World!");
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].request_line, "GET / HTTP/1.1");
    assert!(seen[0].header("user-agent").unwrap().starts_with("kurl/"));

    fs::remove_file(out).unwrap();
}

#[test]
fn test_post_urlencoded_data() {
    let (port, seen) = MockServer::new().start();
    let out = temp_path("post.txt");
    let url = format!("http://127.0.0.1:{}/echo", port);

    run(
        &options(&[
            "-d",
            "name=kurl",
            "--data-raw",
            "raw=@kept",
            "--data-urlencode",
            "q=a b&c",
            "-o",
            out.as_str(),
            url.as_str(),
        ]),
        &url,
    )
    .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].request_line, "POST /echo HTTP/1.1");
    assert_eq!(
        seen[0].header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(seen[0].body, b"name=kurl&raw=@kept&q=a+b%26c");
    assert_eq!(fs::read(&out).unwrap(), b"name=kurl&raw=@kept&q=a+b%26c");

    fs::remove_file(out).unwrap();
}

#[test]
fn test_multipart_form_upload() {
    let (port, seen) = MockServer::new().start();
    let attachment = temp_path("attach.txt");
    fs::write(&attachment, "file contents").unwrap();
    let file_arg = format!("doc=@{};type=text/plain", attachment);
    let out = temp_path("form.txt");
    let url = format!("http://127.0.0.1:{}/echo", port);

    run(
        &options(&["-F", "title=hello", "-F", file_arg.as_str(), "-o", out.as_str(), url.as_str()]),
        &url,
    )
    .unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen[0].request_line.starts_with("POST "));
    let content_type = seen[0].header("content-type").unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .unwrap();
    let body = String::from_utf8(seen[0].body.clone()).unwrap();
    assert!(body.starts_with(&format!("--{}\r\n", boundary)));
    assert!(body.contains("name=\"title\"\r\n\r\nhello\r\n"));
    assert!(body.contains(&format!(
        "name=\"doc\"; filename=\"kurl-e2e-{}-attach.txt\"\r\nContent-Type: text/plain\r\n\r\nfile contents",
        std::process::id()
    )));
    assert!(body.ends_with(&format!("--{}--\r\n", boundary)));

    fs::remove_file(attachment).unwrap();
    fs::remove_file(out).unwrap();
}

#[test]
fn test_upload_file_with_expect_continue() {
    let (port, seen) = MockServer::new().start();
    let upload = temp_path("upload.bin");
    fs::write(&upload, b"binary\x00payload").unwrap();
    let out = temp_path("upload-out.txt");
    let url = format!("http://127.0.0.1:{}/echo", port);

    run(
        &options(&["-s", "-T", upload.as_str(), "-o", out.as_str(), url.as_str()]),
        &url,
    )
    .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].request_line, "PUT /echo HTTP/1.1");
    assert_eq!(seen[0].header("expect"), Some("100-continue"));
    assert_eq!(seen[0].body, b"binary\x00payload");
    assert_eq!(fs::read(&out).unwrap(), b"binary\x00payload");

    fs::remove_file(upload).unwrap();
    fs::remove_file(out).unwrap();
}

#[test]
fn test_follow_redirects() {
    let (port, seen) = MockServer::new().start();
    let out = temp_path("redirect.txt");
    let url = format!("http://127.0.0.1:{}/hop1", port);

    let response = run(&options(&["-L", "-o", out.as_str(), url.as_str()]), &url).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(fs::read_to_string(&out).unwrap(), "Arrived");
    let paths: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.request_line.clone())
        .collect();
    assert_eq!(
        paths,
        vec![
            "GET /hop1 HTTP/1.1",
            "GET /hop2 HTTP/1.1",
            "GET /hop3 HTTP/1.1",
            "GET /final HTTP/1.1"
        ]
    );

    fs::remove_file(out).unwrap();
}

#[test]
fn test_max_redirs_keeps_last_redirect() {
    let (port, seen) = MockServer::new().start();
    let out = temp_path("maxredirs.txt");
    let url = format!("http://127.0.0.1:{}/hop1", port);

    let response = run(
        &options(&["-L", "--max-redirs", "1", "-o", out.as_str(), url.as_str()]),
        &url,
    )
    .unwrap();

    assert_eq!(response.status, 302);
    assert_eq!(response.location(), Some("/hop3"));
    assert_eq!(seen.lock().unwrap().len(), 2);

    fs::remove_file(out).unwrap();
}

#[test]
fn test_redirect_not_followed_without_location_flag() {
    let (port, seen) = MockServer::new().start();
    let out = temp_path("nofollow.txt");
    let url = format!("http://127.0.0.1:{}/hop1", port);

    let response = run(&options(&["-o", out.as_str(), url.as_str()]), &url).unwrap();

    assert_eq!(response.status, 302);
    assert_eq!(seen.lock().unwrap().len(), 1);

    fs::remove_file(out).unwrap();
}

#[test]
fn test_chunked_response() {
    let (port, _) = MockServer::new().start();
    let out = temp_path("chunked.txt");
    let url = format!("http://127.0.0.1:{}/chunked", port);

    run(&options(&["-o", out.as_str(), url.as_str()]), &url).unwrap();

    assert_eq!(fs::read_to_string(&out).unwrap(), "Hello, World!");
    fs::remove_file(out).unwrap();
}

#[test]
fn test_remote_time_sets_mtime() {
    let (port, _) = MockServer::new().start();
    let out = temp_path("dated.txt");
    let url = format!("http://127.0.0.1:{}/dated", port);

    run(&options(&["-R", "-o", out.as_str(), url.as_str()]), &url).unwrap();

    let modified = fs::metadata(&out).unwrap().modified().unwrap();
    assert_eq!(
        modified,
        std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_445_412_480)
    );
    fs::remove_file(out).unwrap();
}

#[test]
fn test_missing_data_file_sends_nothing() {
    let args = Args::try_parse_from(["kurl", "-d", "key=@/no/such/kurl/data", "http://127.0.0.1:9/"]).unwrap();
    let err = Options::from_args(&args).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("Unable to read file /no/such/kurl/data"));
}

#[test]
fn test_form_file_missing_is_reported() {
    let (port, seen) = MockServer::new().start();
    let url = format!("http://127.0.0.1:{}/echo", port);
    let opts = options(&["-F", "f=@/no/such/kurl/form-file", url.as_str()]);

    let err = run(&opts, &url).unwrap_err();

    assert!(!err.is_fatal());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_connection_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let out = temp_path("refused.txt");
    fs::write(&out, b"earlier download").unwrap();
    let url = format!("http://127.0.0.1:{}/", port);

    let err = run(&options(&["-o", out.as_str(), url.as_str()]), &url).unwrap_err();

    assert!(matches!(err, kurl::Error::Request(kurl::RequestError::ConnectionError(_))));
    assert_eq!(fs::read(&out).unwrap(), b"earlier download");
    fs::remove_file(out).unwrap();
}

#[test]
fn test_connection_error_leaves_no_new_file() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let out = temp_path("never-created.txt");
    let _ = fs::remove_file(&out);
    let url = format!("http://127.0.0.1:{}/", port);

    assert!(run(&options(&["-o", out.as_str(), url.as_str()]), &url).is_err());
    assert!(!std::path::Path::new(&out).exists());
}
