use clap::Parser;

use crate::redirect::DEFAULT_MAX_REDIRECTS;

/// Represents command line arguments for the HTTP client
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kurl", version, about = "A curl-like HTTP client")]
pub struct Args {
    /// URLs to fetch, one request chain each
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Filename to name url content to
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<String>,

    /// File to upload
    #[arg(short = 'T', long = "upload-file", value_name = "FILE")]
    pub upload_file: Option<String>,

    /// Save output to file named with file part of URL
    #[arg(short = 'O', long = "remote-name")]
    pub remote_name: bool,

    /// Resume transfer from offset ('-' to use the output file's size)
    #[arg(short = 'C', long = "continue-at", value_name = "OFFSET", allow_hyphen_values = true)]
    pub continue_at: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Maximum time to wait for an operation to complete in seconds
    #[arg(short = 'm', long = "max-time", value_name = "SECONDS", default_value_t = 0)]
    pub max_time: u64,

    /// Set the timestamp of the local file to that of the remote file, if available
    #[arg(short = 'R', long = "remote-time")]
    pub remote_time: bool,

    /// Set the cookies to be sent along with this request
    #[arg(short = 'b', long = "cookie", value_name = "DATA")]
    pub cookie: Option<String>,

    /// Follow 3xx redirects
    #[arg(short = 'L', long = "location")]
    pub location: bool,

    /// Maximum number of 3xx redirects to follow
    #[arg(long = "max-redirs", value_name = "NUM", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirs: u32,

    /// Mute kurl entirely, operation without any output
    #[arg(short = 's', long = "silent")]
    pub silent: bool,

    /// HTTP method to use
    #[arg(short = 'X', long = "request", value_name = "METHOD")]
    pub request: Option<String>,

    /// User agent to set for this request
    #[arg(short = 'A', long = "user-agent", value_name = "NAME")]
    pub user_agent: Option<String>,

    /// User authentication data to set for this request
    #[arg(short = 'u', long = "user", value_name = "USER:PASSWORD")]
    pub user: Option<String>,

    /// Extra headers to be sent with the request
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Timeout in seconds for Expect: 100-continue wait period
    #[arg(long = "expect100-timeout", value_name = "SECONDS", default_value_t = 1)]
    pub expect100_timeout: u64,

    /// Sends the specified data in a POST request to the server
    #[arg(short = 'd', long = "data", value_name = "DATA", allow_hyphen_values = true)]
    pub data: Vec<String>,

    /// The same as --data, -d
    #[arg(long = "data-ascii", value_name = "DATA", allow_hyphen_values = true)]
    pub data_ascii: Vec<String>,

    /// Basically the same as --data-binary (no @ interpretation)
    #[arg(long = "data-raw", value_name = "DATA", allow_hyphen_values = true)]
    pub data_raw: Vec<String>,

    /// Sends the data as binary
    #[arg(long = "data-binary", value_name = "DATA", allow_hyphen_values = true)]
    pub data_binary: Vec<String>,

    /// Sends the data as urlencoded ascii
    #[arg(long = "data-urlencode", value_name = "DATA", allow_hyphen_values = true)]
    pub data_urlencode: Vec<String>,

    /// Send HTTP multipart post data
    #[arg(short = 'F', long = "form", value_name = "NAME=CONTENT")]
    pub form: Vec<String>,

    /// Get HEAD from URL only
    #[arg(short = 'I', long = "head")]
    pub head: bool,

    /// Allow insecure server connections when using TLS
    #[arg(short = 'k', long = "insecure")]
    pub insecure: bool,
}
