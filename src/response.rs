//! Fixed HTTP response.
//!
//! Every connection receives the same bytes regardless of what it sent:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Length: <N>\r\n
//! \r\n
//! <body>
//! ```
//!
//! The response is rendered once at startup and shared by every connection.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;

const STATUS_LINE: &[u8] = b"HTTP/1.1 200 OK\r\n";
const CONTENT_LENGTH: &[u8] = b"Content-Length: ";
const CRLF: &[u8] = b"\r\n";

/// Greeting preset: the default port and body of each server variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Greeting {
    /// `Hello, C!` on port 8080
    #[default]
    C,
    /// `Hello, C++!` on port 8081
    Cpp,
    /// `Hello, Rust!` on port 8082
    Rust,
    /// `Hello, Go!` on port 8083
    Go,
}

impl Greeting {
    pub fn port(self) -> u16 {
        match self {
            Greeting::C => 8080,
            Greeting::Cpp => 8081,
            Greeting::Rust => 8082,
            Greeting::Go => 8083,
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Greeting::C => "Hello, C!",
            Greeting::Cpp => "Hello, C++!",
            Greeting::Rust => "Hello, Rust!",
            Greeting::Go => "Hello, Go!",
        }
    }
}

/// Pre-rendered response bytes.
#[derive(Debug, Clone)]
pub struct Response {
    bytes: Bytes,
    body_start: usize,
}

impl Response {
    /// Render the response for `body`.
    ///
    /// `Content-Length` is the byte length of `body`, not its character count.
    pub fn new(body: &str) -> Self {
        let length = body.len().to_string();
        let head_len = STATUS_LINE.len() + CONTENT_LENGTH.len() + length.len() + 2 * CRLF.len();

        let mut buf = BytesMut::with_capacity(head_len + body.len());
        buf.put_slice(STATUS_LINE);
        buf.put_slice(CONTENT_LENGTH);
        buf.put_slice(length.as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(CRLF);
        buf.put_slice(body.as_bytes());

        Self {
            bytes: buf.freeze(),
            body_start: head_len,
        }
    }

    /// Full wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn body(&self) -> &[u8] {
        &self.bytes[self.body_start..]
    }

    pub fn content_length(&self) -> usize {
        self.body().len()
    }
}

impl From<Greeting> for Response {
    fn from(greeting: Greeting) -> Self {
        Response::new(greeting.body())
    }
}
