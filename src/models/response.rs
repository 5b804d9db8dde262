//! Received response record

use std::borrow::Cow;

use crate::constants::MAX_RESPONSE_BODY;
use crate::error::{CoreError, Result};
use crate::models::headers::{HeaderLimits, HeaderList};

/// Response from HTTP request. `status_code == 0` means no response yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub status_text: String,
    pub headers: HeaderList,
    body: Option<Vec<u8>>,
    pub response_time_ms: u64,
    pub truncated: bool,
    /// Size announced by `Content-Length`, when known
    pub total_size: Option<u64>,
}

impl Default for Response {
    fn default() -> Self {
        Response {
            status_code: 0,
            status_text: String::new(),
            headers: HeaderList::with_limits(HeaderLimits::WIRE),
            body: None,
            response_time_ms: 0,
            truncated: false,
            total_size: None,
        }
    }
}

impl Response {
    pub fn new(status_code: u16) -> Self {
        let mut response = Response {
            status_code,
            ..Default::default()
        };
        response.fill_status_text();
        response
    }

    /// True once a transport has filled this response.
    pub fn has_response(&self) -> bool {
        self.status_code != 0
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }

    pub fn set_body(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_RESPONSE_BODY {
            return Err(CoreError::InvalidSize {
                what: "response body",
                size: bytes.len(),
                max: MAX_RESPONSE_BODY,
            });
        }
        self.body = if bytes.is_empty() {
            None
        } else {
            Some(bytes.to_vec())
        };
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    /// Replace an empty or generic "OK" status text with the known phrase.
    pub fn fill_status_text(&mut self) {
        if self.status_text.is_empty() || self.status_text == "OK" {
            if let Some(phrase) = reason_phrase(self.status_code) {
                self.status_text = phrase.to_string();
            }
        }
    }

    /// Back to the "no response yet" state.
    pub fn reset(&mut self) {
        *self = Response::default();
    }
}

pub fn reason_phrase(code: u16) -> Option<&'static str> {
    let phrase = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(phrase)
}
