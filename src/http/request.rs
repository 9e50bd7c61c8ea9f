use crate::http::BUFFER_SIZE;
use crate::http::error::ParseError;
use crate::http::header::HeaderMap;
use std::cmp::min;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead};

/// A parsed request head plus the unread remainder of the connection.
pub struct Request<'a> {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    /// Positioned at the first byte after the blank line. Nothing has been
    /// consumed from it; see [`Request::read_body`].
    pub body: &'a mut dyn BufRead,
}

impl Request<'_> {
    pub fn get_header(&self, k: &str) -> Option<&[String]> {
        self.headers.get(k)
    }

    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        self.headers
            .get_one("content-length")
            .map(|v| {
                v.trim()
                    .parse()
                    .map_err(|_| ParseError::InvalidHeaderValue("content-length"))
            })
            .transpose()
    }

    /// Reads exactly `Content-Length` bytes from the body stream. A missing
    /// header yields an empty body.
    pub fn read_body(&mut self) -> anyhow::Result<Vec<u8>> {
        let content_length = self.content_length()?.unwrap_or(0);
        Ok(read_content(&mut self.body, content_length)?)
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn read_content(rdr: &mut impl BufRead, mut content_length: usize) -> io::Result<Vec<u8>> {
    let mut content = Vec::with_capacity(content_length);
    let mut buf = [0u8; BUFFER_SIZE];
    while content_length > 0 {
        let slice_to_read = &mut buf[..min(BUFFER_SIZE, content_length)];

        let bytes_read = rdr.read(slice_to_read)?;
        if bytes_read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "body too short: got {} bytes, {} missing",
                    content.len(),
                    content_length
                ),
            ));
        }
        content.extend_from_slice(&slice_to_read[..bytes_read]);
        content_length -= bytes_read;
    }
    Ok(content)
}

/// What a handler sees: the request and the values its route's wildcard
/// segments matched.
#[derive(Debug)]
pub struct RequestContext<'a> {
    request: Request<'a>,
    url_vars: HashMap<String, String>,
}

impl<'a> RequestContext<'a> {
    pub fn from(request: Request<'a>, url_vars: HashMap<String, String>) -> RequestContext<'a> {
        RequestContext { request, url_vars }
    }

    pub fn get_var(&self, k: &str) -> Option<&str> {
        self.url_vars.get(k).map(|v| v.as_str())
    }

    pub fn get_header(&self, k: &str) -> Option<&[String]> {
        self.request.get_header(k)
    }

    pub fn request(&self) -> &Request<'a> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<'a> {
        &mut self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::parse::parse_request;
    use std::io::Read;

    #[test]
    fn read_body_is_bounded_by_content_length() {
        let raw = b"POST /files/a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello, trailing";
        let mut input = &raw[..];
        let mut request = parse_request(&mut input).unwrap();

        assert_eq!(request.content_length().unwrap(), Some(5));
        assert_eq!(request.read_body().unwrap(), b"hello");

        let mut rest = Vec::new();
        request.body.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b", trailing");
    }

    #[test]
    fn read_body_spanning_several_buffers() {
        let payload = vec![b'x'; BUFFER_SIZE * 3 + 7];
        let mut raw = format!("POST /up HTTP/1.1\r\nContent-Length: {}\r\n\r\n", payload.len())
            .into_bytes();
        raw.extend_from_slice(&payload);
        let mut input = raw.as_slice();
        let mut request = parse_request(&mut input).unwrap();

        assert_eq!(request.read_body().unwrap(), payload);
    }

    #[test]
    fn short_body_is_an_error() {
        let raw = b"POST /up HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        let mut input = &raw[..];
        let mut request = parse_request(&mut input).unwrap();

        assert!(request.read_body().is_err());
    }

    #[test]
    fn bad_content_length() {
        let raw = b"POST /up HTTP/1.1\r\nContent-Length: ten\r\n\r\n";
        let mut input = &raw[..];
        let request = parse_request(&mut input).unwrap();

        assert!(matches!(
            request.content_length(),
            Err(ParseError::InvalidHeaderValue("content-length"))
        ));
    }

    #[test]
    fn context_exposes_vars_and_headers() {
        let raw = b"GET /echo/abc HTTP/1.1\r\nUser-Agent: test\r\n\r\n";
        let mut input = &raw[..];
        let request = parse_request(&mut input).unwrap();
        let ctx = RequestContext::from(
            request,
            HashMap::from([("str".to_string(), "abc".to_string())]),
        );

        assert_eq!(ctx.get_var("str"), Some("abc"));
        assert_eq!(ctx.get_var("missing"), None);
        assert_eq!(ctx.get_header("USER-AGENT").unwrap(), ["test"]);
    }
}
