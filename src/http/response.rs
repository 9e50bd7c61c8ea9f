use crate::http::header::ResponseHeaders;
use crate::http::status::Status;
use bytes::{BufMut, BytesMut};
use std::io::{self, Write};
use tracing::debug;

/// What a handler may do to a response. Implemented by [`Response`] and by
/// the compression wrapper.
pub trait ResponseWriter {
    /// Mutable until the head has been sent; later edits never reach the wire.
    fn headers(&mut self) -> &mut ResponseHeaders;

    /// Sends the status line and headers. Only the first call has an effect.
    fn write_header(&mut self, status: Status) -> io::Result<()>;

    /// Writes body bytes, sending a `200 OK` head first if none was sent.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn header_written(&self) -> bool;
}

/// Response bound to a connection's output. The head is buffered until the
/// first [`write_header`](ResponseWriter::write_header) or
/// [`write`](ResponseWriter::write), then body bytes go straight through.
///
/// When the head is sent implicitly, `Content-Length` is the length of that
/// first write unless the handler set one. Bodies written in several chunks
/// must therefore either declare their length up front or call
/// `write_header` themselves.
pub struct Response<'s> {
    sink: &'s mut dyn Write,
    headers: ResponseHeaders,
    wrote_header: bool,
}

impl<'s> Response<'s> {
    pub fn new(sink: &'s mut dyn Write) -> Response<'s> {
        Response {
            sink,
            headers: ResponseHeaders::new(),
            wrote_header: false,
        }
    }

    fn serialize_head(&self, status: Status) -> BytesMut {
        let mut head = BytesMut::with_capacity(64 + self.headers.len() * 32);

        head.put_slice(format!("HTTP/1.1 {} {}\r\n", status.code_num, status.message).as_bytes());
        for (key, value) in self.headers.iter() {
            head.put_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }
        head.put_slice(b"\r\n");

        head
    }
}

impl ResponseWriter for Response<'_> {
    fn headers(&mut self) -> &mut ResponseHeaders {
        &mut self.headers
    }

    fn write_header(&mut self, status: Status) -> io::Result<()> {
        if self.wrote_header {
            debug!(status = status.code_num, "response head already sent, ignoring");
            return Ok(());
        }
        // Flip first: a failed write leaves a partial head on the wire that
        // can't be resent.
        self.wrote_header = true;
        let head = self.serialize_head(status);
        self.sink.write_all(&head)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_header {
            if !self.headers.contains("Content-Length") {
                self.headers.set("Content-Length", buf.len().to_string());
            }
            if !self.headers.contains("Content-Type") {
                self.headers.set("Content-Type", "text/plain");
            }
            self.write_header(Status::OK)?;
        }
        self.sink.write_all(buf)?;
        Ok(buf.len())
    }

    fn header_written(&self) -> bool {
        self.wrote_header
    }
}
