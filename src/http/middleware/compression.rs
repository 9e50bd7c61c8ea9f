use crate::http::encoding::{self, Encoding};
use crate::http::header::ResponseHeaders;
use crate::http::middleware::{Middleware, Next};
use crate::http::request::RequestContext;
use crate::http::response::ResponseWriter;
use crate::http::status::Status;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};
use tracing::{debug, warn};

/// Gzips response bodies for clients that list `gzip` in `Accept-Encoding`.
pub struct CompressionMw {
    level: Compression,
}

impl CompressionMw {
    pub fn new(level: Compression) -> Self {
        CompressionMw { level }
    }
}

impl Default for CompressionMw {
    fn default() -> Self {
        CompressionMw::new(Compression::default())
    }
}

fn wants_gzip(ctx: &RequestContext<'_>) -> bool {
    ctx.get_header("accept-encoding")
        .map(|values| {
            let encodings = encoding::parse_accept_encoding(values.iter().map(String::as_str));
            encoding::accepts(&encodings, Encoding::Gzip)
        })
        .unwrap_or(false)
}

impl Middleware for CompressionMw {
    fn handle(
        &self,
        ctx: &mut RequestContext<'_>,
        w: &mut dyn ResponseWriter,
        next: Next<'_>,
    ) -> anyhow::Result<()> {
        // An already encoded or already sent response is left alone, which
        // also keeps the wrapper from nesting.
        if !wants_gzip(ctx) || w.header_written() || w.headers().contains("Content-Encoding") {
            return next.run(ctx, w);
        }

        w.headers().set("Content-Encoding", Encoding::Gzip.to_string());
        let mut gz = GzipResponseWriter::new(w, self.level);
        let result = next.run(ctx, &mut gz);
        if result.is_err() && !gz.header_written() {
            // Nothing reached the client; don't commit a 200 for a failed request.
            debug!("handler failed, discarding held back body");
            return result;
        }

        let finished = gz.finish();
        if let Err(e) = &finished {
            warn!(error = %e, "can't finish gzip stream");
        }
        result?;
        finished?;
        Ok(())
    }
}

/// Compresses everything written through it before handing it to the
/// wrapped writer. Header operations go straight to the wrapped writer.
///
/// While the wrapped writer's head is unsent, compressed output is held back
/// and forwarded as a single write by [`finish`](Self::finish), so the
/// implicit `Content-Length` covers the whole compressed body. Memory use
/// grows with the body in that case. Once the head is out, output streams
/// through as the encoder produces it.
///
/// If the handler replaces `Content-Encoding` before its first write or
/// `write_header`, the encoder is dropped and the body passes through as is.
pub struct GzipResponseWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    encoder: Option<GzEncoder<Vec<u8>>>,
    wrote_body: bool,
}

impl<'a> GzipResponseWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter, level: Compression) -> GzipResponseWriter<'a> {
        GzipResponseWriter {
            inner,
            encoder: Some(GzEncoder::new(Vec::new(), level)),
            wrote_body: false,
        }
    }

    /// The encoder, unless the handler took over `Content-Encoding`. Decided
    /// once, before anything is committed to the wrapped writer.
    fn encoder(&mut self) -> Option<&mut GzEncoder<Vec<u8>>> {
        if self.encoder.is_some() && !self.wrote_body && !self.inner.header_written() {
            let gzip = Encoding::Gzip.to_string();
            if self.inner.headers().get("Content-Encoding") != Some(gzip.as_str()) {
                debug!("Content-Encoding replaced by handler, not compressing");
                self.encoder = None;
            }
        }
        self.encoder.as_mut()
    }

    fn forward(&mut self) -> io::Result<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        let pending = std::mem::take(encoder.get_mut());
        if !pending.is_empty() {
            self.inner.write(&pending)?;
        }
        Ok(())
    }

    /// Writes the gzip trailer and forwards all remaining compressed bytes.
    /// Must be called once the handler is done; nothing is sent if the
    /// handler never wrote a body.
    pub fn finish(mut self) -> io::Result<()> {
        if !self.wrote_body {
            return Ok(());
        }
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        encoder.try_finish()?;
        if !self.inner.header_written() {
            self.inner.headers().remove("Content-Length");
        }
        self.forward()
    }
}

impl ResponseWriter for GzipResponseWriter<'_> {
    fn headers(&mut self) -> &mut ResponseHeaders {
        self.inner.headers()
    }

    fn write_header(&mut self, status: Status) -> io::Result<()> {
        if self.encoder().is_none() {
            return self.inner.write_header(status);
        }
        if self.wrote_body {
            // A body write already committed to an implicit 200.
            debug!(status = status.code_num, "response head already committed, ignoring");
            return Ok(());
        }
        if !self.inner.header_written() {
            // Any declared length is for the uncompressed body.
            self.inner.headers().remove("Content-Length");
        }
        self.inner.write_header(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.encoder() {
            Some(encoder) => encoder.write_all(buf)?,
            None => return self.inner.write(buf),
        }
        self.wrote_body = true;
        if self.inner.header_written() {
            self.forward()?;
        }
        Ok(buf.len())
    }

    fn header_written(&self) -> bool {
        self.inner.header_written()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::HandlerFunc;
    use crate::http::parse::parse_request;
    use crate::http::response::Response;
    use flate2::read::GzDecoder;
    use std::collections::HashMap;
    use std::io::Read;

    fn serve(raw_request: &str, handler: HandlerFunc) -> Vec<u8> {
        let mut input = raw_request.as_bytes();
        let request = parse_request(&mut input).unwrap();
        let mut ctx = RequestContext::from(request, HashMap::new());
        let middlewares: Vec<Box<dyn Middleware>> = vec![Box::new(CompressionMw::default())];

        let mut out: Vec<u8> = Vec::new();
        let mut resp = Response::new(&mut out);
        Next::new(&middlewares, &handler).run(&mut ctx, &mut resp).unwrap();
        drop(resp);
        out
    }

    fn split(out: &[u8]) -> (String, &[u8]) {
        let end = out
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response head is terminated");
        (
            String::from_utf8(out[..end + 4].to_vec()).unwrap(),
            &out[end + 4..],
        )
    }

    fn gunzip(body: &[u8]) -> Vec<u8> {
        let mut plain = Vec::new();
        GzDecoder::new(body).read_to_end(&mut plain).unwrap();
        plain
    }

    fn hello(_: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        w.write(b"hello, compressed world")?;
        Ok(())
    }

    fn chunks(_: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        for part in ["one ", "two ", "three"] {
            w.write(part.as_bytes())?;
        }
        Ok(())
    }

    fn streamed(_: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        w.headers().set("Content-Length", "11");
        w.write_header(Status::OK)?;
        w.write(b"hello ")?;
        w.write(b"world")?;
        Ok(())
    }

    fn missing(_: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        w.write_header(Status::NOT_FOUND)?;
        Ok(())
    }

    fn pre_encoded(_: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        w.headers().set("Content-Encoding", "br");
        w.write(b"raw")?;
        Ok(())
    }

    fn own_encoding_with_head(
        _: &mut RequestContext<'_>,
        w: &mut dyn ResponseWriter,
    ) -> anyhow::Result<()> {
        w.headers().set("Content-Encoding", "br");
        w.headers().set("Content-Length", "3");
        w.write_header(Status::OK)?;
        w.write(b"raw")?;
        Ok(())
    }

    fn fails_midway(_: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        w.write(b"partial")?;
        anyhow::bail!("backend went away")
    }

    #[test]
    fn gzip_round_trip() {
        let out = serve(
            "GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
            Box::new(hello),
        );
        let (head, body) = split(&out);

        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Encoding: gzip\r\n"));
        assert!(head.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert_eq!(gunzip(body), b"hello, compressed world");
    }

    #[test]
    fn gzip_among_other_codings() {
        let out = serve(
            "GET / HTTP/1.1\r\nAccept-Encoding: invalid-1, gzip, invalid-2\r\n\r\n",
            Box::new(hello),
        );
        let (head, body) = split(&out);

        assert!(head.contains("Content-Encoding: gzip\r\n"));
        assert_eq!(gunzip(body), b"hello, compressed world");
    }

    #[test]
    fn no_gzip_leaves_body_alone() {
        for request in [
            "GET / HTTP/1.1\r\n\r\n",
            "GET / HTTP/1.1\r\nAccept-Encoding: br, deflate\r\n\r\n",
            "GET / HTTP/1.1\r\nAccept-Encoding: GZIP\r\n\r\n",
        ] {
            let out = serve(request, Box::new(hello));
            let (head, body) = split(&out);

            assert!(!head.contains("Content-Encoding"));
            assert_eq!(body, b"hello, compressed world");
        }
    }

    #[test]
    fn multi_chunk_body_gets_full_length() {
        let out = serve(
            "GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
            Box::new(chunks),
        );
        let (head, body) = split(&out);

        assert_eq!(head.matches("HTTP/1.1").count(), 1);
        assert!(head.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert_eq!(gunzip(body), b"one two three");
    }

    #[test]
    fn explicit_head_streams_without_length() {
        let out = serve(
            "GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
            Box::new(streamed),
        );
        let (head, body) = split(&out);

        assert_eq!(head, "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\n\r\n");
        assert_eq!(gunzip(body), b"hello world");
    }

    #[test]
    fn head_only_response_has_no_body() {
        let out = serve(
            "GET /missing HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
            Box::new(missing),
        );

        assert_eq!(out, b"HTTP/1.1 404 Not Found\r\nContent-Encoding: gzip\r\n\r\n");
    }

    #[test]
    fn already_encoded_is_not_wrapped() {
        let out = serve(
            "GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
            Box::new(pre_encoded),
        );
        let (head, body) = split(&out);

        assert!(head.contains("Content-Encoding: br\r\n"));
        assert!(!head.contains("gzip"));
        assert_eq!(body, b"raw");
    }

    #[test]
    fn own_encoding_with_explicit_head_keeps_length() {
        let out = serve(
            "GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n",
            Box::new(own_encoding_with_head),
        );

        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Encoding: br\r\nContent-Length: 3\r\n\r\nraw"
        );
    }

    #[test]
    fn failed_handler_sends_nothing() {
        let mut input = &b"GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n"[..];
        let request = parse_request(&mut input).unwrap();
        let mut ctx = RequestContext::from(request, HashMap::new());
        let middlewares: Vec<Box<dyn Middleware>> = vec![Box::new(CompressionMw::default())];
        let handler: HandlerFunc = Box::new(fails_midway);

        let mut out: Vec<u8> = Vec::new();
        let mut resp = Response::new(&mut out);
        let result = Next::new(&middlewares, &handler).run(&mut ctx, &mut resp);
        assert!(!resp.header_written());
        drop(resp);

        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn wrapper_delegates_headers() {
        let mut out: Vec<u8> = Vec::new();
        let mut resp = Response::new(&mut out);
        resp.headers().set("Content-Encoding", "gzip");
        {
            let mut gz = GzipResponseWriter::new(&mut resp, Compression::fast());
            gz.headers().set("X-Test", "1");
            assert!(!gz.header_written());
            gz.write(b"abc").unwrap();
            assert!(!gz.header_written());
            gz.finish().unwrap();
        }
        assert!(resp.header_written());
        assert_eq!(resp.headers().get("X-Test"), Some("1"));
    }
}
