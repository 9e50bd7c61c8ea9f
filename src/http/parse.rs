use crate::http::error::ParseError;
use crate::http::header::HeaderMap;
use crate::http::request::Request;
use std::io::BufRead;

/// Reads a request line and headers off `rdr`. The body is left unread in
/// `rdr`, which the returned request borrows.
pub fn parse_request<R: BufRead>(rdr: &mut R) -> Result<Request<'_>, ParseError> {
    let mut line = String::new();

    read_line(rdr, &mut line)?;
    let first_line_parts: Vec<&str> = line.split(' ').collect();
    let (method, path) = match first_line_parts[..] {
        [method, path, ..] if !method.is_empty() && !path.is_empty() => {
            (method.to_string(), path.to_string())
        }
        _ => return Err(ParseError::InvalidRequestLine(line.clone())),
    };

    let mut headers = HeaderMap::new();
    loop {
        read_line(rdr, &mut line)?;
        if line.is_empty() {
            break;
        }

        let (k, v) = line
            .split_once(": ")
            .ok_or_else(|| ParseError::InvalidHeader(line.clone()))?;
        headers.append(k, v);
    }

    Ok(Request {
        method,
        path,
        headers,
        body: rdr,
    })
}

/// Reads one LF or CRLF terminated line into `line`, without the terminator.
fn read_line(rdr: &mut impl BufRead, line: &mut String) -> Result<(), ParseError> {
    line.clear();
    if rdr.read_line(line)? == 0 {
        return Err(ParseError::UnexpectedEof);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(())
}
