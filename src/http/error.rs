use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid request line: {0:?}")]
    InvalidRequestLine(String),
    #[error("malformed header line: {0:?}")]
    InvalidHeader(String),
    #[error("invalid value for header {0}")]
    InvalidHeaderValue(&'static str),
    #[error("connection closed before the request head was complete")]
    UnexpectedEof,
    #[error("can't read request: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("pattern {0:?} does not have <VERB PATH> form")]
    Malformed(String),
}
