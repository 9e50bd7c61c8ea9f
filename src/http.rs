pub mod encoding;
pub mod error;
pub mod handler;
pub mod header;
pub mod middleware;
pub mod parse;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod status;

pub(crate) const BUFFER_SIZE: usize = 1024;
