use crate::http::request::RequestContext;
use crate::http::response::ResponseWriter;
use crate::http::status::Status;

pub type HandlerFunc =
    Box<dyn Fn(&mut RequestContext<'_>, &mut dyn ResponseWriter) -> anyhow::Result<()> + Sync + Send>;

/// Answers `404 Not Found` with an empty body.
pub fn not_found(_ctx: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
    w.write_header(Status::NOT_FOUND)?;
    Ok(())
}
