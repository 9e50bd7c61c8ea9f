use crate::http::handler::HandlerFunc;
use crate::http::request::RequestContext;
use crate::http::response::ResponseWriter;

pub mod compression;

pub trait Middleware: Send + Sync {
    fn handle(
        &self,
        ctx: &mut RequestContext<'_>,
        w: &mut dyn ResponseWriter,
        next: Next<'_>,
    ) -> anyhow::Result<()>;
}

/// The rest of the chain: remaining middlewares, then the routed handler.
pub struct Next<'a> {
    pub(crate) middlewares: &'a [Box<dyn Middleware>],
    pub(crate) handler: &'a HandlerFunc,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Box<dyn Middleware>], handler: &'a HandlerFunc) -> Next<'a> {
        Next {
            middlewares,
            handler,
        }
    }

    pub fn run(self, ctx: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
        if let Some((first, rest)) = self.middlewares.split_first() {
            let next = Next {
                middlewares: rest,
                handler: self.handler,
            };
            first.handle(ctx, w, next)
        } else {
            (self.handler)(ctx, w)
        }
    }
}
