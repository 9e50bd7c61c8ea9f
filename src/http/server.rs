use crate::concurrency::ThreadPool;
use crate::http::error::RouteError;
use crate::http::middleware::compression::CompressionMw;
use crate::http::middleware::{Middleware, Next};
use crate::http::parse::parse_request;
use crate::http::request::RequestContext;
use crate::http::response::{Response, ResponseWriter};
use crate::http::router::Router;
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub port: u16,
    /// Where file-serving handlers read and write.
    pub file_server_root: PathBuf,
    pub num_workers: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            port: 4221,
            file_server_root: PathBuf::from("/tmp/"),
            num_workers: 10,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    router: Router,
    pool: ThreadPool,
    middlewares: Vec<Box<dyn Middleware>>,
    options: ServerOptions,
}

impl Server {
    fn new(listener: TcpListener, options: ServerOptions) -> Server {
        let mut s = Server {
            listener,
            router: Router::default(),
            pool: ThreadPool::new(options.num_workers.max(1)),
            middlewares: Vec::new(),
            options,
        };

        s.add_middleware(Box::new(CompressionMw::default()));
        s
    }

    /// Binds `0.0.0.0:<port>`.
    pub fn bind(options: ServerOptions) -> io::Result<Server> {
        Self::from_tcp_addr(("0.0.0.0", options.port), options)
    }

    pub fn from_tcp_addr(addr: impl ToSocketAddrs, options: ServerOptions) -> io::Result<Server> {
        let listener = TcpListener::bind(addr)?;
        Ok(Server::new(listener, options))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn register<F>(&mut self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut RequestContext<'_>, &mut dyn ResponseWriter) -> anyhow::Result<()>
            + Sync
            + Send
            + 'static,
    {
        match self.router.register(pattern, f) {
            Ok(()) => {
                debug!(pattern, "route registered");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "route rejected");
                Err(e)
            }
        }
    }

    pub fn add_middleware(&mut self, m: Box<dyn Middleware>) {
        self.middlewares.push(m);
    }

    /// Accepts connections until the listener fails for good. Each one is
    /// served on the worker pool; routes must be registered before this.
    pub fn run(self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, routes = self.router.len(), "listening");

        let server = Arc::new(self);
        for stream in server.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let thread_server = Arc::clone(&server);
                    server
                        .pool
                        .execute(move || thread_server.process_incoming(stream));
                }
                Err(e) => warn!(error = %e, "can't accept connection"),
            }
        }
        Ok(())
    }

    fn process_incoming(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        debug!(%peer, "accepted connection");

        self.serve_connection(&stream, &stream);

        if let Err(e) = stream.shutdown(Shutdown::Write) {
            debug!(%peer, error = %e, "shutdown failed");
        }
        debug!(%peer, "connection closed");
    }

    /// Handles the single request read from `input`, answering on `output`.
    /// A request that can't be parsed gets no response.
    pub fn serve_connection<R: Read, W: Write>(&self, input: R, mut output: W) {
        let mut rdr = BufReader::new(input);
        let request = match parse_request(&mut rdr) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "dropping connection");
                return;
            }
        };
        info!(method = %request.method, path = %request.path, "request");

        let route = self.router.resolve(&request.method, &request.path);
        let mut ctx = RequestContext::from(request, route.vars);
        let mut resp = Response::new(&mut output);

        let result = Next::new(&self.middlewares, route.handler).run(&mut ctx, &mut resp);
        if let Err(e) = result {
            warn!(
                method = %ctx.request().method,
                path = %ctx.request().path,
                "handler failed: {e:#}"
            );
        }
        if !resp.header_written() {
            debug!(path = %ctx.request().path, "handler sent no response");
        }
        drop(resp);

        if let Err(e) = output.flush() {
            debug!(error = %e, "flush failed");
        }
    }
}
