mod concurrency;
mod http;

use anyhow::Context;
use clap::Parser;
use http::request::RequestContext;
use http::response::ResponseWriter;
use http::server::{Server, ServerOptions};
use http::status::Status;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Minimal HTTP/1.1 server")]
struct Args {
    /// Directory served under /files/
    #[arg(long)]
    directory: Option<PathBuf>,
    #[arg(long)]
    port: Option<u16>,
    /// Connections handled concurrently
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let defaults = ServerOptions::default();
    let options = ServerOptions {
        port: args.port.unwrap_or(defaults.port),
        file_server_root: args.directory.unwrap_or(defaults.file_server_root),
        num_workers: args.workers.unwrap_or(defaults.num_workers),
    };
    info!(root = %options.file_server_root.display(), "serving files");

    let mut server = Server::bind(options.clone())
        .with_context(|| format!("failed to bind to port {}", options.port))?;
    register_handlers(&mut server)?;

    server.run()?;
    Ok(())
}

fn register_handlers(server: &mut Server) -> anyhow::Result<()> {
    server.register("GET /", index)?;
    server.register("GET /echo/{str}", echo)?;
    server.register("GET /user-agent", user_agent)?;

    let root = server.options().file_server_root.clone();
    server.register("GET /files/{path}", move |ctx, w| get_file(ctx, w, &root))?;

    let root = server.options().file_server_root.clone();
    server.register("POST /files/{path}", move |ctx, w| post_file(ctx, w, &root))?;

    Ok(())
}

/// Sends a complete response with a known length.
fn respond(w: &mut dyn ResponseWriter, status: Status, body: &[u8]) -> anyhow::Result<()> {
    w.headers().set("Content-Length", body.len().to_string());
    w.write_header(status)?;
    w.write(body)?;
    Ok(())
}

fn index(_ctx: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
    w.write(b"")?;
    Ok(())
}

fn echo(ctx: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
    let s = ctx.get_var("str").unwrap_or_default().to_string();
    debug!(%s, "echoing back");
    w.write(s.as_bytes())?;
    Ok(())
}

fn user_agent(ctx: &mut RequestContext<'_>, w: &mut dyn ResponseWriter) -> anyhow::Result<()> {
    match ctx.get_header("user-agent") {
        Some([agent]) => {
            w.write(agent.as_bytes())?;
            Ok(())
        }
        _ => respond(w, Status::BAD_REQUEST, b"User-Agent header is required"),
    }
}

/// Resolves a `/files/{path}` segment under `root`, refusing to leave it.
fn file_path(ctx: &RequestContext<'_>, root: &Path) -> Option<PathBuf> {
    match ctx.get_var("path")? {
        "" | "." | ".." => None,
        name => Some(root.join(name)),
    }
}

fn get_file(
    ctx: &mut RequestContext<'_>,
    w: &mut dyn ResponseWriter,
    root: &Path,
) -> anyhow::Result<()> {
    let Some(path) = file_path(ctx, root) else {
        return respond(w, Status::NOT_FOUND, b"");
    };

    match fs::read(&path) {
        Ok(content) => {
            w.headers().set("Content-Type", "application/octet-stream");
            w.write(&content)?;
            Ok(())
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "can't read file");
            respond(w, Status::NOT_FOUND, b"")
        }
    }
}

fn post_file(
    ctx: &mut RequestContext<'_>,
    w: &mut dyn ResponseWriter,
    root: &Path,
) -> anyhow::Result<()> {
    let Some(path) = file_path(ctx, root) else {
        return respond(w, Status::BAD_REQUEST, b"invalid file name");
    };

    match ctx.request().content_length() {
        Ok(Some(_)) => {}
        _ => return respond(w, Status::BAD_REQUEST, b"missing Content-Length header."),
    }

    let content = match ctx.request_mut().read_body() {
        Ok(content) => content,
        Err(e) => {
            let msg = format!("couldn't read the whole content: {e}");
            return respond(w, Status::BAD_REQUEST, msg.as_bytes());
        }
    };

    fs::write(&path, &content)
        .with_context(|| format!("can't write {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "file stored");

    respond(w, Status::CREATED, b"")
}
