//! Development server with on-request rendering and live reload.
//!
//! Built on `tiny_http`. Pages are rendered from source on every request
//! through the shared [`PageRenderer`], so the render cache and partial
//! index are the same ones the watcher invalidates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │   Main Thread   │   │  Watcher Thread  │   │  Reload Thread   │
//! │  (HTTP Server)  │   │  (File Monitor)  │   │   (WebSocket)    │
//! └────────┬────────┘   └────────┬─────────┘   └────────▲─────────┘
//!          │ render_page         │ invalidate           │ full-reload
//!          ▼                     ▼                      │
//!     ┌──────────────────────────────────┐              │
//!     │  Arc<Mutex<PageRenderer>>        │──────────────┘
//!     └──────────────────────────────────┘
//! ```

use crate::{
    config::SiteConfig,
    log,
    reload::{ReloadServer, inject_client},
    render::{PageId, PageRenderer},
    utils::category::is_html,
    watch::watch_for_changes_blocking,
};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the development server.
///
/// 1. Loads partials into a shared renderer
/// 2. Starts the live-reload WebSocket server (when watching)
/// 3. Binds HTTP (with auto-retry on port conflict) and Ctrl+C handling
/// 4. Spawns the file watcher thread (when watching)
/// 5. Handles requests until Ctrl+C
pub fn serve_site(config: &'static SiteConfig) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", config.serve.interface))?;

    let mut renderer = PageRenderer::for_site(config);
    let count = renderer.load_all_partials(&config.build.partials);
    log!("partials"; "loaded {count} partials");
    let renderer = Arc::new(Mutex::new(renderer));

    let reload = if config.serve.watch {
        let server = ReloadServer::start(interface, config.serve.reload_port)?;
        log!("reload"; "ws://{}:{}", interface, server.port());
        Some(server)
    } else {
        None
    };

    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    if !config.site.title.is_empty() {
        log!("serve"; "{}", config.site.title);
    }
    log!("serve"; "http://{}", addr);

    if let Some(reload) = reload.clone() {
        let renderer = Arc::clone(&renderer);
        std::thread::spawn(move || {
            if let Err(err) = watch_for_changes_blocking(config, &renderer, &reload) {
                log!("watch"; "{err}");
            }
        });
    }

    let reload_port = reload.as_ref().map(ReloadServer::port);
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, config, &renderer, reload_port) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < max_retries => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    max_retries,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    Err(anyhow::anyhow!("No port to bind (max_retries = 0)"))
}

// ============================================================================
// Request Resolution
// ============================================================================

/// What a request path maps to.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    /// Page template under the pages root, rendered on the fly
    Page(PathBuf),
    /// File served as-is
    File(PathBuf),
    /// Directory requested without a trailing slash
    Redirect(String),
    NotFound,
}

/// Resolve a raw request URL.
///
/// Resolution order:
/// 1. `.html` file (or directory `index.html`) under pages → render;
///    `/dir` redirects to `/dir/` first so relative links and reload paths agree
/// 2. Other file under pages → serve
/// 3. File under public → serve
/// 4. Nothing found → 404
fn resolve_target(url: &str, config: &SiteConfig) -> Target {
    // Decode URL-encoded characters (e.g., %20 → space)
    let url_path = urlencoding::decode(url)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    // Strip query string (e.g., ?t=123456) before resolving path
    let path_without_query = url_path.split(['?', '#']).next().unwrap_or(&url_path);
    let request_path = Path::new(path_without_query.trim_matches('/'));

    if request_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Target::NotFound;
    }

    let mut local = config.build.pages.join(request_path);
    if local.is_dir() {
        if !path_without_query.ends_with('/') {
            return Target::Redirect(with_trailing_slash(url));
        }
        local = local.join("index.html");
    }

    if local.is_file() && !local.starts_with(&config.build.output) {
        return if is_html(&local) {
            Target::Page(local)
        } else {
            Target::File(local)
        };
    }

    let public = config.build.public.join(request_path);
    if public.is_file() {
        return Target::File(public);
    }

    Target::NotFound
}

/// `/weeks?t=1` → `/weeks/?t=1`
fn with_trailing_slash(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    format!("{}/{}", &url[..end], &url[end..])
}

/// Handle a single HTTP request.
fn handle_request(
    request: Request,
    config: &SiteConfig,
    renderer: &Mutex<PageRenderer>,
    reload_port: Option<u16>,
) -> Result<()> {
    match resolve_target(request.url(), config) {
        Target::Page(path) => {
            let html = render_source(&path, config, renderer)?;
            let html = match reload_port {
                Some(port) => inject_client(&html, port),
                None => html,
            };
            serve_html(request, html)
        }
        Target::File(path) => serve_file(request, &path),
        Target::Redirect(location) => serve_redirect(request, &location),
        Target::NotFound => serve_not_found(request),
    }
}

/// Read a page source and render it through the shared cache.
fn render_source(path: &Path, config: &SiteConfig, renderer: &Mutex<PageRenderer>) -> Result<String> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let page = PageId::from_source(path, &config.build.pages)
        .with_context(|| format!("{} is outside the pages root", path.display()))?;

    let html = renderer
        .lock()
        .render_page(&page, &source, Some(path))
        .into_html()
        .into_owned();
    Ok(html)
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type(value: &str) -> Header {
    // Header values here are static ASCII
    Header::from_bytes("Content-Type", value).unwrap()
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content).with_header(content_type(guess_content_type(path)));

    request.respond(response)?;
    Ok(())
}

/// Serve HTML content.
fn serve_html(request: Request, content: String) -> Result<()> {
    let response =
        Response::from_string(content).with_header(content_type("text/html; charset=utf-8"));
    request.respond(response)?;
    Ok(())
}

/// Serve 301 Moved Permanently to `location`.
fn serve_redirect(request: Request, location: &str) -> Result<()> {
    let header = Header::from_bytes("Location", location)
        .map_err(|()| anyhow::anyhow!("Invalid redirect location: {location}"))?;
    request.respond(Response::empty(StatusCode(301)).with_header(header))?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![content_type("text/plain")],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("webmanifest") => "application/manifest+json",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}
