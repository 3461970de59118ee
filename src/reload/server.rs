//! WebSocket server for live reload.
//!
//! One acceptor thread performs handshakes and registers clients; reloads
//! are broadcast from whichever thread calls [`ReloadSink::full_reload`].
//! Clients whose socket fails on send are dropped.

use super::{ReloadMessage, ReloadSink};
use crate::{debug, log};
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::{
    net::{IpAddr, SocketAddr, TcpListener, TcpStream},
    sync::Arc,
    thread,
};
use tungstenite::{Message, WebSocket};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Handle to the running live-reload server. Clones share the client list.
#[derive(Clone)]
pub struct ReloadServer {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    port: u16,
}

impl ReloadServer {
    /// Bind (retrying on higher ports) and start accepting clients.
    pub fn start(interface: IpAddr, base_port: u16) -> Result<Self> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        let server = Self {
            clients: Arc::new(Mutex::new(Vec::new())),
            port,
        };

        let acceptor = server.clone();
        thread::spawn(move || acceptor.accept_loop(listener));

        if port != base_port {
            log!("reload"; "port {} in use, using {} instead", base_port, port);
        }
        Ok(server)
    }

    /// Port the server actually bound to.
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[cfg(test)]
    fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    fn accept_loop(&self, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.add_client(stream),
                Err(e) => log!("reload"; "accept error: {e}"),
            }
        }
    }

    fn add_client(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        match tungstenite::accept(stream) {
            Ok(mut ws) => {
                if let Err(e) = ws.send(Message::text(ReloadMessage::connected().to_json())) {
                    debug!("reload"; "failed to greet client: {e}");
                    return;
                }
                let mut clients = self.clients.lock();
                clients.push(ws);
                debug!("reload"; "client {:?} connected (total: {})", peer, clients.len());
            }
            Err(e) => log!("reload"; "handshake failed: {e}"),
        }
    }

    fn broadcast(&self, message: &ReloadMessage) {
        let payload = message.to_json();
        let mut clients = self.clients.lock();

        clients.retain_mut(|ws| match ws.send(Message::text(payload.clone())) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {e}");
                false
            }
        });
        debug!("reload"; "sent {} to {} clients", payload, clients.len());
    }
}

impl ReloadSink for ReloadServer {
    fn full_reload(&self, path: &str) {
        self.broadcast(&ReloadMessage::full_reload(path));
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let addr = SocketAddr::new(interface, base_port.saturating_add(offset));
        match TcpListener::bind(addr) {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                return Ok((listener, port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind live-reload server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
