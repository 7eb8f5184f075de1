//! The accept loop and the shutdown sequence.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use dotchat_common::crypto::tls;

use crate::manager::ConnectionManager;
use crate::store::{Store, DB_FILE};

/// TCP port the server listens on.
pub const PORT: u16 = 42069;

/// Budget for one accept poll.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Run the server until SIGINT.
pub fn run(key_path: &Path, cert_path: &Path) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;

    let store = Arc::new(Store::open(Path::new(DB_FILE))?);
    let tls_config = tls::server_config(key_path, cert_path)?;

    let listener = TcpListener::bind(("0.0.0.0", PORT))?;
    listener.set_nonblocking(true)?;
    let manager = ConnectionManager::new();
    info!(port = PORT, "waiting for connections");

    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((socket, peer)) => {
                if let Err(err) = accept_session(&manager, &tls_config, &store, socket, peer) {
                    warn!(%peer, error = %err, "failed to set up accepted connection");
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }

    let states = manager.states();
    info!(workers = states.len(), "shutdown requested; draining workers");
    manager.shutdown_all();
    info!("shutdown complete");
    Ok(())
}

fn accept_session(
    manager: &ConnectionManager,
    tls_config: &Arc<rustls::ServerConfig>,
    store: &Arc<Store>,
    socket: TcpStream,
    peer: SocketAddr,
) -> anyhow::Result<()> {
    // the listener is non-blocking for the poll loop; the session itself
    // uses blocking reads
    socket.set_nonblocking(false)?;
    let conn = rustls::ServerConnection::new(Arc::clone(tls_config))?;
    let session = rustls::StreamOwned::new(conn, socket);

    let id = manager.enlist(session, Arc::clone(store))?;
    info!(%peer, worker = id, "accepted connection");
    Ok(())
}
