//! One thread per connection.
//!
//! A worker owns its transport exclusively and loops
//! read → dispatch → write until the peer closes, a stop is requested, or
//! the transport fails. The state field is a single atomic word: the
//! worker writes it freely, the manager only ever performs the
//! `Running → StopRequested` transition, and everyone else just reads.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use dotchat_common::error::{ChatError, Result};
use dotchat_common::proto::wire;
use dotchat_common::{ByteStream, Message, Transport};

use crate::dispatch::dispatch;
use crate::store::Store;

/// Lifecycle of a connection worker.
///
/// `Waiting → Running → {StopRequested → Stopped} | Finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Waiting = 0,
    Running = 1,
    StopRequested = 2,
    Stopped = 3,
    Finished = 4,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Waiting,
            1 => WorkerState::Running,
            2 => WorkerState::StopRequested,
            3 => WorkerState::Stopped,
            _ => WorkerState::Finished,
        }
    }
}

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle on a connection worker thread.
pub struct Worker {
    id: u64,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start a worker for `transport`. The thread begins serving
    /// immediately.
    pub fn spawn<T: Transport + 'static>(
        transport: T,
        store: Arc<Store>,
    ) -> std::io::Result<Worker> {
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(AtomicU8::new(WorkerState::Waiting as u8));
        let thread_state = Arc::clone(&state);

        let handle = thread::Builder::new()
            .name(format!("conn-{id}"))
            .spawn(move || serve(transport, store, thread_state, id))?;

        Ok(Worker {
            id,
            state,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Ask the worker to stop. Advisory: the worker observes the request
    /// between messages; a blocked read completes first.
    pub fn request_stop(&self) {
        let _ = self.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::StopRequested as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state(), WorkerState::Stopped | WorkerState::Finished)
    }

    /// Wait for the worker thread to finish.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Request a stop and wait for the thread.
    pub fn stop_sync(&mut self) {
        self.request_stop();
        self.join();
    }
}

fn serve<T: Transport>(mut transport: T, store: Arc<Store>, state: Arc<AtomicU8>, id: u64) {
    state.store(WorkerState::Running as u8, Ordering::SeqCst);
    debug!(worker = id, "connection worker started");

    let mut inbound = ByteStream::new();
    let finish = |transport: &mut T, state: &AtomicU8, terminal: WorkerState| {
        transport.close();
        state.store(terminal as u8, Ordering::SeqCst);
    };

    loop {
        if state.load(Ordering::SeqCst) == WorkerState::StopRequested as u8 {
            debug!(worker = id, "stopping on request");
            finish(&mut transport, &state, WorkerState::Stopped);
            return;
        }

        let msg = match read_message(&mut transport, &mut inbound) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!(worker = id, "peer closed the connection");
                finish(&mut transport, &state, WorkerState::Finished);
                return;
            }
            Err(err) => {
                warn!(worker = id, error = %err, "closing connection after read failure");
                finish(&mut transport, &state, WorkerState::Finished);
                return;
            }
        };

        let reply = match dispatch(&store, &msg) {
            Ok(reply) => reply,
            Err(err) => {
                error!(worker = id, error = %err, "fatal error while handling request");
                finish(&mut transport, &state, WorkerState::Finished);
                return;
            }
        };

        let mut outbound = ByteStream::new();
        if let Err(err) = wire::encode(&reply, &mut outbound) {
            error!(worker = id, error = %err, "response does not fit the wire format");
            finish(&mut transport, &state, WorkerState::Finished);
            return;
        }
        if let Err(err) = transport.write_all(outbound.unread()) {
            warn!(worker = id, error = %err, "closing connection after write failure");
            finish(&mut transport, &state, WorkerState::Finished);
            return;
        }

        if state.load(Ordering::SeqCst) == WorkerState::StopRequested as u8 {
            debug!(worker = id, "stopping on request");
            finish(&mut transport, &state, WorkerState::Stopped);
            return;
        }
    }
}

/// Read until `inbound` holds one complete message, then decode it.
///
/// The format is self-delimiting, so a `Truncated` decode on an open
/// connection just means "read more". `Ok(None)` reports a peer close.
fn read_message<T: Transport>(
    transport: &mut T,
    inbound: &mut ByteStream,
) -> Result<Option<Message>> {
    let mut buf = [0u8; 4096];
    loop {
        if !inbound.is_empty() {
            let mut attempt = inbound.clone();
            match wire::decode(&mut attempt) {
                Ok(msg) => {
                    *inbound = attempt;
                    return Ok(Some(msg));
                }
                Err(ChatError::Truncated) => {}
                Err(err) => return Err(err),
            }
        }

        match transport.read_some(&mut buf)? {
            0 => return Ok(None),
            n => inbound.write(&buf[..n]),
        }
    }
}
