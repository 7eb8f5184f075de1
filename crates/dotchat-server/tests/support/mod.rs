//! Shared helpers for the server integration tests: a scripted in-memory
//! transport standing in for a TLS session, plus codec round-trip
//! helpers.
#![allow(dead_code)] // each test binary uses its own subset

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use dotchat_common::proto::wire;
use dotchat_common::{ByteStream, Message, Transport};

/// In-memory transport fed over channels. Reads block until the peer
/// sends a chunk; dropping the peer's sender reads as a close.
pub struct ChannelTransport {
    inbound: Receiver<Vec<u8>>,
    outbound: Sender<Vec<u8>>,
    closed: Arc<AtomicBool>,
    leftover: Vec<u8>,
}

/// The test's end of a [`ChannelTransport`].
pub struct Peer {
    to_worker: Option<Sender<Vec<u8>>>,
    pub from_worker: Receiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl Peer {
    pub fn send_bytes(&self, bytes: Vec<u8>) {
        // a worker that already stopped has dropped its receiver; tests
        // nudging a stopping worker must not care
        if let Some(tx) = &self.to_worker {
            let _ = tx.send(bytes);
        }
    }

    /// Drop the send side; the worker reads this as a peer close.
    pub fn hang_up(&mut self) {
        self.to_worker = None;
    }

    pub fn send_message(&self, msg: &Message) {
        self.send_bytes(encode(msg));
    }

    pub fn recv_message(&self) -> Message {
        let bytes = self
            .from_worker
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("no response from worker");
        decode(&bytes)
    }

    pub fn worker_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn transport_pair() -> (ChannelTransport, Peer) {
    let (to_worker, inbound) = mpsc::channel();
    let (outbound, from_worker) = mpsc::channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        ChannelTransport {
            inbound,
            outbound,
            closed: Arc::clone(&closed),
            leftover: Vec::new(),
        },
        Peer {
            to_worker: Some(to_worker),
            from_worker,
            closed,
        },
    )
}

impl Transport for ChannelTransport {
    fn read_some(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.leftover.is_empty() {
            match self.inbound.recv() {
                Ok(chunk) => self.leftover = chunk,
                // peer dropped its sender: connection closed
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.leftover.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.drain(..n);
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        // the peer may have stopped listening; that is not a write failure
        // this transport needs to report
        let _ = self.outbound.send(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn encode(msg: &Message) -> Vec<u8> {
    let mut stream = ByteStream::new();
    wire::encode(msg, &mut stream).expect("test message encodes");
    stream.unread().to_vec()
}

pub fn decode(bytes: &[u8]) -> Message {
    let mut stream = ByteStream::from_bytes(bytes);
    let msg = wire::decode(&mut stream).expect("test message decodes");
    assert!(stream.is_empty(), "response carried trailing bytes");
    msg
}
