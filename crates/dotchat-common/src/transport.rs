//! The blocking transport contract the wire stack runs over.
//!
//! Everything above this trait only assumes: a blocking read that returns
//! some bytes (zero meaning the peer closed), a blocking write of a whole
//! slice, and a graceful close. The production implementation is a rustls
//! session over TCP; tests substitute scripted in-memory transports.

use std::io;
use std::net::{Shutdown, TcpStream};

use rustls::{ClientConnection, ServerConnection, StreamOwned};

/// One reliable, ordered, encrypted byte pipe.
pub trait Transport: Send {
    /// Read some bytes into `buf`. `Ok(0)` means the peer closed.
    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write the entire slice.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Close gracefully. Safe to call more than once.
    fn close(&mut self);
}

macro_rules! impl_tls_transport {
    ($conn:ty) => {
        impl Transport for StreamOwned<$conn, TcpStream> {
            fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match io::Read::read(self, buf) {
                    Ok(n) => Ok(n),
                    // peer went away without close_notify; same as a close
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
                    Err(e) => Err(e),
                }
            }

            fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
                io::Write::write_all(self, bytes)?;
                io::Write::flush(self)
            }

            fn close(&mut self) {
                self.conn.send_close_notify();
                let _ = io::Write::flush(self);
                let _ = self.sock.shutdown(Shutdown::Both);
            }
        }
    };
}

impl_tls_transport!(ServerConnection);
impl_tls_transport!(ClientConnection);
