//! Blocking TLS connection to the server.

use std::net::TcpStream;
use std::path::Path;

use rustls::pki_types::ServerName;
use rustls::{ClientConnection, StreamOwned};

use dotchat_common::crypto::tls;
use dotchat_common::error::{ChatError, Result};
use dotchat_common::proto::wire;
use dotchat_common::{ByteStream, Message, Transport};

/// One TLS session, strictly request → response.
pub struct Connection {
    stream: StreamOwned<ClientConnection, TcpStream>,
    inbound: ByteStream,
}

impl Connection {
    /// Connect to `host:port`, verifying the server against the
    /// certificate in `cert_path`.
    pub fn open(cert_path: &Path, host: &str, port: u16) -> Result<Self> {
        let config = tls::client_config(cert_path)?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| ChatError::Tls(format!("Invalid server name '{host}'")))?;

        let conn = ClientConnection::new(config, server_name)?;
        let socket = TcpStream::connect((host, port))?;
        Ok(Self {
            stream: StreamOwned::new(conn, socket),
            inbound: ByteStream::new(),
        })
    }

    /// Send one request and block until the reply decodes.
    pub fn round_trip(&mut self, req: &Message) -> Result<Message> {
        let mut outbound = ByteStream::new();
        wire::encode(req, &mut outbound)?;
        self.stream.write_all(outbound.unread())?;

        let mut buf = [0u8; 4096];
        loop {
            if !self.inbound.is_empty() {
                let mut attempt = self.inbound.clone();
                match wire::decode(&mut attempt) {
                    Ok(msg) => {
                        self.inbound = attempt;
                        return Ok(msg);
                    }
                    Err(ChatError::Truncated) => {}
                    Err(err) => return Err(err),
                }
            }
            match self.stream.read_some(&mut buf)? {
                0 => return Err(ChatError::ConnectionClosed),
                n => self.inbound.write(&buf[..n]),
            }
        }
    }

    pub fn close(&mut self) {
        self.stream.close();
    }
}
