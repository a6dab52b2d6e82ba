//! In-process stand-in for clamd.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the fake daemon saw on its single connection.
#[derive(Debug, Default)]
pub struct ClamdSession {
    pub command: Vec<u8>,
    /// Length prefix of every data chunk, in arrival order.
    pub chunk_lengths: Vec<u32>,
    pub payload: Vec<u8>,
    /// Whether a zero-length terminator arrived.
    pub terminated: bool,
}

pub struct FakeClamd {
    pub address: SocketAddr,
    handle: JoinHandle<ClamdSession>,
}

impl FakeClamd {
    /// Accept one `INSTREAM` session and answer it with `reply`.
    pub async fn start(reply: &'static str) -> Self {
        Self::start_with_reply_parts(vec![reply.as_bytes()]).await
    }

    /// Like `start`, but writes the reply in separate pieces with a pause between them.
    pub async fn start_with_reply_parts(parts: Vec<&'static [u8]>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut session = ClamdSession::default();

            let mut command = vec![0u8; b"zINSTREAM\0".len()];
            socket.read_exact(&mut command).await.unwrap();
            session.command = command;

            loop {
                let mut prefix = [0u8; 4];
                if socket.read_exact(&mut prefix).await.is_err() {
                    // Client went away without a terminator.
                    return session;
                }
                let len = u32::from_be_bytes(prefix);
                if len == 0 {
                    session.terminated = true;
                    break;
                }
                let mut chunk = vec![0u8; len as usize];
                if socket.read_exact(&mut chunk).await.is_err() {
                    return session;
                }
                session.chunk_lengths.push(len);
                session.payload.extend_from_slice(&chunk);
            }

            for part in parts {
                socket.write_all(part).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            socket.shutdown().await.ok();
            session
        });

        Self { address, handle }
    }

    pub fn host(&self) -> String {
        self.address.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// Wait for the session to finish and return what was received.
    pub async fn session(self) -> ClamdSession {
        self.handle.await.unwrap()
    }
}
