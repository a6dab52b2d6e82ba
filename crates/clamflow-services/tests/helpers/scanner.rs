//! Scanner returning a scripted result after draining the stream.

use async_trait::async_trait;
use clamflow_services::{MalwareScanner, ScanError, ScanOutcome};
use std::io;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Clone)]
pub enum Script {
    Clean,
    Infected(&'static str),
    Unrecognized(&'static str),
    TransportError,
    ConnectionFailed,
}

pub struct ScriptedScanner {
    script: Script,
    /// Bytes drained from each stream handed to the scanner.
    scanned: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedScanner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            scanned: Mutex::new(Vec::new()),
        }
    }

    pub fn scanned(&self) -> Vec<Vec<u8>> {
        self.scanned.lock().unwrap().clone()
    }
}

#[async_trait]
impl MalwareScanner for ScriptedScanner {
    async fn scan_stream(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        _declared_size: u64,
    ) -> Result<ScanOutcome, ScanError> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        let size = body.len() as u64;
        self.scanned.lock().unwrap().push(body);

        match self.script.clone() {
            Script::Clean => Ok(ScanOutcome::clean("stream: OK").with_transfer(1, size)),
            Script::Infected(name) => Ok(ScanOutcome::infected(
                Some(name.to_string()),
                format!("stream: {} FOUND", name),
            )
            .with_transfer(1, size)),
            Script::Unrecognized(reply) => Ok(ScanOutcome::unrecognized(reply)),
            Script::TransportError => Err(ScanError::TransportError {
                stage: "sending chunk",
                chunks_sent: 1,
                bytes_sent: size,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "daemon hung up"),
            }),
            Script::ConnectionFailed => Err(ScanError::ConnectionFailed {
                address: "127.0.0.1:3310".to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
