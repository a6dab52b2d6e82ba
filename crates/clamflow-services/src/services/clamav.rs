use crate::services::clamd_protocol::{
    chunk_prefix, classify_reply, fill_chunk, reply_text, ClamdReply, INSTREAM_COMMAND,
    PING_COMMAND, PREFIX_LEN, TERMINATOR, VERSION_COMMAND,
};
use crate::services::scanner::{MalwareScanner, ScanError, ScanOutcome};
use async_trait::async_trait;
use clamflow_core::ClamAvConfig;
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;
const DEFAULT_MAX_SCAN_SIZE: u64 = 1024 * 1024 * 1024 * 1024;

/// clamd client speaking the `INSTREAM` protocol over TCP.
///
/// Input is streamed chunk by chunk; at most one chunk is held in memory.
#[derive(Clone, Debug)]
pub struct ClamAVService {
    address: String,
    dial_timeout: Duration,
    /// Per-write and response-read deadline; `None` waits indefinitely.
    io_timeout: Option<Duration>,
    chunk_size: usize,
    max_scan_size: u64,
}

impl ClamAVService {
    /// Create a new ClamAVService.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    pub fn new(host: String, port: u16) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            io_timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_scan_size: DEFAULT_MAX_SCAN_SIZE,
        }
    }

    pub fn from_config(config: &ClamAvConfig) -> Self {
        Self::new(config.host.clone(), config.port)
            .with_dial_timeout(config.dial_timeout())
            .with_io_timeout(config.io_timeout())
            .with_chunk_size(config.chunk_size_bytes())
            .with_max_scan_size(config.max_file_size_bytes())
    }

    pub fn with_dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    pub fn with_io_timeout(mut self, io_timeout: Option<Duration>) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Chunk size in bytes. Values that cannot be framed are clamped to 1..=u32::MAX.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, u32::MAX as usize);
        self
    }

    pub fn with_max_scan_size(mut self, max_scan_size: u64) -> Self {
        self.max_scan_size = max_scan_size;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_scan_size(&self) -> u64 {
        self.max_scan_size
    }

    /// Check that the daemon answers `PING` with `PONG`.
    pub async fn ping(&self) -> Result<bool, ScanError> {
        let reply = self.simple_command(PING_COMMAND).await?;
        Ok(reply == "PONG")
    }

    /// Daemon engine and signature database version.
    pub async fn version(&self) -> Result<String, ScanError> {
        self.simple_command(VERSION_COMMAND).await
    }

    /// Stream `reader` to clamd and classify the reply.
    ///
    /// Fails with `AdmissionRejected` before connecting when `declared_size`
    /// exceeds the scan limit. A source read error aborts without sending the
    /// terminator.
    pub async fn scan_stream(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        declared_size: u64,
    ) -> Result<ScanOutcome, ScanError> {
        if declared_size > self.max_scan_size {
            tracing::warn!(
                declared_size,
                max_size = self.max_scan_size,
                "Scan rejected: input exceeds size limit"
            );
            return Err(ScanError::AdmissionRejected {
                declared_size,
                max_size: self.max_scan_size,
            });
        }

        let start = Instant::now();
        tracing::debug!(address = %self.address, declared_size, "Starting ClamAV scan");

        let mut stream = self.connect().await?;
        let mut chunks_sent: u64 = 0;
        let mut bytes_sent: u64 = 0;

        self.deadline(stream.write_all(INSTREAM_COMMAND))
            .await
            .map_err(|source| ScanError::TransportError {
                stage: "sending command",
                chunks_sent,
                bytes_sent,
                source,
            })?;

        // Prefix and payload share one buffer so each chunk is a single write.
        let mut frame = vec![0u8; PREFIX_LEN + self.chunk_size];
        loop {
            let read = fill_chunk(reader, &mut frame[PREFIX_LEN..])
                .await
                .map_err(|source| {
                    tracing::error!(
                        error = %source,
                        chunks_sent,
                        bytes_sent,
                        "Source read failed mid-scan"
                    );
                    ScanError::SourceReadError {
                        chunks_sent,
                        bytes_sent,
                        source,
                    }
                })?;

            let Some(prefix) = chunk_prefix(read) else {
                break;
            };
            frame[..PREFIX_LEN].copy_from_slice(&prefix);

            self.deadline(stream.write_all(&frame[..PREFIX_LEN + read]))
                .await
                .map_err(|source| ScanError::TransportError {
                    stage: "sending chunk",
                    chunks_sent,
                    bytes_sent,
                    source,
                })?;

            chunks_sent += 1;
            bytes_sent += read as u64;
        }

        self.deadline(async {
            stream.write_all(&TERMINATOR).await?;
            stream.flush().await
        })
        .await
        .map_err(|source| ScanError::TransportError {
            stage: "sending terminator",
            chunks_sent,
            bytes_sent,
            source,
        })?;

        let mut raw = Vec::new();
        self.deadline(stream.read_to_end(&mut raw))
            .await
            .map_err(|source| ScanError::TransportError {
                stage: "reading response",
                chunks_sent,
                bytes_sent,
                source,
            })?;

        let response = reply_text(&raw);
        let outcome = match classify_reply(&response) {
            ClamdReply::Clean => ScanOutcome::clean(response),
            ClamdReply::Found { signature } => ScanOutcome::infected(signature, response),
            ClamdReply::Unrecognized => ScanOutcome::unrecognized(response),
        }
        .with_transfer(chunks_sent, bytes_sent);

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match (&outcome.signature, &outcome.error) {
            (_, Some(_)) => tracing::warn!(
                response = %outcome.response,
                chunks_sent,
                bytes_sent,
                duration_ms,
                "Unrecognized ClamAV response, treating as infected"
            ),
            (Some(signature), None) => tracing::warn!(
                virus = %signature,
                chunks_sent,
                bytes_sent,
                duration_ms,
                "File scan detected virus"
            ),
            (None, None) => tracing::info!(
                verdict = %outcome.verdict,
                chunks_sent,
                bytes_sent,
                duration_ms,
                "File scan completed"
            ),
        }

        Ok(outcome)
    }

    async fn connect(&self) -> Result<TcpStream, ScanError> {
        match tokio::time::timeout(self.dial_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => {
                tracing::error!(address = %self.address, error = %e, "ClamAV connection failed");
                Err(ScanError::ConnectionFailed {
                    address: self.address.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                tracing::error!(
                    address = %self.address,
                    timeout_secs = self.dial_timeout.as_secs_f64(),
                    "ClamAV connection timed out"
                );
                Err(ScanError::ConnectionFailed {
                    address: self.address.clone(),
                    reason: format!("dial timed out after {:?}", self.dial_timeout),
                })
            }
        }
    }

    async fn simple_command(&self, command: &'static [u8]) -> Result<String, ScanError> {
        let mut stream = self.connect().await?;
        self.deadline(stream.write_all(command))
            .await
            .map_err(|source| ScanError::TransportError {
                stage: "sending command",
                chunks_sent: 0,
                bytes_sent: 0,
                source,
            })?;

        let mut raw = Vec::new();
        self.deadline(stream.read_to_end(&mut raw))
            .await
            .map_err(|source| ScanError::TransportError {
                stage: "reading response",
                chunks_sent: 0,
                bytes_sent: 0,
                source,
            })?;

        Ok(reply_text(&raw))
    }

    async fn deadline<T, F>(&self, op: F) -> io::Result<T>
    where
        F: Future<Output = io::Result<T>>,
    {
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, op).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no progress within {:?}", limit),
                )
            })?,
            None => op.await,
        }
    }
}

#[async_trait]
impl MalwareScanner for ClamAVService {
    async fn scan_stream(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        declared_size: u64,
    ) -> Result<ScanOutcome, ScanError> {
        ClamAVService::scan_stream(self, reader, declared_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamav_constructors() {
        let svc = ClamAVService::new("localhost".to_string(), 3310);
        assert_eq!(svc.address(), "localhost:3310");
        assert_eq!(svc.chunk_size(), 32 * 1024);

        let svc = svc.with_chunk_size(0).with_max_scan_size(10);
        assert_eq!(svc.chunk_size(), 1);
        assert_eq!(svc.max_scan_size(), 10);
    }

    #[test]
    fn from_config_uses_byte_units() {
        let config = ClamAvConfig {
            host: "clamd".to_string(),
            port: 3311,
            dial_timeout_secs: 2,
            io_timeout_secs: 0,
            chunk_size_kb: 64,
            max_file_size_mb: 5,
        };
        let svc = ClamAVService::from_config(&config);
        assert_eq!(svc.address(), "clamd:3311");
        assert_eq!(svc.chunk_size(), 64 * 1024);
        assert_eq!(svc.max_scan_size(), 5 * 1024 * 1024);
    }
}
