//! clamd wire format.
//!
//! Commands use the NUL-terminated `z` form. `INSTREAM` data is sent as
//! chunks of `[u32 big-endian length][payload]`; a zero length ends the stream.
//! Replies are text terminated by the daemon closing the connection.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

pub const INSTREAM_COMMAND: &[u8] = b"zINSTREAM\0";
pub const PING_COMMAND: &[u8] = b"zPING\0";
pub const VERSION_COMMAND: &[u8] = b"zVERSION\0";

/// Zero-length chunk marking end of input.
pub const TERMINATOR: [u8; 4] = [0; 4];

/// Size of the length prefix in front of every chunk.
pub const PREFIX_LEN: usize = 4;

/// Classified daemon reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClamdReply {
    Clean,
    Found { signature: Option<String> },
    Unrecognized,
}

/// Length prefix for a data chunk. Returns `None` for lengths that cannot be
/// framed: zero is reserved for the terminator.
pub fn chunk_prefix(len: usize) -> Option<[u8; PREFIX_LEN]> {
    match u32::try_from(len) {
        Ok(0) | Err(_) => None,
        Ok(len) => Some(len.to_be_bytes()),
    }
}

/// Read from `reader` until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes read; 0 means end of stream. Short reads from
/// slow sources are merged so every chunk but the last is full sized.
pub async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reply text with NUL terminators and surrounding whitespace removed.
pub fn reply_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Classify an `INSTREAM` reply.
///
/// `FOUND` wins over `OK` so a signature name containing "OK" is never read
/// as clean.
pub fn classify_reply(text: &str) -> ClamdReply {
    if text.contains("FOUND") {
        ClamdReply::Found {
            signature: parse_signature(text),
        }
    } else if text.contains("OK") {
        ClamdReply::Clean
    } else {
        ClamdReply::Unrecognized
    }
}

/// `stream: Eicar-Test-Signature FOUND` -> `Eicar-Test-Signature`
fn parse_signature(text: &str) -> Option<String> {
    let line = text.lines().find(|line| line.contains("FOUND"))?;
    let before = line.trim_end().strip_suffix("FOUND")?.trim_end();
    let name = match before.split_once(": ") {
        Some((_, name)) => name,
        None => before,
    };
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
