//! Length-prefixed streaming source
//!
//! The producer rewrites one shared file in place: a little-endian `i32`
//! payload length at offset 0, followed by the JSON-encoded frame. The file is
//! reopened on every poll so a producer restart (or a file that does not exist
//! yet) never leaves the reader holding a stale handle.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::provider::FrameSource;
use crate::types::TelemetryFrame;
use crate::{Result, TelemetryError};

/// Outcome of one read attempt against the channel file.
#[derive(Debug, PartialEq)]
enum ChannelRead {
    Payload(Vec<u8>),
    BadLength(i64),
    Short,
}

pub struct StreamSource {
    path: PathBuf,
    max_frame_len: usize,
    rejected: u64,
}

impl StreamSource {
    pub fn new(path: impl Into<PathBuf>, max_frame_len: usize) -> Self {
        Self { path: path.into(), max_frame_len, rejected: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames discarded so far (bad length, short write or undecodable payload).
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    fn open(&self) -> Result<File> {
        // Read+write so opening succeeds while the producer holds the file for writing.
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .or_else(|_| File::open(&self.path))
            .map_err(|e| TelemetryError::from_channel_io(&self.path, e))
    }

    fn read_payload(&self, file: &mut File) -> Result<ChannelRead> {
        let mut prefix = [0u8; 4];
        if !read_full(file, &mut prefix).map_err(|e| TelemetryError::from_channel_io(&self.path, e))? {
            return Ok(ChannelRead::Short);
        }

        let declared = i32::from_le_bytes(prefix);
        if declared <= 0 || declared as usize > self.max_frame_len {
            return Ok(ChannelRead::BadLength(i64::from(declared)));
        }

        let mut payload = vec![0u8; declared as usize];
        if !read_full(file, &mut payload).map_err(|e| TelemetryError::from_channel_io(&self.path, e))? {
            return Ok(ChannelRead::Short);
        }
        Ok(ChannelRead::Payload(payload))
    }
}

/// Fill `buf` completely; `Ok(false)` when the file ends first.
fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<bool> {
    match file.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl FrameSource for StreamSource {
    async fn poll(&mut self) -> Result<Option<TelemetryFrame>> {
        let mut file = self.open()?;

        let payload = match self.read_payload(&mut file)? {
            ChannelRead::Payload(payload) => payload,
            ChannelRead::BadLength(declared) => {
                self.rejected += 1;
                trace!(declared, max = self.max_frame_len, "Rejected frame length");
                return Ok(None);
            }
            ChannelRead::Short => {
                self.rejected += 1;
                trace!("Short read, producer mid-write");
                return Ok(None);
            }
        };

        match TelemetryFrame::from_json(&payload) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                self.rejected += 1;
                debug!(bytes = payload.len(), error = %e, "Discarding undecodable payload");
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        format!("stream:{}", self.path.display())
    }
}

/// Write one frame the way the producer does. Used by tests and local replays.
pub fn write_frame(path: &Path, frame: &TelemetryFrame) -> Result<()> {
    let payload = frame.to_json()?;
    let len = i32::try_from(payload.len())
        .map_err(|_| TelemetryError::parse("Frame payload", format!("{} bytes exceeds i32", payload.len())))?;
    let mut bytes = Vec::with_capacity(payload.len() + 4);
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(&payload);
    std::fs::write(path, bytes).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))
}
