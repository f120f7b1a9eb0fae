//! Rate-gated, change-detecting save unpacker

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::format::{ContainerHeader, Segment, SegmentKind, parse_container};
use crate::{Result, TelemetryError};

/// File name of the verbatim header chunk in the output directory.
pub const HEADER_CHUNK_NAME: &str = "chunk1";

/// Extracted save contents, shared between the unpacker and its callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveContents {
    pub header: ContainerHeader,
    pub header_chunk: Vec<u8>,
    pub segments: Vec<Segment>,
    /// SHA-256 of the source file
    pub digest: [u8; 32],
}

impl ArchiveContents {
    pub fn segment(&self, kind: SegmentKind) -> Option<&[u8]> {
        self.segments.iter().find(|segment| segment.kind == kind).map(|segment| segment.data.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackOutcome {
    /// Source untouched (or checked too recently); previous extraction stands
    Unchanged(Arc<ArchiveContents>),
    /// A new extraction was written to disk
    Extracted(Arc<ArchiveContents>),
    /// Checked too recently and nothing has been extracted yet
    Deferred,
}

impl UnpackOutcome {
    pub fn contents(&self) -> Option<&Arc<ArchiveContents>> {
        match self {
            UnpackOutcome::Unchanged(contents) | UnpackOutcome::Extracted(contents) => Some(contents),
            UnpackOutcome::Deferred => None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, UnpackOutcome::Extracted(_))
    }
}

#[derive(Default)]
struct UnpackState {
    last_check: Option<Instant>,
    contents: Option<Arc<ArchiveContents>>,
    extractions: u64,
}

/// Unpacks one save file into an output directory.
///
/// Calls are serialized. Within `recheck_interval` of the last check (successful
/// or not) the cached contents are returned without touching the disk; after that the source is
/// hashed and only re-extracted when the digest changed.
pub struct ArchiveUnpacker {
    source: PathBuf,
    output_dir: PathBuf,
    recheck_interval: Duration,
    state: Mutex<UnpackState>,
}

impl ArchiveUnpacker {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, recheck_interval: Duration) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            recheck_interval,
            state: Mutex::new(UnpackState::default()),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn recheck_interval(&self) -> Duration {
        self.recheck_interval
    }

    pub fn segment_path(&self, kind: SegmentKind) -> PathBuf {
        self.output_dir.join(kind.file_name())
    }

    /// Number of full extractions performed so far.
    pub fn extractions(&self) -> u64 {
        self.state.lock().extractions
    }

    pub fn unpack(&self) -> Result<UnpackOutcome> {
        let mut state = self.state.lock();

        if state.last_check.is_some_and(|checked| checked.elapsed() < self.recheck_interval) {
            trace!("Save checked recently");
            return Ok(match &state.contents {
                Some(contents) => UnpackOutcome::Unchanged(Arc::clone(contents)),
                None => UnpackOutcome::Deferred,
            });
        }

        state.last_check = Some(Instant::now());
        let bytes = std::fs::read(&self.source).map_err(|e| TelemetryError::file_error(self.source.clone(), e))?;

        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        if let Some(contents) = &state.contents
            && contents.digest == digest
        {
            trace!("Save digest unchanged");
            return Ok(UnpackOutcome::Unchanged(Arc::clone(contents)));
        }

        debug!(path = %self.source.display(), bytes = bytes.len(), "Save changed, extracting");
        let parsed = parse_container(&bytes)?;
        let contents = Arc::new(ArchiveContents {
            header: parsed.header,
            header_chunk: parsed.header_chunk,
            segments: parsed.segments,
            digest,
        });

        self.write_outputs(&contents)?;

        state.extractions += 1;
        state.contents = Some(Arc::clone(&contents));
        info!(
            segments = contents.segments.len(),
            output = %self.output_dir.display(),
            "Save unpacked"
        );
        Ok(UnpackOutcome::Extracted(contents))
    }

    fn write_outputs(&self, contents: &ArchiveContents) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| TelemetryError::file_error(self.output_dir.clone(), e))?;

        let chunk_path = self.output_dir.join(HEADER_CHUNK_NAME);
        std::fs::write(&chunk_path, &contents.header_chunk).map_err(|e| TelemetryError::file_error(chunk_path, e))?;

        for segment in &contents.segments {
            let path = self.segment_path(segment.kind);
            std::fs::write(&path, &segment.data).map_err(|e| TelemetryError::file_error(path, e))?;
        }
        Ok(())
    }
}
