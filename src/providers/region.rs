//! Fixed-layout region sources
//!
//! The producer writes the packed record wholesale into a shared region. On
//! every poll the region is copied twice and the copies compared; a mismatch
//! means a write landed mid-copy and the tick is skipped.

use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::provider::FrameSource;
use crate::types::{TelemetryFrame, layout};
use crate::{Result, TelemetryError};

/// Copy `region` twice and return the copy only when both agree.
pub(crate) fn consistent_snapshot(region: &[u8]) -> Option<Vec<u8>> {
    let record = region.get(..layout::FRAME_SIZE)?;
    for attempt in 0..2 {
        let first = record.to_vec();
        let second = record.to_vec();
        if first == second {
            return Some(first);
        }
        trace!(attempt = attempt + 1, "Region changed during copy");
    }
    None
}

/// Decode a consistent snapshot, dropping records without a known sentinel.
pub(crate) fn decode_snapshot(snapshot: &[u8]) -> Result<Option<TelemetryFrame>> {
    let frame = layout::decode(snapshot)?;
    if !frame.has_valid_sentinel() {
        trace!(sentinel = frame.sentinel, "Region sentinel not recognised");
        return Ok(None);
    }
    Ok(Some(frame))
}

/// Consecutive unrecognised records after which the file is mapped afresh.
const REMAP_AFTER_STALE_POLLS: u32 = 120;

/// What a mapping was made from. A change means the producer replaced or
/// resized the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    len: u64,
    #[cfg(unix)]
    inode: (u64, u64),
    #[cfg(not(unix))]
    created: Option<std::time::SystemTime>,
}

impl FileIdentity {
    fn of(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self { len: metadata.len(), inode: (metadata.dev(), metadata.ino()) }
        }
        #[cfg(not(unix))]
        {
            Self { len: metadata.len(), created: metadata.created().ok() }
        }
    }
}

/// File-backed region, memory-mapped read-only.
///
/// The file is stat'ed on every poll. It is remapped when its identity
/// changes or when it keeps serving unrecognised records, and a file shorter
/// than one record is never read through the old mapping.
pub struct RegionSource {
    path: PathBuf,
    map: Option<(FileIdentity, Mmap)>,
    stale_polls: u32,
}

impl RegionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), map: None, stale_polls: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mapping(&mut self) -> Result<Option<&Mmap>> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| TelemetryError::from_channel_io(&self.path, e))?;
        let identity = FileIdentity::of(&metadata);

        if identity.len < layout::FRAME_SIZE as u64 {
            if self.map.take().is_some() {
                debug!(len = identity.len, "Region shrank below one record, unmapped");
            }
            trace!(len = identity.len, "Region smaller than one record");
            return Ok(None);
        }

        if self.map.as_ref().is_some_and(|(mapped, _)| *mapped != identity) {
            debug!(path = %self.path.display(), "Region file replaced, remapping");
            self.map = None;
        }

        if self.map.is_none() {
            let file = File::open(&self.path).map_err(|e| TelemetryError::from_channel_io(&self.path, e))?;
            // SAFETY: the mapping is only ever copied out of; a concurrent writer can
            // tear a copy, which the double-read check rejects.
            let map = unsafe { Mmap::map(&file) }.map_err(|e| TelemetryError::from_channel_io(&self.path, e))?;
            if map.len() < layout::FRAME_SIZE {
                trace!(len = map.len(), "Region smaller than one record");
                return Ok(None);
            }
            debug!(path = %self.path.display(), len = map.len(), "Mapped telemetry region");
            self.stale_polls = 0;
            self.map = Some((identity, map));
        }
        Ok(self.map.as_ref().map(|(_, map)| map))
    }
}

#[async_trait::async_trait]
impl FrameSource for RegionSource {
    async fn poll(&mut self) -> Result<Option<TelemetryFrame>> {
        let Some(map) = self.mapping()? else {
            return Ok(None);
        };
        let Some(snapshot) = consistent_snapshot(map) else {
            return Ok(None);
        };

        let frame = decode_snapshot(&snapshot)?;
        if frame.is_some() {
            self.stale_polls = 0;
        } else {
            self.stale_polls += 1;
            if self.stale_polls >= REMAP_AFTER_STALE_POLLS {
                debug!(polls = self.stale_polls, "Region keeps serving unrecognised records, remapping");
                self.map = None;
                self.stale_polls = 0;
            }
        }
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("region:{}", self.path.display())
    }
}

/// Named shared-memory mapping.
#[cfg(windows)]
pub struct NamedRegionSource {
    name: String,
    region: Option<crate::windows::SharedRegion>,
}

#[cfg(windows)]
impl NamedRegionSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), region: None }
    }
}

#[cfg(windows)]
#[async_trait::async_trait]
impl FrameSource for NamedRegionSource {
    async fn poll(&mut self) -> Result<Option<TelemetryFrame>> {
        if self.region.is_none() {
            self.region = Some(crate::windows::SharedRegion::open(&self.name, layout::FRAME_SIZE)?);
        }
        let Some(region) = self.region.as_ref() else {
            return Ok(None);
        };
        let Some(snapshot) = consistent_snapshot(region.bytes()) else {
            return Ok(None);
        };
        decode_snapshot(&snapshot)
    }

    fn describe(&self) -> String {
        format!("named-region:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SENTINEL_EPIC;

    #[tokio::test]
    async fn reads_packed_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region");
        let mut frame = TelemetryFrame { sentinel: SENTINEL_EPIC, ..Default::default() };
        frame.competitors[0].speed = 312;
        std::fs::write(&path, layout::encode(&frame)).expect("write");

        let mut source = RegionSource::new(&path);
        assert_eq!(source.poll().await.expect("poll"), Some(frame));
    }

    #[tokio::test]
    async fn zeroed_region_is_no_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region");
        std::fs::write(&path, vec![0u8; layout::FRAME_SIZE]).expect("write");

        let mut source = RegionSource::new(&path);
        assert_eq!(source.poll().await.expect("poll"), None);
    }

    #[tokio::test]
    async fn undersized_region_is_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region");
        std::fs::write(&path, vec![0u8; 16]).expect("write");

        let mut source = RegionSource::new(&path);
        assert_eq!(source.poll().await.expect("poll"), None);

        let frame = TelemetryFrame { sentinel: SENTINEL_EPIC, ..Default::default() };
        std::fs::write(&path, layout::encode(&frame)).expect("write");
        assert_eq!(source.poll().await.expect("poll"), Some(frame));
    }

    #[tokio::test]
    async fn replaced_file_is_remapped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region");
        let mut frame = TelemetryFrame { sentinel: SENTINEL_EPIC, ..Default::default() };
        frame.competitors[0].speed = 280;
        std::fs::write(&path, layout::encode(&frame)).expect("write");

        let mut source = RegionSource::new(&path);
        assert_eq!(source.poll().await.expect("poll").map(|f| f.competitors[0].speed), Some(280));

        // The producer restarts and publishes through a fresh file.
        frame.competitors[0].speed = 301;
        let staged = dir.path().join("region.new");
        std::fs::write(&staged, layout::encode(&frame)).expect("write");
        std::fs::rename(&staged, &path).expect("rename");

        assert_eq!(source.poll().await.expect("poll").map(|f| f.competitors[0].speed), Some(301));
    }

    #[tokio::test]
    async fn truncated_file_is_not_read_through_old_mapping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region");
        let frame = TelemetryFrame { sentinel: SENTINEL_EPIC, ..Default::default() };
        std::fs::write(&path, layout::encode(&frame)).expect("write");

        let mut source = RegionSource::new(&path);
        assert!(source.poll().await.expect("poll").is_some());

        std::fs::OpenOptions::new().write(true).open(&path).expect("open").set_len(16).expect("truncate");
        assert_eq!(source.poll().await.expect("poll"), None);
        assert!(source.map.is_none());
    }

    #[tokio::test]
    async fn stale_records_force_a_remap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region");
        std::fs::write(&path, vec![0u8; layout::FRAME_SIZE]).expect("write");

        let mut source = RegionSource::new(&path);
        for _ in 0..REMAP_AFTER_STALE_POLLS - 1 {
            assert_eq!(source.poll().await.expect("poll"), None);
        }
        assert!(source.map.is_some());
        assert_eq!(source.poll().await.expect("poll"), None);
        assert!(source.map.is_none());
    }

    #[tokio::test]
    async fn missing_region_backs_off() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut source = RegionSource::new(dir.path().join("absent"));
        assert!(matches!(source.poll().await, Err(TelemetryError::ChannelMissing { .. })));
    }

    #[test]
    fn snapshot_requires_full_record() {
        assert_eq!(consistent_snapshot(&[0u8; 10]), None);
        let region = vec![7u8; layout::FRAME_SIZE + 100];
        assert_eq!(consistent_snapshot(&region).map(|s| s.len()), Some(layout::FRAME_SIZE));
    }
}
