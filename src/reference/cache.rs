//! Process-wide reference cache with atomic refresh

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::data::{ReferenceData, ReferenceKey};
use super::query::load_reference_data;
use crate::archive::{ArchiveUnpacker, SegmentKind, UnpackOutcome};
use crate::config::ArchiveConfig;
use crate::{Result, TelemetryError};

/// Memoized reference data over an [`ArchiveUnpacker`].
///
/// Readers always see either the previous complete [`ReferenceData`] or the
/// next one; a failed refresh leaves the current set in place.
pub struct ReferenceCache {
    unpacker: Option<ArchiveUnpacker>,
    data: RwLock<Option<Arc<ReferenceData>>>,
    /// Digest of the archive the last load was attempted for
    loaded_digest: Mutex<Option<[u8; 32]>>,
}

impl ReferenceCache {
    pub fn new(unpacker: ArchiveUnpacker) -> Self {
        Self { unpacker: Some(unpacker), data: RwLock::new(None), loaded_digest: Mutex::new(None) }
    }

    /// A cache with no save behind it; every lookup falls back.
    pub fn disabled() -> Self {
        Self { unpacker: None, data: RwLock::new(None), loaded_digest: Mutex::new(None) }
    }

    /// A fixed cache, never refreshed.
    pub fn with_data(data: ReferenceData) -> Self {
        Self { unpacker: None, data: RwLock::new(Some(Arc::new(data))), loaded_digest: Mutex::new(None) }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        match (&config.save_path, config.resolved_output_dir()) {
            (Some(save), Some(output)) => {
                debug!(save = %save.display(), output = %output.display(), "Reference cache enabled");
                Self::new(ArchiveUnpacker::new(save, output, config.recheck_interval()))
            }
            _ => {
                info!("No save path configured, reference data disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.unpacker.is_some()
    }

    /// How often the save is worth re-checking, `None` when there is no save.
    pub fn recheck_interval(&self) -> Option<Duration> {
        self.unpacker.as_ref().map(ArchiveUnpacker::recheck_interval)
    }

    /// Unpack (rate-gated) and reload when the save changed.
    ///
    /// Blocking: reads, hashes and inflates the save and queries SQLite. Async
    /// callers go through [`tokio::task::spawn_blocking`].
    ///
    /// Returns whether a new data set was swapped in.
    pub fn refresh(&self) -> Result<bool> {
        let Some(unpacker) = &self.unpacker else {
            return Ok(false);
        };

        let outcome = unpacker.unpack()?;
        let contents = match &outcome {
            UnpackOutcome::Deferred => return Ok(false),
            UnpackOutcome::Unchanged(contents) | UnpackOutcome::Extracted(contents) => contents,
        };

        let mut loaded = self.loaded_digest.lock();
        if *loaded == Some(contents.digest) {
            return Ok(false);
        }
        // Recorded before loading so a broken database is not re-queried every frame.
        *loaded = Some(contents.digest);

        if contents.segment(SegmentKind::Main).is_none() {
            warn!("Save has no main database segment");
            return Ok(false);
        }

        let data = load_reference_data(&unpacker.segment_path(SegmentKind::Main))?;
        info!(drivers = data.drivers.len(), teams = data.teams.len(), "Reference data refreshed");
        *self.data.write() = Some(Arc::new(data));
        Ok(true)
    }

    /// Current full data set, if any refresh has succeeded.
    pub fn snapshot(&self) -> Option<Arc<ReferenceData>> {
        self.data.read().clone()
    }

    pub fn get(&self, key: ReferenceKey) -> Result<i64> {
        self.snapshot()
            .and_then(|data| data.scalar(key))
            .ok_or_else(|| TelemetryError::missing_key(key.name()))
    }

    /// Lookup by the key's stable name.
    pub fn get_named(&self, key: &str) -> Result<i64> {
        self.get(key.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_save_archive;

    fn cache_for(dir: &std::path::Path, interval: Duration) -> ReferenceCache {
        ReferenceCache::new(ArchiveUnpacker::new(dir.join("autosave.sav"), dir.join("Unpacked"), interval))
    }

    #[test]
    fn refresh_loads_and_swaps() {
        let _ = tracing_subscriber::fmt::try_init();
        let dir = tempfile::tempdir().expect("tempdir");
        write_save_archive(&dir.path().join("autosave.sav"), 2024).expect("save");

        let cache = cache_for(dir.path(), Duration::ZERO);
        assert!(matches!(cache.get(ReferenceKey::PointScheme), Err(TelemetryError::MissingKey { .. })));

        assert!(cache.refresh().expect("refresh"));
        assert_eq!(cache.get(ReferenceKey::CurrentSeason).expect("season"), 2024);
        assert_eq!(cache.get_named("PointScheme").expect("scheme"), 1);

        // Same bytes: no reload.
        assert!(!cache.refresh().expect("second refresh"));
    }

    #[test]
    fn corrupt_save_keeps_previous_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let save = dir.path().join("autosave.sav");
        write_save_archive(&save, 2024).expect("save");

        let cache = cache_for(dir.path(), Duration::ZERO);
        cache.refresh().expect("refresh");
        let before = cache.snapshot().expect("data");

        std::fs::write(&save, b"not a save").expect("corrupt");
        assert!(cache.refresh().is_err());
        let after = cache.snapshot().expect("data survives");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn changed_save_swaps_whole_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let save = dir.path().join("autosave.sav");
        write_save_archive(&save, 2024).expect("save");

        let cache = cache_for(dir.path(), Duration::ZERO);
        cache.refresh().expect("refresh");
        write_save_archive(&save, 2025).expect("new season");
        assert!(cache.refresh().expect("refresh"));
        assert_eq!(cache.get(ReferenceKey::CurrentSeason).expect("season"), 2025);
    }

    #[test]
    fn disabled_and_fixed_caches() {
        let disabled = ReferenceCache::disabled();
        assert!(!disabled.is_enabled());
        assert_eq!(disabled.recheck_interval(), None);
        assert!(!disabled.refresh().expect("noop"));
        assert!(disabled.snapshot().is_none());

        let mut data = ReferenceData::default();
        data.scalars.insert(ReferenceKey::PoleBonus, 1);
        let fixed = ReferenceCache::with_data(data);
        assert_eq!(fixed.get(ReferenceKey::PoleBonus).expect("pole"), 1);
        assert!(matches!(fixed.get_named("Bogus"), Err(TelemetryError::MissingKey { .. })));
    }
}
