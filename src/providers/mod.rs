//! Frame source implementations
//!
//! - [`StreamSource`]: length-prefixed JSON frames in a shared file
//! - [`RegionSource`]: packed raw record in a memory-mapped file
//! - `NamedRegionSource`: packed raw record in a named mapping (Windows)

pub mod region;
pub mod stream;

#[cfg(windows)]
pub use region::NamedRegionSource;
pub use region::RegionSource;
pub use stream::StreamSource;

use crate::config::SourceConfig;
use crate::provider::FrameSource;
use crate::Result;

/// Build the frame source described by `config`.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    match config {
        SourceConfig::Stream { path, max_frame_len } => Ok(Box::new(StreamSource::new(path, *max_frame_len))),
        SourceConfig::Region { path } => Ok(Box::new(RegionSource::new(path))),
        #[cfg(windows)]
        SourceConfig::NamedRegion { name } => Ok(Box::new(NamedRegionSource::new(name.clone()))),
        #[cfg(not(windows))]
        SourceConfig::NamedRegion { .. } => {
            Err(crate::TelemetryError::unsupported_platform("Named shared-memory regions", "Windows"))
        }
    }
}
