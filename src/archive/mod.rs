//! Save archive unpacking
//!
//! The game persists its state as an Unreal save whose tail is a zlib block
//! holding three SQLite databases. [`format`] parses that container;
//! [`ArchiveUnpacker`] extracts it to disk at most once per source change.

pub mod format;
mod unpacker;

pub use format::{ContainerHeader, Segment, SegmentKind};
pub use unpacker::{ArchiveContents, ArchiveUnpacker, HEADER_CHUNK_NAME, UnpackOutcome};
