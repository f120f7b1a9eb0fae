//! Named shared-memory access (Windows only)
//!
//! The producer can publish the packed telemetry record through a named file
//! mapping instead of a file on disk. [`SharedRegion`] opens that mapping
//! read-only; the region frame source copies out of it every poll.

mod region;

pub use region::SharedRegion;
