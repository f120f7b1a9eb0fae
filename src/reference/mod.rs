//! Reference data resolved from the game save
//!
//! [`ReferenceCache`] drives the [`ArchiveUnpacker`](crate::archive::ArchiveUnpacker),
//! runs a fixed query battery against the extracted main database and keeps the
//! result as one immutable [`ReferenceData`] value. Joins (driver to team to
//! colour) run in process over the cached rows.

mod cache;
mod data;
pub mod names;
mod query;

pub use cache::ReferenceCache;
pub use data::{
    DriverName, DriverRow, FALLBACK_COLOUR, ReferenceData, ReferenceKey, ReferenceView, TeamRow, TyreSetRow,
    UNKNOWN,
};
pub use query::{load_from_connection, load_reference_data};
