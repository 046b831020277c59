//! Input/output helpers.
//!
//! - (volume, energy) table ingest (`ingest`)
//! - fitted curve JSON read/write (`curve`)

pub mod curve;
pub mod ingest;

pub use curve::*;
pub use ingest::*;
