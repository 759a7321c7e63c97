//! Lab Curves Host - the narrow host interface the curves procedure runs against.
//!
//! This crate provides:
//! - The `Host` trait: typed stand-ins for the host's procedure database
//! - `MemoryHost`: a complete in-memory host with layers, named buffers,
//!   undo groups and TIFF file exchange
//! - Raster file codecs

pub mod codec;
pub mod error;
pub mod host;
pub mod memory;

pub use error::{HostError, HostResult};
pub use host::{Host, LayerPosition};
pub use memory::{HostStats, MemoryHost};
