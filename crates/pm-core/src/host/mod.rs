//! Host automation seam
//!
//! The macro reaches the CAD host only through the traits in this module.
//! `MemoryHost` implements them without any external process.

pub mod memory;
mod traits;

pub use memory::{
    DocumentError, Faults, MemoryDocument, MemoryHost, MemorySketch, SketchDimension,
};
pub use traits::*;
