//! pace.observation.v1 schema
//!
//! This module defines the record format used to feed logged symptoms, activities and
//! physiological samples to the engine from files, pipes or the FFI boundary.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
