//! Test helpers
//!
//! In-memory storage for isolated tests of code that talks to a backend.

pub mod memory;

pub use memory::*;
