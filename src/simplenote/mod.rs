//! Simplenote import module
//!
//! Handles the `notes.json` document of a Simplenote export.

mod import;

pub use import::*;
