//! Joplin import module
//!
//! Handles Joplin RAW exports and the contents of JEX archives: notes,
//! notebooks (folders), tags and resources.

mod import;
mod item;

pub use import::*;
pub use item::*;
