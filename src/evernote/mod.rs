//! Evernote import module
//!
//! Handles Evernote .enex export files:
//! - Note content (ENML converted to HTML)
//! - Tags
//! - Resources embedded as base64, linked from `<en-media>` by MD5
//! - Created/updated timestamps

mod enex;
mod import;

pub use enex::*;
pub use import::*;
