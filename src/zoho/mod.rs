//! Zoho Notebook import module
//!
//! Handles `.znel` note files and the `meta.json` that names each notebook.

mod import;

pub use import::*;
