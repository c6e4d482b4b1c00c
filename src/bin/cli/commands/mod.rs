pub mod import;
pub mod providers;
