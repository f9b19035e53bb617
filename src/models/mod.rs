//! Display models for CLI output
//!
//! Converts cached records and store summaries into CLI-friendly rows.

pub mod display;

pub use display::{CacheEntryDisplay, ResourceDisplay};
