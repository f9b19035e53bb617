//! Display model implementations for table and JSON output
//!
//! Display models transform cached records into CLI-friendly formats
//! with appropriate column names and serialization.

mod cache;
mod resource;

pub use cache::CacheEntryDisplay;
pub use resource::ResourceDisplay;
