//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `forecast` - Score a section file and write the report
//! - `schema` - Field listing
//! - `serve` - Web server command

pub mod forecast;
pub mod schema;
pub mod serve;

// Re-export command functions for main.rs
pub use forecast::*;
pub use schema::*;
pub use serve::*;
