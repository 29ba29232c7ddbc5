//! Configuration for the framelog viewer
//!
//! Provides types, discovery and parsing for `framelog.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
