//! # bookmend common library
//!
//! Shared foundation for the bookmend service:
//! - Database initialization and schema
//! - Settings loading (TOML) and path resolution
//! - Common error types
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
