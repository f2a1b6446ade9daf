//! Common types for Lattice provider reconciliation: errors, retry, configuration

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod retry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
