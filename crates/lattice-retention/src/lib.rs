//! Retention lock (WORM) lifecycle for Lattice backup buckets
//!
//! - **state**: validated desired config and the closed observed-state enum
//! - **controller**: the transition function and ordered action execution
//! - **client**: the provider capability the controller drives
//!
//! Locked policies are irreversible on the provider side. Nothing in this
//! crate ever asks for a lock to be removed or a locked period to shrink.

#![deny(missing_docs)]

pub mod client;
pub mod controller;
pub mod state;

pub use client::BucketWormClient;
pub use controller::{decide, execute, shrink_requested, RetentionAction, Step};
pub use state::{
    RawWormConfiguration, RetentionConfig, RetentionPolicy, RetentionState,
    MAX_RETENTION_PERIOD_DAYS,
};
