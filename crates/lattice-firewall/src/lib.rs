//! Security group rule reconciliation for Lattice bastions
//!
//! - **rule**: normalized rule model and structural equality
//! - **reconciler**: symmetric-difference diff and add-before-remove apply
//! - **client**: the provider capability the reconciler drives
//! - **bastion**: desired rule sets derived from a bastion's configuration
//!
//! This crate never logs, retries or swallows errors. Callers own the
//! control loop.

#![deny(missing_docs)]

pub mod bastion;
pub mod client;
pub mod reconciler;
pub mod rule;

pub use client::SecurityGroupClient;
pub use reconciler::{
    apply, reconcile, reconcile_target, ApplySummary, Ownership, RuleDiff, RuleTarget,
};
pub use rule::{rules_equal, Direction, ObservedRule, Peer, PortRange, Protocol, RawRule, Rule};
