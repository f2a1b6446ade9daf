//! Security group capability consumed by the reconciler
//!
//! Implemented by cloud-specific adapters. The reconciler only ever talks to
//! the provider through this trait, which lets tests substitute mocks.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use lattice_common::Error;

use crate::rule::{Direction, ObservedRule, Rule};

/// Rule operations on one provider security group
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecurityGroupClient: Send + Sync {
    /// List the rules currently installed for a direction
    ///
    /// Adapters handle pagination and normalize each entry with
    /// [`ObservedRule::from_raw`].
    async fn list_rules(
        &self,
        group_id: &str,
        direction: Direction,
    ) -> Result<Vec<ObservedRule>, Error>;

    /// Install a rule
    async fn add_rule(&self, group_id: &str, direction: Direction, rule: &Rule)
        -> Result<(), Error>;

    /// Revoke a previously observed rule
    async fn remove_rule(
        &self,
        group_id: &str,
        direction: Direction,
        rule: &ObservedRule,
    ) -> Result<(), Error>;
}
