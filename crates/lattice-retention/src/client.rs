//! Bucket WORM capability consumed by the retention controller

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use lattice_common::Error;

use crate::state::RetentionState;

/// Retention policy operations on one provider bucket
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BucketWormClient: Send + Sync {
    /// Read the bucket's retention state
    ///
    /// Adapters map the provider's "no such policy" answer to
    /// [`RetentionState::Absent`] instead of an error.
    async fn get_retention_state(&self, bucket: &str) -> Result<RetentionState, Error>;

    /// Create an unlocked policy and return its id
    async fn create_retention_policy(
        &self,
        bucket: &str,
        retention_period_days: u32,
    ) -> Result<String, Error>;

    /// Lock a policy. Irreversible.
    async fn lock_retention_policy(&self, bucket: &str, policy_id: &str) -> Result<(), Error>;

    /// Extend a locked policy to a longer period
    async fn extend_retention_policy(
        &self,
        bucket: &str,
        retention_period_days: u32,
        policy_id: &str,
    ) -> Result<(), Error>;

    /// Remove an unlocked or expired policy
    async fn abort_retention_policy(&self, bucket: &str) -> Result<(), Error>;
}
