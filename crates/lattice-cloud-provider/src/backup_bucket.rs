//! Backup bucket retention actuator
//!
//! One pass reads the bucket's retention state, asks the controller for the
//! next action and executes it. Transient failures rerun the whole pass, so
//! an abort-then-recreate that stopped after the abort resumes as a plain
//! create once the bucket reads back as `Absent`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use lattice_common::config::BackupBucketConfig;
use lattice_common::retry::retry_transient;
use lattice_common::Result;
use lattice_retention::{
    decide, execute, shrink_requested, BucketWormClient, RetentionAction, RetentionConfig,
    RetentionState,
};

use crate::ActuatorConfig;

/// Result of one successful retention pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketOutcome {
    /// Action taken
    pub action: RetentionAction,
    /// Retention state read at the start of the pass
    pub observed: RetentionState,
    /// A shorter period was requested for a locked policy and ignored
    pub shrink_ignored: bool,
    /// Immutability was dropped from the config but the policy is locked
    pub unlock_ignored: bool,
    /// Policy the bucket has after the pass, if any
    pub policy_id: Option<String>,
    /// RFC 3339 timestamp of the pass
    pub last_reconciled: String,
}

impl BucketOutcome {
    /// Human-readable note for status reporting, if the request was not
    /// fully honored
    pub fn message(&self) -> Option<String> {
        if self.shrink_ignored {
            Some("retention period of a locked policy cannot be decreased".to_string())
        } else if self.unlock_ignored {
            Some("locked retention policy cannot be removed".to_string())
        } else {
            None
        }
    }
}

/// Reconciles backup bucket retention policies
pub struct BackupBucketActuator<C: ?Sized> {
    client: Arc<C>,
    config: ActuatorConfig,
}

impl<C> BackupBucketActuator<C>
where
    C: BucketWormClient + ?Sized,
{
    /// Create an actuator over a provider client
    pub fn new(client: Arc<C>, config: ActuatorConfig) -> Self {
        Self { client, config }
    }

    /// Bring the bucket's retention policy one step closer to the config
    ///
    /// Most transitions need a single pass. A bucket whose desired period
    /// grows past a policy that is still being locked takes two: lock, then
    /// extend on the next pass.
    pub async fn reconcile(
        &self,
        bucket: &str,
        config: &BackupBucketConfig,
    ) -> Result<BucketOutcome> {
        info!(bucket = %bucket, "Reconciling backup bucket retention");

        let desired = RetentionConfig::from_bucket(bucket, config).inspect_err(|e| {
            warn!(bucket = %bucket, error = %e, "Invalid immutability configuration");
        })?;

        retry_transient(&self.config.retry, "reconcile bucket retention", || {
            self.pass(bucket, desired.as_ref())
        })
        .await
        .inspect_err(|e| {
            warn!(bucket = %bucket, error = %e, "Retention reconciliation failed");
        })
    }

    async fn pass(
        &self,
        bucket: &str,
        desired: Option<&RetentionConfig>,
    ) -> Result<BucketOutcome> {
        let observed = self.client.get_retention_state(bucket).await?;
        let action = decide(desired, &observed);

        let shrink_ignored = shrink_requested(desired, &observed);
        if shrink_ignored {
            warn!(
                bucket = %bucket,
                observed = %observed,
                "Ignoring request to shorten a locked retention policy"
            );
        }
        let unlock_ignored = desired.is_none() && matches!(observed, RetentionState::Locked(_));
        if unlock_ignored {
            warn!(
                bucket = %bucket,
                observed = %observed,
                "Immutability removed from config but the retention policy is locked"
            );
        }

        let policy_id = if action.is_noop() {
            debug!(bucket = %bucket, observed = %observed, "Retention policy up to date");
            observed.policy().map(|p| p.policy_id.clone())
        } else {
            info!(
                bucket = %bucket,
                observed = %observed,
                action = %action,
                steps = ?action.steps(),
                "Applying retention action"
            );
            execute(self.client.as_ref(), bucket, &action).await?
        };

        Ok(BucketOutcome {
            action,
            observed,
            shrink_ignored,
            unlock_ignored,
            policy_id,
            last_reconciled: chrono::Utc::now().to_rfc3339(),
        })
    }
}
