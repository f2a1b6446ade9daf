//! Cloud provider actuators for Lattice
//!
//! The actuators are the control loop around the reconciliation core:
//!
//! - **bastion**: keeps a bastion's security group rules in line with its
//!   configured ingress
//! - **backup_bucket**: walks a backup bucket's retention policy through its
//!   lifecycle
//!
//! They own logging and retries. Neither keeps state between calls; callers
//! must not run two passes for the same security group or bucket at once.

#![deny(missing_docs)]

pub mod backup_bucket;
pub mod bastion;

use lattice_common::retry::RetryConfig;

pub use backup_bucket::{BackupBucketActuator, BucketOutcome};
pub use bastion::{BastionActuator, BastionOutcome, BastionRequest, TargetOutcome};

/// Default number of attempts per reconciliation pass
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Runtime settings shared by the actuators
#[derive(Clone, Debug)]
pub struct ActuatorConfig {
    /// Retry policy applied to each pass
    pub retry: RetryConfig,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::with_max_attempts(DEFAULT_MAX_ATTEMPTS),
        }
    }
}
