//! Desired and observed retention (WORM) state
//!
//! The provider reports a bucket's retention policy as a loosely typed record
//! with a string state tag. It is parsed once, here, into a closed enum so the
//! controller never has to reason about unknown strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use lattice_common::config::{BackupBucketConfig, ImmutabilityConfig};
use lattice_common::{Error, Result};

/// Longest retention period the provider accepts (70 years)
pub const MAX_RETENTION_PERIOD_DAYS: u32 = 25_550;

/// Requested immutability for a bucket
///
/// Only constructible through validation, so a value of this type always
/// holds a period the provider can accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionConfig {
    retention_period_days: u32,
    locked: bool,
}

impl RetentionConfig {
    /// Validate a requested retention period
    pub fn new(retention_period_days: i64, locked: bool) -> Result<Self> {
        let days = u32::try_from(retention_period_days)
            .ok()
            .filter(|d| (1..=MAX_RETENTION_PERIOD_DAYS).contains(d))
            .ok_or_else(|| {
                Error::validation(format!(
                    "retention period must be between 1 and {} days, got {}",
                    MAX_RETENTION_PERIOD_DAYS, retention_period_days
                ))
            })?;
        Ok(Self {
            retention_period_days: days,
            locked,
        })
    }

    /// Retention period in days
    pub fn retention_period_days(&self) -> u32 {
        self.retention_period_days
    }

    /// Whether the policy should be locked
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Extract the desired config of a bucket, if any
    pub fn from_bucket(bucket: &str, config: &BackupBucketConfig) -> Result<Option<Self>> {
        config
            .immutability
            .as_ref()
            .map(|imm| {
                Self::try_from(imm).map_err(|e| match e {
                    Error::Validation { message, .. } => Error::validation_for_field(
                        bucket,
                        "immutability.retentionPeriodDays",
                        message,
                    ),
                    other => other,
                })
            })
            .transpose()
    }
}

impl TryFrom<&ImmutabilityConfig> for RetentionConfig {
    type Error = Error;

    fn try_from(config: &ImmutabilityConfig) -> Result<Self> {
        Self::new(config.retention_period_days, config.locked)
    }
}

/// A retention policy that exists on the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Opaque provider id, needed to lock or extend the policy
    pub policy_id: String,
    /// Retention period currently recorded by the provider
    pub retention_period_days: u32,
}

/// Observed retention state of a bucket
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetentionState {
    /// No policy
    Absent,
    /// Policy created, not yet locked; can still be replaced or aborted
    InProgress(RetentionPolicy),
    /// Policy locked; irreversible, the period can only grow
    Locked(RetentionPolicy),
    /// Policy expired; must be aborted before a new one can be created
    Expired(RetentionPolicy),
}

impl RetentionState {
    /// Parse the provider's view of a bucket's policy
    ///
    /// `None` means the provider reported no policy, which is `Absent` and
    /// not an error.
    pub fn from_raw(bucket: &str, raw: Option<&RawWormConfiguration>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::Absent);
        };

        let days = u32::try_from(raw.retention_period_in_days).map_err(|_| {
            Error::unexpected_state(
                bucket,
                format!(
                    "negative retention period {} on policy {}",
                    raw.retention_period_in_days, raw.worm_id
                ),
            )
        })?;
        let policy = RetentionPolicy {
            policy_id: raw.worm_id.clone(),
            retention_period_days: days,
        };

        match raw.state.trim() {
            "InProgress" => Ok(Self::InProgress(policy)),
            "Locked" => Ok(Self::Locked(policy)),
            "Expired" => Ok(Self::Expired(policy)),
            other => Err(Error::unexpected_state(
                bucket,
                format!("unknown WORM state '{}'", other),
            )),
        }
    }

    /// The existing policy, unless the state is `Absent`
    pub fn policy(&self) -> Option<&RetentionPolicy> {
        match self {
            Self::Absent => None,
            Self::InProgress(p) | Self::Locked(p) | Self::Expired(p) => Some(p),
        }
    }
}

impl fmt::Display for RetentionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::InProgress(p) => write!(f, "InProgress({}d)", p.retention_period_days),
            Self::Locked(p) => write!(f, "Locked({}d)", p.retention_period_days),
            Self::Expired(p) => write!(f, "Expired({}d)", p.retention_period_days),
        }
    }
}

/// Provider rendering of a bucket's WORM configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawWormConfiguration {
    /// Policy id
    pub worm_id: String,
    /// "InProgress", "Locked" or "Expired"
    pub state: String,
    /// Retention period
    pub retention_period_in_days: i64,
    /// Creation timestamp
    pub creation_date: String,
}
