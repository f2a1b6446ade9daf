//! Backup bucket configuration
//!
//! Carries the optional immutability (WORM) request for a backup bucket.
//! Absence of `immutability` means no retention policy is wanted.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scope of a retention policy
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RetentionType {
    /// Policy applies to every object in the bucket
    #[default]
    Bucket,
}

/// Immutability request for a bucket
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImmutabilityConfig {
    /// Retention scope
    #[serde(default)]
    pub retention_type: RetentionType,

    /// Retention period in days. Validated by the retention controller;
    /// kept signed so a negative value surfaces as a validation error
    /// rather than a decode failure.
    pub retention_period_days: i64,

    /// Lock the policy. A locked policy can never be removed and its
    /// retention period can only grow.
    #[serde(default)]
    pub locked: bool,
}

/// Backup bucket configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupBucketConfig {
    /// Immutability settings (none = no retention policy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutability: Option<ImmutabilityConfig>,
}
