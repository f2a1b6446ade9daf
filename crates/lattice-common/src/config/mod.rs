//! Provider configuration payloads
//!
//! These are the provider-specific sections embedded in the cluster-lifecycle
//! resources for bastions and backup buckets. Decoding the surrounding
//! Kubernetes objects happens elsewhere; the reconcilers only ever see these
//! already-extracted values.

mod backup_bucket;
mod bastion;

pub use backup_bucket::{BackupBucketConfig, ImmutabilityConfig, RetentionType};
pub use bastion::{BastionConfig, BastionIngressPolicy, IpBlock, DEFAULT_SSH_PORT};
