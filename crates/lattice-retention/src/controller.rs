//! Retention policy controller
//!
//! [`decide`] is a pure transition function from (desired, observed) to the
//! single action that moves the bucket towards the desired state.
//! [`execute`] performs that action's provider calls in order.
//!
//! Two invariants hold for every input:
//!
//! - a locked policy is never removed and its period never shrinks
//! - an expired policy is always aborted before anything else happens
//!
//! | Observed   | Desired                         | Action            |
//! |------------|---------------------------------|-------------------|
//! | Absent     | none                            | NoOp              |
//! | Absent     | unlocked                        | Create            |
//! | Absent     | locked                          | CreateAndLock     |
//! | InProgress | none                            | Abort             |
//! | InProgress | unlocked, same period           | NoOp              |
//! | InProgress | unlocked, other period          | Create            |
//! | InProgress | locked                          | Lock              |
//! | Locked     | none                            | NoOp              |
//! | Locked     | longer period                   | Extend            |
//! | Locked     | same or shorter period          | NoOp              |
//! | Expired    | none                            | Abort             |
//! | Expired    | any                             | AbortThenRecreate |

use std::fmt;

use lattice_common::Result;

use crate::client::BucketWormClient;
use crate::state::{RetentionConfig, RetentionState};

/// What to do with a bucket's retention policy this pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetentionAction {
    /// Nothing to do
    NoOp,
    /// Create (or, while unlocked, supersede) a policy
    Create {
        /// Period of the new policy
        retention_period_days: u32,
    },
    /// Create a policy, then lock it
    CreateAndLock {
        /// Period of the new policy
        retention_period_days: u32,
    },
    /// Grow a locked policy's period
    Extend {
        /// Policy to extend
        policy_id: String,
        /// New, strictly longer period
        retention_period_days: u32,
    },
    /// Lock an in-progress policy
    Lock {
        /// Policy to lock
        policy_id: String,
    },
    /// Remove an unlocked or expired policy
    Abort,
    /// Clear an expired policy, create a new one, optionally lock it
    AbortThenRecreate {
        /// Period of the new policy
        retention_period_days: u32,
        /// Lock after the recreate succeeds
        lock: bool,
    },
}

/// A single provider call within an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Abort the current policy
    Abort,
    /// Create a policy
    Create,
    /// Lock a policy
    Lock,
    /// Extend a policy
    Extend,
}

impl RetentionAction {
    /// Provider calls this action expands to, in execution order
    pub fn steps(&self) -> Vec<Step> {
        match self {
            Self::NoOp => vec![],
            Self::Create { .. } => vec![Step::Create],
            Self::CreateAndLock { .. } => vec![Step::Create, Step::Lock],
            Self::Extend { .. } => vec![Step::Extend],
            Self::Lock { .. } => vec![Step::Lock],
            Self::Abort => vec![Step::Abort],
            Self::AbortThenRecreate { lock: false, .. } => vec![Step::Abort, Step::Create],
            Self::AbortThenRecreate { lock: true, .. } => {
                vec![Step::Abort, Step::Create, Step::Lock]
            }
        }
    }

    /// True for [`RetentionAction::NoOp`]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

impl fmt::Display for RetentionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "NoOp"),
            Self::Create {
                retention_period_days,
            } => write!(f, "Create({}d)", retention_period_days),
            Self::CreateAndLock {
                retention_period_days,
            } => write!(f, "CreateAndLock({}d)", retention_period_days),
            Self::Extend {
                retention_period_days,
                ..
            } => write!(f, "Extend({}d)", retention_period_days),
            Self::Lock { .. } => write!(f, "Lock"),
            Self::Abort => write!(f, "Abort"),
            Self::AbortThenRecreate {
                retention_period_days,
                lock,
            } => write!(
                f,
                "AbortThenRecreate({}d, lock={})",
                retention_period_days, lock
            ),
        }
    }
}

/// Decide the next action for a bucket
pub fn decide(desired: Option<&RetentionConfig>, observed: &RetentionState) -> RetentionAction {
    match (observed, desired) {
        (RetentionState::Absent, None) => RetentionAction::NoOp,
        (RetentionState::Absent, Some(d)) if d.locked() => RetentionAction::CreateAndLock {
            retention_period_days: d.retention_period_days(),
        },
        (RetentionState::Absent, Some(d)) => RetentionAction::Create {
            retention_period_days: d.retention_period_days(),
        },

        (RetentionState::InProgress(_), None) => RetentionAction::Abort,
        (RetentionState::InProgress(p), Some(d)) if d.locked() => RetentionAction::Lock {
            policy_id: p.policy_id.clone(),
        },
        (RetentionState::InProgress(p), Some(d))
            if d.retention_period_days() == p.retention_period_days =>
        {
            RetentionAction::NoOp
        }
        (RetentionState::InProgress(_), Some(d)) => RetentionAction::Create {
            retention_period_days: d.retention_period_days(),
        },

        // A lock cannot be lifted; dropping the request changes nothing.
        (RetentionState::Locked(_), None) => RetentionAction::NoOp,
        (RetentionState::Locked(p), Some(d))
            if d.retention_period_days() > p.retention_period_days =>
        {
            RetentionAction::Extend {
                policy_id: p.policy_id.clone(),
                retention_period_days: d.retention_period_days(),
            }
        }
        (RetentionState::Locked(_), Some(_)) => RetentionAction::NoOp,

        (RetentionState::Expired(_), None) => RetentionAction::Abort,
        (RetentionState::Expired(_), Some(d)) => RetentionAction::AbortThenRecreate {
            retention_period_days: d.retention_period_days(),
            lock: d.locked(),
        },
    }
}

/// Whether the desired config asks to shorten a locked policy
///
/// [`decide`] answers such requests with `NoOp`; callers use this to tell
/// the user their request is being ignored.
pub fn shrink_requested(desired: Option<&RetentionConfig>, observed: &RetentionState) -> bool {
    match (observed, desired) {
        (RetentionState::Locked(p), Some(d)) => {
            d.retention_period_days() < p.retention_period_days
        }
        _ => false,
    }
}

/// Perform an action's provider calls, strictly in order
///
/// Each step starts only after the previous one returned successfully; a
/// lock following a create uses the id the create returned. The first error
/// is returned unchanged and completed steps are not undone. The next pass
/// re-reads the bucket and picks up from wherever this one stopped.
///
/// Returns the id of the policy the bucket ends up with, if known.
pub async fn execute<C>(
    client: &C,
    bucket: &str,
    action: &RetentionAction,
) -> Result<Option<String>>
where
    C: BucketWormClient + ?Sized,
{
    match action {
        RetentionAction::NoOp => Ok(None),
        RetentionAction::Create {
            retention_period_days,
        } => {
            let id = client
                .create_retention_policy(bucket, *retention_period_days)
                .await?;
            Ok(Some(id))
        }
        RetentionAction::CreateAndLock {
            retention_period_days,
        } => {
            let id = client
                .create_retention_policy(bucket, *retention_period_days)
                .await?;
            client.lock_retention_policy(bucket, &id).await?;
            Ok(Some(id))
        }
        RetentionAction::Extend {
            policy_id,
            retention_period_days,
        } => {
            client
                .extend_retention_policy(bucket, *retention_period_days, policy_id)
                .await?;
            Ok(Some(policy_id.clone()))
        }
        RetentionAction::Lock { policy_id } => {
            client.lock_retention_policy(bucket, policy_id).await?;
            Ok(Some(policy_id.clone()))
        }
        RetentionAction::Abort => {
            client.abort_retention_policy(bucket).await?;
            Ok(None)
        }
        RetentionAction::AbortThenRecreate {
            retention_period_days,
            lock,
        } => {
            client.abort_retention_policy(bucket).await?;
            let id = client
                .create_retention_policy(bucket, *retention_period_days)
                .await?;
            if *lock {
                client.lock_retention_policy(bucket, &id).await?;
            }
            Ok(Some(id))
        }
    }
}
