//! Bastion security rule actuator
//!
//! Drives the firewall reconciler for one bastion: bastion ingress, bastion
//! egress, then worker ingress. Each rule set is reconciled in its own pass
//! and each pass is retried from scratch on transient failures, re-listing
//! the provider every time.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use lattice_common::config::BastionConfig;
use lattice_common::retry::retry_transient;
use lattice_common::Result;
use lattice_firewall::bastion::{
    desired_rule_sets, empty_rule_sets, BastionGroups, BastionRuleSets,
};
use lattice_firewall::{reconcile_target, ApplySummary, RuleTarget, SecurityGroupClient};

use crate::ActuatorConfig;

/// Everything needed to reconcile one bastion's rules
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BastionRequest {
    /// Bastion name; prefixes every rule description
    pub name: String,
    /// Requested ingress
    pub config: BastionConfig,
    /// Bastion and worker security groups
    pub groups: BastionGroups,
    /// Bastion private address, once the instance has one
    pub private_address: Option<IpAddr>,
}

/// Result of reconciling one rule set
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetOutcome {
    /// Group and direction
    pub target: RuleTarget,
    /// Calls made
    pub summary: ApplySummary,
}

/// Result of reconciling all of a bastion's rule sets
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BastionOutcome {
    /// Per rule set, in reconciliation order
    pub targets: Vec<TargetOutcome>,
}

impl BastionOutcome {
    /// Total rules installed
    pub fn added(&self) -> usize {
        self.targets.iter().map(|t| t.summary.added.len()).sum()
    }

    /// Total rules revoked
    pub fn removed(&self) -> usize {
        self.targets.iter().map(|t| t.summary.removed.len()).sum()
    }

    /// True when nothing had to change
    pub fn is_noop(&self) -> bool {
        self.targets.iter().all(|t| t.summary.is_noop())
    }
}

/// Reconciles bastion security group rules
pub struct BastionActuator<C: ?Sized> {
    client: Arc<C>,
    config: ActuatorConfig,
}

impl<C> BastionActuator<C>
where
    C: SecurityGroupClient + ?Sized,
{
    /// Create an actuator over a provider client
    pub fn new(client: Arc<C>, config: ActuatorConfig) -> Self {
        Self { client, config }
    }

    /// Bring every rule set of the bastion to its desired state
    ///
    /// Configuration errors are reported before any provider call.
    pub async fn reconcile(&self, request: &BastionRequest) -> Result<BastionOutcome> {
        info!(bastion = %request.name, "Reconciling bastion security rules");

        let sets = self.desired(request)?;
        let outcome = self.converge(&request.name, &sets).await?;

        if outcome.is_noop() {
            debug!(bastion = %request.name, "Bastion security rules already up to date");
        } else {
            info!(
                bastion = %request.name,
                added = outcome.added(),
                removed = outcome.removed(),
                "Bastion security rules reconciled"
            );
        }
        Ok(outcome)
    }

    /// Remove every rule this bastion owns
    ///
    /// Rules other owners placed in the worker group are left in place. The
    /// ingress configuration is not consulted, so a bastion whose config no
    /// longer validates can still be torn down.
    pub async fn delete(&self, request: &BastionRequest) -> Result<BastionOutcome> {
        info!(bastion = %request.name, "Removing bastion security rules");

        let sets = empty_rule_sets(&request.name, &request.groups).inspect_err(|e| {
            warn!(bastion = %request.name, error = %e, "Invalid bastion security groups");
        })?;
        let outcome = self.converge(&request.name, &sets).await?;

        info!(
            bastion = %request.name,
            removed = outcome.removed(),
            "Bastion security rules removed"
        );
        Ok(outcome)
    }

    fn desired(&self, request: &BastionRequest) -> Result<BastionRuleSets> {
        desired_rule_sets(
            &request.name,
            &request.config,
            &request.groups,
            request.private_address,
        )
        .inspect_err(|e| {
            warn!(bastion = %request.name, error = %e, "Invalid bastion configuration");
        })
    }

    async fn converge(&self, bastion: &str, sets: &BastionRuleSets) -> Result<BastionOutcome> {
        let mut outcome = BastionOutcome::default();

        for desired in sets.iter() {
            let target = &desired.target;
            let operation = format!("reconcile {} rules of {}", target.direction, target.group_id);

            let summary = retry_transient(&self.config.retry, &operation, || {
                reconcile_target(self.client.as_ref(), target, &desired.rules)
            })
            .await
            .inspect_err(|e| {
                warn!(
                    bastion = %bastion,
                    security_group = %target.group_id,
                    direction = %target.direction,
                    error = %e,
                    "Security rule reconciliation failed"
                );
            })?;

            for rule in &summary.added {
                info!(
                    bastion = %bastion,
                    security_group = %target.group_id,
                    direction = %target.direction,
                    rule = %rule,
                    "Security rule added"
                );
            }
            for rule in &summary.removed {
                info!(
                    bastion = %bastion,
                    security_group = %target.group_id,
                    direction = %target.direction,
                    rule_id = %rule.id,
                    rule = %rule.rule,
                    "Security rule removed"
                );
            }

            outcome.targets.push(TargetOutcome {
                target: target.clone(),
                summary,
            });
        }

        Ok(outcome)
    }
}
