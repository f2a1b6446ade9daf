//! Desired security group rules for a bastion host
//!
//! A bastion touches three rule sets:
//!
//! - **bastion ingress**: SSH from each configured CIDR
//! - **bastion egress**: SSH to the worker security group, nothing else
//! - **worker ingress**: SSH from the bastion's private address. The worker
//!   group is shared with the cluster, so only the rule carrying this
//!   bastion's description is managed
//!
//! The bastion's own group belongs to the bastion alone; anything else found
//! there is removed.

use std::net::IpAddr;

use lattice_common::config::BastionConfig;
use lattice_common::{Error, Result};

use crate::reconciler::RuleTarget;
use crate::rule::{Direction, Peer, PortRange, Protocol, Rule};

/// Description of the bastion's SSH ingress rules
pub fn ingress_description(bastion: &str) -> String {
    format!("{}-allow-ssh", bastion)
}

/// Description of the bastion's egress rule towards the workers
pub fn egress_description(bastion: &str) -> String {
    format!("{}-ssh-to-workers", bastion)
}

/// Description of the worker ingress rule admitting the bastion
pub fn worker_ingress_description(bastion: &str) -> String {
    format!("{}-allow-bastion", bastion)
}

/// Where a bastion's rules live
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BastionGroups {
    /// The bastion's own security group
    pub bastion_group_id: String,
    /// The cluster's worker security group
    pub worker_group_id: String,
}

/// One rule set to reconcile together with its target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredRules {
    /// Group, direction and ownership
    pub target: RuleTarget,
    /// Rules that should exist
    pub rules: Vec<Rule>,
}

/// Every rule set a bastion manages, in the order they are reconciled
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BastionRuleSets {
    /// SSH from the configured CIDRs
    pub bastion_ingress: DesiredRules,
    /// SSH to the workers
    pub bastion_egress: DesiredRules,
    /// SSH from the bastion into the workers
    pub worker_ingress: DesiredRules,
}

impl BastionRuleSets {
    /// Rule sets in reconciliation order
    pub fn iter(&self) -> impl Iterator<Item = &DesiredRules> {
        [
            &self.bastion_ingress,
            &self.bastion_egress,
            &self.worker_ingress,
        ]
        .into_iter()
    }
}

/// Every target a bastion manages, with nothing desired
///
/// Built from the bastion's name and groups alone, so deletion does not
/// depend on the ingress configuration being valid.
pub fn empty_rule_sets(bastion: &str, groups: &BastionGroups) -> Result<BastionRuleSets> {
    if groups.worker_group_id.trim().is_empty() {
        return Err(Error::validation_for(bastion, "worker security group id is empty"));
    }

    let empty = |target: RuleTarget| DesiredRules {
        target,
        rules: Vec::new(),
    };
    Ok(BastionRuleSets {
        bastion_ingress: empty(RuleTarget::exclusive(&groups.bastion_group_id, Direction::Ingress)),
        bastion_egress: empty(RuleTarget::exclusive(&groups.bastion_group_id, Direction::Egress)),
        worker_ingress: empty(RuleTarget::shared(
            &groups.worker_group_id,
            Direction::Ingress,
            worker_ingress_description(bastion),
        )),
    })
}

/// Derive every desired rule set for a bastion
///
/// `bastion_address` is the bastion's private address. Before the instance
/// reports one, the worker ingress set is empty.
pub fn desired_rule_sets(
    bastion: &str,
    config: &BastionConfig,
    groups: &BastionGroups,
    bastion_address: Option<IpAddr>,
) -> Result<BastionRuleSets> {
    let mut sets = empty_rule_sets(bastion, groups)?;

    let ssh = PortRange::single(config.ssh_port()).map_err(|e| in_field(bastion, "sshPort", e))?;

    sets.bastion_ingress.rules = config
        .ingress_cidrs()
        .enumerate()
        .map(|(i, cidr)| {
            Peer::parse_cidr(cidr)
                .map(|peer| {
                    Rule::new(Protocol::Tcp, ssh, peer)
                        .with_description(ingress_description(bastion))
                })
                .map_err(|e| in_field(bastion, &format!("ingress[{}].ipBlock.cidr", i), e))
        })
        .collect::<Result<Vec<_>>>()?;

    sets.bastion_egress.rules = vec![Rule::new(
        Protocol::Tcp,
        ssh,
        Peer::group(groups.worker_group_id.clone()),
    )
    .with_description(egress_description(bastion))];

    if let Some(addr) = bastion_address {
        sets.worker_ingress.rules = vec![Rule::new(Protocol::Tcp, ssh, Peer::host(addr)?)
            .with_description(worker_ingress_description(bastion))];
    }

    Ok(sets)
}

/// Re-home a validation error onto a config field of the bastion
fn in_field(bastion: &str, field: &str, err: Error) -> Error {
    match err {
        Error::Validation { message, .. } => Error::validation_for_field(bastion, field, message),
        other => other,
    }
}
