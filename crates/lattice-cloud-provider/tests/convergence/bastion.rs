//! Stories about a bastion's security rules settling into place

use std::net::IpAddr;
use std::sync::Arc;

use lattice_cloud_provider::{BastionActuator, BastionRequest};
use lattice_common::config::{BastionConfig, BastionIngressPolicy, IpBlock};
use lattice_common::Error;
use lattice_firewall::bastion::BastionGroups;
use lattice_firewall::{Direction, RawRule};

use crate::fakes::{fast_config, FakeSecurityGroups};

const BASTION_GROUP: &str = "sg-bastion";
const WORKER_GROUP: &str = "sg-workers";

fn request(cidrs: &[&str], address: Option<&str>) -> BastionRequest {
    BastionRequest {
        name: "shoot--dev--bastion-a".to_string(),
        config: BastionConfig {
            ingress: cidrs
                .iter()
                .map(|c| BastionIngressPolicy {
                    ip_block: IpBlock {
                        cidr: c.to_string(),
                    },
                })
                .collect(),
            ssh_port: None,
        },
        groups: BastionGroups {
            bastion_group_id: BASTION_GROUP.to_string(),
            worker_group_id: WORKER_GROUP.to_string(),
        },
        private_address: address.map(|a| a.parse::<IpAddr>().unwrap()),
    }
}

fn kubelet_rule() -> RawRule {
    RawRule {
        ip_protocol: "tcp".to_string(),
        port_range: "10250/10250".to_string(),
        source_cidr_ip: "10.250.0.0/16".to_string(),
        description: "kube-nodes".to_string(),
        ..Default::default()
    }
}

// =========================================================================
// Convergence
// =========================================================================

/// Story: a fresh bastion gets SSH ingress from each configured CIDR, SSH
/// egress to the workers and a worker rule admitting it. Running the same
/// request again changes nothing.
#[tokio::test]
async fn story_bastion_converges_and_stays_converged() {
    let groups = Arc::new(FakeSecurityGroups::default());
    let actuator = BastionActuator::new(groups.clone(), fast_config());
    let req = request(&["10.0.0.0/24", "2001:db8::/32"], Some("10.250.0.9"));

    let first = actuator.reconcile(&req).await.unwrap();
    assert_eq!(first.added(), 4);
    assert_eq!(first.removed(), 0);

    let ingress = groups.raw_rules(BASTION_GROUP, Direction::Ingress);
    assert_eq!(ingress.len(), 2);
    assert!(ingress.iter().all(|r| r.port_range == "22/22"));
    assert!(ingress.iter().any(|r| r.source_cidr_ip == "10.0.0.0/24"));
    assert!(ingress.iter().any(|r| r.ipv6_source_cidr_ip == "2001:db8::/32"));

    let egress = groups.raw_rules(BASTION_GROUP, Direction::Egress);
    assert_eq!(egress.len(), 1);
    assert_eq!(egress[0].dest_group_id, WORKER_GROUP);

    let workers = groups.raw_rules(WORKER_GROUP, Direction::Ingress);
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].source_cidr_ip, "10.250.0.9/32");
    assert_eq!(workers[0].description, "shoot--dev--bastion-a-allow-bastion");

    groups.clear_log();
    let second = actuator.reconcile(&req).await.unwrap();
    assert!(second.is_noop());
    assert!(groups.log().is_empty());
}

/// Story: the provider echoes rules back in its own spelling (upper-case
/// protocol, host bits set). Those still match and are left alone.
#[tokio::test]
async fn story_provider_spelling_is_not_churned() {
    let groups = Arc::new(FakeSecurityGroups::default());
    groups.seed(
        BASTION_GROUP,
        Direction::Ingress,
        RawRule {
            ip_protocol: "TCP".to_string(),
            port_range: "22/22".to_string(),
            source_cidr_ip: "10.0.0.5/24".to_string(),
            description: "shoot--dev--bastion-a-allow-ssh".to_string(),
            ..Default::default()
        },
    );
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    let outcome = actuator
        .reconcile(&request(&["10.0.0.0/24"], None))
        .await
        .unwrap();

    assert!(outcome.targets[0].summary.is_noop());
    assert_eq!(groups.raw_rules(BASTION_GROUP, Direction::Ingress).len(), 1);
}

/// Story: the user swaps the allowed CIDR. The new rule is installed before
/// the old one is revoked, so SSH access never drops to nothing.
#[tokio::test]
async fn story_changed_cidr_adds_before_removing() {
    let groups = Arc::new(FakeSecurityGroups::default());
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    actuator
        .reconcile(&request(&["10.0.0.0/24"], Some("10.250.0.9")))
        .await
        .unwrap();
    groups.clear_log();

    let outcome = actuator
        .reconcile(&request(&["192.168.0.0/16"], Some("10.250.0.9")))
        .await
        .unwrap();

    assert_eq!(outcome.added(), 1);
    assert_eq!(outcome.removed(), 1);
    assert_eq!(
        groups.log(),
        vec!["add sg-bastion ingress", "remove sg-bastion ingress"]
    );
    let ingress = groups.raw_rules(BASTION_GROUP, Direction::Ingress);
    assert_eq!(ingress.len(), 1);
    assert_eq!(ingress[0].source_cidr_ip, "192.168.0.0/16");
}

/// Story: someone opened SSH to the world on the bastion's own group. That
/// group belongs to the bastion, so the stray rule goes.
#[tokio::test]
async fn story_stray_rule_in_bastion_group_is_removed() {
    let groups = Arc::new(FakeSecurityGroups::default());
    groups.seed(
        BASTION_GROUP,
        Direction::Ingress,
        RawRule {
            ip_protocol: "tcp".to_string(),
            port_range: "22/22".to_string(),
            source_cidr_ip: "0.0.0.0/0".to_string(),
            ..Default::default()
        },
    );
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    let outcome = actuator
        .reconcile(&request(&["10.0.0.0/24"], None))
        .await
        .unwrap();

    assert_eq!(outcome.targets[0].summary.removed.len(), 1);
    let ingress = groups.raw_rules(BASTION_GROUP, Direction::Ingress);
    assert_eq!(ingress.len(), 1);
    assert_eq!(ingress[0].source_cidr_ip, "10.0.0.0/24");
}

// =========================================================================
// Shared worker group
// =========================================================================

/// Story: the worker group also carries the cluster's own rules. Creating
/// and then deleting the bastion only ever touches the bastion's rule.
#[tokio::test]
async fn story_worker_rules_of_other_owners_survive() {
    let groups = Arc::new(FakeSecurityGroups::default());
    groups.seed(WORKER_GROUP, Direction::Ingress, kubelet_rule());
    let actuator = BastionActuator::new(groups.clone(), fast_config());
    let req = request(&["10.0.0.0/24"], Some("10.250.0.9"));

    actuator.reconcile(&req).await.unwrap();
    assert_eq!(
        groups.descriptions(WORKER_GROUP, Direction::Ingress),
        vec!["kube-nodes", "shoot--dev--bastion-a-allow-bastion"]
    );

    let outcome = actuator.delete(&req).await.unwrap();
    assert_eq!(outcome.removed(), 3);
    assert_eq!(
        groups.descriptions(WORKER_GROUP, Direction::Ingress),
        vec!["kube-nodes"]
    );
    assert!(groups.raw_rules(BASTION_GROUP, Direction::Ingress).is_empty());
    assert!(groups.raw_rules(BASTION_GROUP, Direction::Egress).is_empty());
}

/// Story: the bastion has no private address yet. The worker rule waits;
/// once the address shows up it is added on the next pass.
#[tokio::test]
async fn story_worker_rule_waits_for_private_address() {
    let groups = Arc::new(FakeSecurityGroups::default());
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    actuator
        .reconcile(&request(&["10.0.0.0/24"], None))
        .await
        .unwrap();
    assert!(groups.raw_rules(WORKER_GROUP, Direction::Ingress).is_empty());

    let outcome = actuator
        .reconcile(&request(&["10.0.0.0/24"], Some("10.250.0.9")))
        .await
        .unwrap();
    assert_eq!(outcome.added(), 1);
    assert_eq!(groups.raw_rules(WORKER_GROUP, Direction::Ingress).len(), 1);
}

// =========================================================================
// Failures
// =========================================================================

/// Story: the provider throttles an add. The pass is retried from a fresh
/// listing and still converges without duplicates.
#[tokio::test]
async fn story_throttled_add_is_retried() {
    let groups = Arc::new(FakeSecurityGroups::default());
    groups.fail_next("add");
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    let outcome = actuator
        .reconcile(&request(&["10.0.0.0/24"], Some("10.250.0.9")))
        .await
        .unwrap();

    assert_eq!(outcome.added(), 3);
    assert_eq!(groups.raw_rules(BASTION_GROUP, Direction::Ingress).len(), 1);
}

/// Story: a typo in a CIDR is reported against the offending field and no
/// rule is touched.
#[tokio::test]
async fn story_invalid_cidr_touches_nothing() {
    let groups = Arc::new(FakeSecurityGroups::default());
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    let err = actuator
        .reconcile(&request(&["10.0.0.0/24", "10.0.0/33"], None))
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    match err {
        Error::Validation { field, .. } => {
            assert_eq!(field.as_deref(), Some("ingress[1].ipBlock.cidr"))
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert!(groups.log().is_empty());
}

/// Story: an SSH port of zero is refused up front. Installing it would leave
/// a rule the provider lists back as unparseable.
#[tokio::test]
async fn story_ssh_port_zero_touches_nothing() {
    let groups = Arc::new(FakeSecurityGroups::default());
    let actuator = BastionActuator::new(groups.clone(), fast_config());
    let mut req = request(&["10.0.0.0/24"], Some("10.250.0.9"));
    req.config.ssh_port = Some(0);

    let err = actuator.reconcile(&req).await.unwrap_err();

    assert!(!err.is_retryable());
    match err {
        Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some("sshPort")),
        other => panic!("expected validation error, got {other}"),
    }
    assert!(groups.log().is_empty());
}

/// Story: after the bastion is up, its config picks up a broken CIDR. The
/// bastion can no longer be reconciled but deleting it still removes every
/// rule it owns.
#[tokio::test]
async fn story_delete_with_invalid_cidr_still_cleans_up() {
    let groups = Arc::new(FakeSecurityGroups::default());
    groups.seed(WORKER_GROUP, Direction::Ingress, kubelet_rule());
    let actuator = BastionActuator::new(groups.clone(), fast_config());

    actuator
        .reconcile(&request(&["10.0.0.0/24"], Some("10.250.0.9")))
        .await
        .unwrap();

    let broken = request(&["10.0.0.0/24", "10.0.0/33"], Some("10.250.0.9"));
    assert!(actuator.reconcile(&broken).await.is_err());

    let outcome = actuator.delete(&broken).await.unwrap();
    assert_eq!(outcome.removed(), 3);
    assert!(groups.raw_rules(BASTION_GROUP, Direction::Ingress).is_empty());
    assert!(groups.raw_rules(BASTION_GROUP, Direction::Egress).is_empty());
    assert_eq!(
        groups.descriptions(WORKER_GROUP, Direction::Ingress),
        vec!["kube-nodes"]
    );
}
