//! Bastion host configuration
//!
//! Declares who may reach the bastion over SSH. The firewall reconciler turns
//! this into security group rules on every pass.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default SSH port opened on the bastion
pub const DEFAULT_SSH_PORT: u16 = 22;

/// A CIDR block allowed to reach the bastion
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpBlock {
    /// IPv4 or IPv6 CIDR (e.g., "10.0.0.0/24", "2001:db8::/64")
    pub cidr: String,
}

/// One ingress source for the bastion
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BastionIngressPolicy {
    /// Source address block
    pub ip_block: IpBlock,
}

/// Bastion configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BastionConfig {
    /// Sources allowed to open SSH connections to the bastion.
    /// An empty list closes the bastion to everyone.
    #[serde(default)]
    pub ingress: Vec<BastionIngressPolicy>,

    /// SSH port (default: 22)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,
}

impl BastionConfig {
    /// SSH port to open, falling back to [`DEFAULT_SSH_PORT`]
    pub fn ssh_port(&self) -> u16 {
        self.ssh_port.unwrap_or(DEFAULT_SSH_PORT)
    }

    /// Ingress CIDRs in declaration order
    pub fn ingress_cidrs(&self) -> impl Iterator<Item = &str> {
        self.ingress.iter().map(|p| p.ip_block.cidr.as_str())
    }
}
