//! Security group rule model
//!
//! Rules have no client-chosen key on the provider side, so identity is
//! structural: protocol, port range, peer and description together. The
//! provider renders unset fields as empty strings and may spell the same
//! network several ways, so everything is normalized on the way in and
//! equality is only ever evaluated on normalized values.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

use lattice_common::{Error, Result};

/// Traffic direction of a rule set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Inbound traffic; the peer is the source
    Ingress,
    /// Outbound traffic; the peer is the destination
    Egress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => write!(f, "ingress"),
            Self::Egress => write!(f, "egress"),
        }
    }
}

/// IP protocol of a rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// ICMP (IPv4)
    Icmp,
    /// ICMPv6
    Icmpv6,
    /// GRE
    Gre,
    /// Any protocol
    All,
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "icmp" => Ok(Self::Icmp),
            "icmpv6" => Ok(Self::Icmpv6),
            "gre" => Ok(Self::Gre),
            "all" | "-1" => Ok(Self::All),
            other => Err(Error::validation(format!("unknown protocol '{}'", other))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::Icmpv6 => "icmpv6",
            Self::Gre => "gre",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

/// Inclusive port range, rendered as `"low/high"`
///
/// `-1/-1` means every port, which is how the provider expresses rules for
/// port-less protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRange {
    low: i32,
    high: i32,
}

impl PortRange {
    /// All ports
    pub const ALL: PortRange = PortRange { low: -1, high: -1 };

    /// Create a validated port range
    pub fn new(low: i32, high: i32) -> Result<Self> {
        if low == -1 && high == -1 {
            return Ok(Self::ALL);
        }
        if !(1..=65535).contains(&low) || !(1..=65535).contains(&high) {
            return Err(Error::validation(format!(
                "port range {}/{} out of bounds (1-65535)",
                low, high
            )));
        }
        if low > high {
            return Err(Error::validation(format!(
                "port range {}/{} has low > high",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    /// Range covering exactly one port; port 0 is rejected
    pub fn single(port: u16) -> Result<Self> {
        let port = i32::from(port);
        Self::new(port, port)
    }

    /// Lower bound
    pub fn low(&self) -> i32 {
        self.low
    }

    /// Upper bound
    pub fn high(&self) -> i32 {
        self.high
    }
}

impl FromStr for PortRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (low, high) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::validation(format!("port range '{}' is not low/high", s)))?;
        let parse = |p: &str| {
            p.trim()
                .parse::<i32>()
                .map_err(|_| Error::validation(format!("port range '{}' is not numeric", s)))
        };
        Self::new(parse(low)?, parse(high)?)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.low, self.high)
    }
}

/// The other end of a rule: source for ingress, destination for egress
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Peer {
    /// IPv4 network
    Ipv4(Ipv4Net),
    /// IPv6 network
    Ipv6(Ipv6Net),
    /// Another security group, by provider id
    Group(String),
}

impl Peer {
    /// Parse a CIDR or bare address into a normalized peer
    ///
    /// Bare addresses become host routes (`/32`, `/128`) and host bits are
    /// cleared, so `10.0.0.5/24` and `10.0.0.0/24` name the same peer.
    pub fn parse_cidr(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(net) = s.parse::<IpNet>() {
            return Ok(Self::from_net(net));
        }
        match s.parse::<IpAddr>() {
            Ok(addr) => Self::host(addr),
            Err(_) => Err(Error::validation(format!("invalid CIDR '{}'", s))),
        }
    }

    /// Host route for a single address
    pub fn host(addr: IpAddr) -> Result<Self> {
        let net = match addr {
            IpAddr::V4(a) => Ipv4Net::new(a, 32).map(IpNet::V4),
            IpAddr::V6(a) => Ipv6Net::new(a, 128).map(IpNet::V6),
        }
        .map_err(|e| Error::validation(format!("invalid host address {}: {}", addr, e)))?;
        Ok(Self::from_net(net))
    }

    /// Security group peer
    pub fn group(id: impl Into<String>) -> Self {
        Self::Group(id.into())
    }

    fn from_net(net: IpNet) -> Self {
        match net.trunc() {
            IpNet::V4(n) => Self::Ipv4(n),
            IpNet::V6(n) => Self::Ipv6(n),
        }
    }

    /// IPv4 network, if this is an IPv4 peer
    pub fn ipv4(&self) -> Option<Ipv4Net> {
        match self {
            Self::Ipv4(n) => Some(n.trunc()),
            _ => None,
        }
    }

    /// IPv6 network, if this is an IPv6 peer
    pub fn ipv6(&self) -> Option<Ipv6Net> {
        match self {
            Self::Ipv6(n) => Some(n.trunc()),
            _ => None,
        }
    }

    /// Security group id, if this is a group peer
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::Group(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(n) => write!(f, "{}", n),
            Self::Ipv6(n) => write!(f, "{}", n),
            Self::Group(id) => write!(f, "group:{}", id),
        }
    }
}

/// A security group rule in normalized, provider-independent form
///
/// Desired rules are built fresh on every pass and carry no provider id.
#[derive(Clone, Debug)]
pub struct Rule {
    /// IP protocol
    pub protocol: Protocol,
    /// Port range
    pub port_range: PortRange,
    /// Source (ingress) or destination (egress)
    pub peer: Peer,
    /// Free-text label, part of the rule's identity
    pub description: Option<String>,
}

impl Rule {
    /// Create a rule without a description
    pub fn new(protocol: Protocol, port_range: PortRange, peer: Peer) -> Self {
        Self {
            protocol,
            port_range,
            peer,
            description: None,
        }
    }

    /// Set the description, trimmed; a blank string clears it
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = non_empty(&description).map(str::to_string);
        self
    }

    /// Description with empty strings treated as unset
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Check that this rule can be installed in the given direction
    ///
    /// Ingress rules take an IPv4 or IPv6 source. Only egress rules may
    /// point at another security group.
    pub fn validate_for(&self, direction: Direction) -> Result<()> {
        match (direction, &self.peer) {
            (Direction::Ingress, Peer::Group(id)) => Err(Error::validation(format!(
                "ingress rule '{}' may not use security group {} as source",
                self, id
            ))),
            (_, Peer::Group(id)) if id.trim().is_empty() => Err(Error::validation(format!(
                "rule '{}' has an empty security group reference",
                self
            ))),
            _ => Ok(()),
        }
    }

    /// Render in the provider's weakly-typed form
    pub fn to_raw(&self, direction: Direction) -> RawRule {
        let mut raw = RawRule {
            ip_protocol: self.protocol.to_string(),
            port_range: self.port_range.to_string(),
            description: self.description().unwrap_or_default().to_string(),
            ..Default::default()
        };
        let (v4, v6, group) = match direction {
            Direction::Ingress => (
                &mut raw.source_cidr_ip,
                &mut raw.ipv6_source_cidr_ip,
                &mut raw.source_group_id,
            ),
            Direction::Egress => (
                &mut raw.dest_cidr_ip,
                &mut raw.ipv6_dest_cidr_ip,
                &mut raw.dest_group_id,
            ),
        };
        match &self.peer {
            Peer::Ipv4(n) => *v4 = n.to_string(),
            Peer::Ipv6(n) => *v6 = n.to_string(),
            Peer::Group(id) => *group = id.clone(),
        }
        raw
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.protocol, self.port_range, self.peer)?;
        if let Some(d) = self.description() {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

/// Structural equality of two rules
///
/// Equal iff description, protocol, port range and peer (IPv4, IPv6 or
/// group) all match after normalization. Unset compares equal to unset only;
/// an empty description counts as unset.
pub fn rules_equal(a: &Rule, b: &Rule) -> bool {
    a.description() == b.description()
        && a.protocol == b.protocol
        && a.port_range == b.port_range
        && a.peer.ipv4() == b.peer.ipv4()
        && a.peer.ipv6() == b.peer.ipv6()
        && a.peer.group_id() == b.peer.group_id()
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        rules_equal(self, other)
    }
}

impl Eq for Rule {}

impl AsRef<Rule> for Rule {
    fn as_ref(&self) -> &Rule {
        self
    }
}

/// A rule as reported by the provider, with its opaque id
///
/// The id is needed to revoke the rule but never takes part in equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedRule {
    /// Provider-assigned rule id
    pub id: String,
    /// Normalized rule
    pub rule: Rule,
}

impl ObservedRule {
    /// Normalize a provider rule
    ///
    /// Empty strings are treated as unset. Exactly one peer field must be
    /// populated for the direction. A rule that cannot be represented is an
    /// [`Error::UnexpectedState`] against its rule id.
    pub fn from_raw(direction: Direction, raw: &RawRule) -> Result<Self> {
        Self::normalize(direction, raw).map_err(|e| match e {
            Error::Validation { message, .. } => {
                let target = non_empty(&raw.rule_id).unwrap_or("unidentified rule");
                Error::unexpected_state(target, format!("{} rule: {}", direction, message))
            }
            other => other,
        })
    }

    fn normalize(direction: Direction, raw: &RawRule) -> Result<Self> {
        let protocol: Protocol = raw.ip_protocol.parse()?;
        let port_range: PortRange = if raw.port_range.trim().is_empty() {
            PortRange::ALL
        } else {
            raw.port_range.parse()?
        };

        let (v4, v6, group) = match direction {
            Direction::Ingress => (
                &raw.source_cidr_ip,
                &raw.ipv6_source_cidr_ip,
                &raw.source_group_id,
            ),
            Direction::Egress => (&raw.dest_cidr_ip, &raw.ipv6_dest_cidr_ip, &raw.dest_group_id),
        };

        let mut peers = Vec::with_capacity(1);
        if let Some(v4) = non_empty(v4) {
            peers.push(Peer::parse_cidr(v4)?);
        }
        if let Some(v6) = non_empty(v6) {
            peers.push(Peer::parse_cidr(v6)?);
        }
        if let Some(group) = non_empty(group) {
            peers.push(Peer::group(group));
        }

        let peer = match peers.len() {
            1 => peers.remove(0),
            0 => return Err(Error::validation("no peer")),
            _ => return Err(Error::validation("more than one peer")),
        };

        let rule = Rule::new(protocol, port_range, peer).with_description(raw.description.as_str());
        Ok(Self {
            id: raw.rule_id.clone(),
            rule,
        })
    }
}

impl AsRef<Rule> for ObservedRule {
    fn as_ref(&self) -> &Rule {
        &self.rule
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Provider rendering of a security group rule
///
/// Every field is a string and unset fields are empty, exactly as the
/// provider's describe call returns them.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawRule {
    /// Protocol ("TCP", "tcp", "ALL", ...)
    pub ip_protocol: String,
    /// Port range ("22/22", "-1/-1")
    pub port_range: String,
    /// IPv4 source (ingress)
    pub source_cidr_ip: String,
    /// IPv6 source (ingress)
    pub ipv6_source_cidr_ip: String,
    /// Source security group (ingress)
    pub source_group_id: String,
    /// IPv4 destination (egress)
    pub dest_cidr_ip: String,
    /// IPv6 destination (egress)
    pub ipv6_dest_cidr_ip: String,
    /// Destination security group (egress)
    pub dest_group_id: String,
    /// Description
    pub description: String,
    /// Provider rule id
    #[serde(rename = "SecurityGroupRuleId")]
    pub rule_id: String,
}
