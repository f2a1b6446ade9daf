//! Rule set reconciliation
//!
//! Computes the symmetric difference between a desired and an observed rule
//! set and applies it through a [`SecurityGroupClient`]. Nothing here keeps
//! state between passes: every pass re-lists the provider and diffs again,
//! so a pass that failed half-way is repaired by the next one.
//!
//! Additions always go out before removals. Swapping an SSH source CIDR must
//! never leave a moment where neither the old nor the new rule is installed,
//! or the only route to the bastion is gone.

use lattice_common::{Error, Result};

use crate::client::SecurityGroupClient;
use crate::rule::{rules_equal, Direction, ObservedRule, Rule};

/// Mutations needed to turn an observed rule set into the desired one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDiff<O> {
    /// Desired rules missing from the provider, in desired order
    pub to_add: Vec<Rule>,
    /// Observed rules no longer desired, in observed order
    pub to_remove: Vec<O>,
}

impl<O> RuleDiff<O> {
    /// True when no provider call is needed
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the minimal add/remove sets between desired and observed rules
///
/// A rule is added when no observed rule equals it, and removed when no
/// desired rule equals it. Rules present on both sides are left alone.
/// Desired rules that equal an earlier desired rule are added once.
/// Quadratic, which is fine for the handful of rules a group holds.
pub fn reconcile<D, O>(desired: &[D], observed: &[O]) -> RuleDiff<O>
where
    D: AsRef<Rule>,
    O: AsRef<Rule> + Clone,
{
    let to_remove = observed
        .iter()
        .filter(|o| !desired.iter().any(|d| rules_equal(d.as_ref(), o.as_ref())))
        .cloned()
        .collect();

    let mut to_add: Vec<Rule> = Vec::new();
    for d in desired.iter().map(AsRef::as_ref) {
        let installed = observed.iter().any(|o| rules_equal(d, o.as_ref()));
        let queued = to_add.iter().any(|a| rules_equal(d, a));
        if !installed && !queued {
            to_add.push(d.clone());
        }
    }

    RuleDiff { to_add, to_remove }
}

/// Which observed rules a reconciliation is allowed to touch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Every rule in the group belongs to us
    All,
    /// Only rules carrying exactly this description belong to us; the group
    /// is shared and other owners' rules must survive
    Description(String),
}

impl Ownership {
    /// Whether a rule falls under this ownership
    pub fn owns(&self, rule: &Rule) -> bool {
        match self {
            Ownership::All => true,
            Ownership::Description(d) => rule.description() == Some(d.as_str()),
        }
    }
}

/// One security group and direction to reconcile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleTarget {
    /// Provider security group id
    pub group_id: String,
    /// Rule direction
    pub direction: Direction,
    /// Which observed rules may be removed
    pub ownership: Ownership,
}

impl RuleTarget {
    /// Target owning every rule of the group in one direction
    pub fn exclusive(group_id: impl Into<String>, direction: Direction) -> Self {
        Self {
            group_id: group_id.into(),
            direction,
            ownership: Ownership::All,
        }
    }

    /// Target owning only rules with the given description
    pub fn shared(
        group_id: impl Into<String>,
        direction: Direction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            direction,
            ownership: Ownership::Description(description.into()),
        }
    }
}

/// Provider calls issued by one pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Rules installed
    pub added: Vec<Rule>,
    /// Rules revoked
    pub removed: Vec<ObservedRule>,
}

impl ApplySummary {
    /// True when the pass made no provider call
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Apply a diff: every addition, then every removal
///
/// The first failing call aborts the pass and its error is returned as-is.
/// Calls that already succeeded are not undone.
pub async fn apply<C>(
    client: &C,
    group_id: &str,
    direction: Direction,
    diff: &RuleDiff<ObservedRule>,
) -> Result<ApplySummary>
where
    C: SecurityGroupClient + ?Sized,
{
    let mut summary = ApplySummary::default();

    for rule in &diff.to_add {
        client.add_rule(group_id, direction, rule).await?;
        summary.added.push(rule.clone());
    }

    for rule in &diff.to_remove {
        client.remove_rule(group_id, direction, rule).await?;
        summary.removed.push(rule.clone());
    }

    Ok(summary)
}

/// Run one full pass against a target
///
/// Desired rules are validated before anything is read from the provider.
/// Under [`Ownership::Description`], desired rules must carry that
/// description, otherwise they would never be recognized as ours on the next
/// pass and would be installed again and again.
pub async fn reconcile_target<C>(
    client: &C,
    target: &RuleTarget,
    desired: &[Rule],
) -> Result<ApplySummary>
where
    C: SecurityGroupClient + ?Sized,
{
    validate_desired(target, desired)?;

    let observed = client.list_rules(&target.group_id, target.direction).await?;
    let owned: Vec<ObservedRule> = observed
        .into_iter()
        .filter(|r| target.ownership.owns(&r.rule))
        .collect();

    let diff = reconcile(desired, &owned);
    if diff.is_empty() {
        return Ok(ApplySummary::default());
    }

    apply(client, &target.group_id, target.direction, &diff).await
}

fn validate_desired(target: &RuleTarget, desired: &[Rule]) -> Result<()> {
    for (i, rule) in desired.iter().enumerate() {
        rule.validate_for(target.direction).map_err(|e| e.with_target(&target.group_id))?;
        if !target.ownership.owns(rule) {
            return Err(Error::validation_for_field(
                &target.group_id,
                format!("{}[{}].description", target.direction, i),
                format!("rule '{}' is not owned by this reconciler", rule),
            ));
        }
    }
    Ok(())
}
