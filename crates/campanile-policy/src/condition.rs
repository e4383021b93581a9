//! Step applicability conditions.
//!
//! A conditional chain step carries a list of conditions; the step applies
//! when **any** of them is met. Each condition is either a risk comparison
//! or a membership test against a trusted resource by id.

use campanile_types::{ResourceId, RiskLevel};
use serde::{Deserialize, Serialize};

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator for risk conditions, over the ordinal risk scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskOp {
    /// Risk is at least the given level.
    Gte,
    /// Risk is at most the given level.
    Lte,
    /// Risk is exactly the given level.
    Eq,
}

impl RiskOp {
    /// Applies the operator to a context risk and a threshold level.
    pub fn compare(self, risk: RiskLevel, level: RiskLevel) -> bool {
        match self {
            RiskOp::Gte => risk >= level,
            RiskOp::Lte => risk <= level,
            RiskOp::Eq => risk == level,
        }
    }
}

/// Membership operator for trusted-resource conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipOp {
    /// The context belongs to the resource.
    In,
    /// The context does not belong to the resource.
    NotIn,
}

impl MembershipOp {
    /// Applies the operator to a raw membership result.
    pub fn apply(self, member: bool) -> bool {
        match self {
            MembershipOp::In => member,
            MembershipOp::NotIn => !member,
        }
    }
}

// ============================================================================
// Condition
// ============================================================================

/// The category of a condition, used by editors to switch a condition's
/// shape without losing the rest of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Risk,
    Location,
    Device,
    Time,
    Ip,
}

/// A single applicability condition on a chain step.
///
/// Membership variants reference a trusted resource by id; the referenced
/// resource is resolved against the shared registry at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Compare the context's risk level against a threshold.
    Risk { op: RiskOp, level: RiskLevel },
    /// Test membership in a trusted location.
    Location { op: MembershipOp, resource: ResourceId },
    /// Test membership in a managed device profile.
    Device { op: MembershipOp, resource: ResourceId },
    /// Test membership in a recurring time window.
    Time { op: MembershipOp, resource: ResourceId },
    /// Test membership in a trusted IP range.
    Ip { op: MembershipOp, resource: ResourceId },
}

impl Condition {
    /// The type-appropriate default for a kind.
    ///
    /// Risk defaults to "risk at least medium" - the seed condition for
    /// steps switched to conditional mode. Membership kinds default to `In`
    /// with an empty resource id the editor must fill in.
    pub fn default_for(kind: ConditionKind) -> Self {
        let unset = ResourceId::new("");
        match kind {
            ConditionKind::Risk => Condition::Risk {
                op: RiskOp::Gte,
                level: RiskLevel::Medium,
            },
            ConditionKind::Location => Condition::Location {
                op: MembershipOp::In,
                resource: unset,
            },
            ConditionKind::Device => Condition::Device {
                op: MembershipOp::In,
                resource: unset,
            },
            ConditionKind::Time => Condition::Time {
                op: MembershipOp::In,
                resource: unset,
            },
            ConditionKind::Ip => Condition::Ip {
                op: MembershipOp::In,
                resource: unset,
            },
        }
    }

    /// The category of this condition.
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Risk { .. } => ConditionKind::Risk,
            Condition::Location { .. } => ConditionKind::Location,
            Condition::Device { .. } => ConditionKind::Device,
            Condition::Time { .. } => ConditionKind::Time,
            Condition::Ip { .. } => ConditionKind::Ip,
        }
    }

    /// Switches this condition to another kind, resetting the operator and
    /// value to that kind's defaults. Setting the current kind is a no-op
    /// (the existing operator/value are kept).
    pub fn set_kind(&mut self, kind: ConditionKind) {
        if self.kind() != kind {
            *self = Condition::default_for(kind);
        }
    }

    /// The referenced trusted resource, for membership conditions.
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Condition::Risk { .. } => None,
            Condition::Location { resource, .. }
            | Condition::Device { resource, .. }
            | Condition::Time { resource, .. }
            | Condition::Ip { resource, .. } => Some(resource),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
