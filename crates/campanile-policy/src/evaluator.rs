//! Chain evaluation.
//!
//! Pure function from (chain, registry, context) to the ordered list of
//! steps the user must pass. Required steps always apply; a conditional
//! step applies when **any** of its conditions is met.

use campanile_registry::{ResourceKind, ResourceRegistry};
use campanile_types::ResourceId;
use tracing::warn;

use crate::chain::{AuthChain, AuthStep, StepMode};
use crate::condition::Condition;
use crate::context::AuthContext;

/// Evaluates a chain against a context, returning the applicable steps in
/// chain order.
pub fn evaluate_chain<'a>(
    chain: &'a AuthChain,
    registry: &ResourceRegistry,
    ctx: &AuthContext,
) -> Vec<&'a AuthStep> {
    chain
        .steps()
        .iter()
        .filter(|step| match step.mode {
            StepMode::Required => true,
            StepMode::Conditional => step
                .conditions
                .iter()
                .any(|cond| condition_met(cond, registry, ctx)),
        })
        .collect()
}

/// Whether a single condition holds for the context.
///
/// A membership condition whose resource id is missing from the registry
/// (or resolves to a resource of the wrong kind) is treated as
/// non-membership: `In` fails, `NotIn` holds. Dangling references are
/// logged so admins can repair them.
pub fn condition_met(cond: &Condition, registry: &ResourceRegistry, ctx: &AuthContext) -> bool {
    match cond {
        Condition::Risk { op, level } => op.compare(ctx.risk, *level),
        Condition::Location { op, resource } => {
            op.apply(resolve_membership(registry, resource, ResourceKind::Location, ctx))
        }
        Condition::Device { op, resource } => {
            op.apply(resolve_membership(registry, resource, ResourceKind::Device, ctx))
        }
        Condition::Time { op, resource } => {
            op.apply(resolve_membership(registry, resource, ResourceKind::TimeRange, ctx))
        }
        Condition::Ip { op, resource } => {
            op.apply(resolve_membership(registry, resource, ResourceKind::IpRange, ctx))
        }
    }
}

fn resolve_membership(
    registry: &ResourceRegistry,
    id: &ResourceId,
    expected: ResourceKind,
    ctx: &AuthContext,
) -> bool {
    match registry.get(id) {
        Some(resource) if resource.kind() == expected => resource.matches(&ctx.client),
        Some(resource) => {
            warn!(
                resource = %id,
                expected = %expected,
                actual = %resource.kind(),
                "condition references a resource of the wrong kind"
            );
            false
        }
        None => {
            warn!(resource = %id, "condition references a missing resource");
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AuthStep;
    use crate::condition::{MembershipOp, RiskOp};
    use campanile_registry::IpRangeMode;
    use campanile_types::{AuthMethod, RiskLevel};
    use chrono::{TimeZone, Utc};

    fn ctx(risk: RiskLevel) -> AuthContext {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        AuthContext::new(risk, ts)
    }

    fn methods(steps: &[&AuthStep]) -> Vec<AuthMethod> {
        steps.iter().map(|s| s.method).collect()
    }

    #[test]
    fn test_required_password_conditional_totp_on_high_risk() {
        let chain = AuthChain::new()
            .with_step(AuthStep::required(AuthMethod::Password))
            .unwrap()
            .with_step(AuthStep::conditional(
                AuthMethod::Totp,
                vec![Condition::Risk {
                    op: RiskOp::Gte,
                    level: RiskLevel::High,
                }],
            ))
            .unwrap();
        let registry = ResourceRegistry::new();

        let low = evaluate_chain(&chain, &registry, &ctx(RiskLevel::Low));
        assert_eq!(methods(&low), vec![AuthMethod::Password]);

        let high = evaluate_chain(&chain, &registry, &ctx(RiskLevel::High));
        assert_eq!(methods(&high), vec![AuthMethod::Password, AuthMethod::Totp]);

        let critical = evaluate_chain(&chain, &registry, &ctx(RiskLevel::Critical));
        assert_eq!(
            methods(&critical),
            vec![AuthMethod::Password, AuthMethod::Totp]
        );
    }

    #[test]
    fn test_any_condition_suffices() {
        let mut registry = ResourceRegistry::new();
        let vpn = registry
            .add_ip_range("VPN", "", "172.16.0.0/12", IpRangeMode::Whitelist)
            .unwrap();

        let chain = AuthChain::new()
            .with_step(AuthStep::conditional(
                AuthMethod::Sms,
                vec![
                    Condition::Risk {
                        op: RiskOp::Gte,
                        level: RiskLevel::Critical,
                    },
                    Condition::Ip {
                        op: MembershipOp::NotIn,
                        resource: vpn,
                    },
                ],
            ))
            .unwrap();

        // Low risk but off-VPN: the second condition fires.
        let off_vpn = ctx(RiskLevel::Low).with_ip("203.0.113.9".parse().unwrap());
        assert_eq!(evaluate_chain(&chain, &registry, &off_vpn).len(), 1);

        // Low risk on the VPN: neither fires.
        let on_vpn = ctx(RiskLevel::Low).with_ip("172.20.0.1".parse().unwrap());
        assert!(evaluate_chain(&chain, &registry, &on_vpn).is_empty());
    }

    #[test]
    fn test_dangling_resource_is_non_membership() {
        let registry = ResourceRegistry::new();
        let ghost = ResourceId::new("removed");

        let in_cond = Condition::Location {
            op: MembershipOp::In,
            resource: ghost.clone(),
        };
        let not_in_cond = Condition::Location {
            op: MembershipOp::NotIn,
            resource: ghost,
        };

        let c = ctx(RiskLevel::Low).with_country("DE");
        assert!(!condition_met(&in_cond, &registry, &c));
        assert!(condition_met(&not_in_cond, &registry, &c));
    }

    #[test]
    fn test_wrong_kind_resource_is_non_membership() {
        let mut registry = ResourceRegistry::new();
        let device = registry
            .add_device("Laptops", "", "laptop", "")
            .unwrap();

        // A location condition pointing at a device resource.
        let cond = Condition::Location {
            op: MembershipOp::In,
            resource: device,
        };
        let c = ctx(RiskLevel::Low).with_device("laptop", "14.1");
        assert!(!condition_met(&cond, &registry, &c));
    }

    #[test]
    fn test_conditional_step_with_no_conditions_never_applies() {
        // Possible after removing every condition from a step.
        let mut chain = AuthChain::new();
        chain
            .add_step(AuthStep::conditional(AuthMethod::Email, vec![]))
            .unwrap();
        let step_id = chain.steps()[0].id.clone();
        chain.remove_condition(&step_id, 0).unwrap();

        let registry = ResourceRegistry::new();
        assert!(evaluate_chain(&chain, &registry, &ctx(RiskLevel::Critical)).is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let chain = AuthChain::new()
            .with_step(AuthStep::required(AuthMethod::Password))
            .unwrap()
            .with_step(AuthStep::required(AuthMethod::Fido))
            .unwrap()
            .with_step(AuthStep::required(AuthMethod::Email))
            .unwrap();
        let registry = ResourceRegistry::new();
        assert_eq!(
            methods(&evaluate_chain(&chain, &registry, &ctx(RiskLevel::Low))),
            vec![AuthMethod::Password, AuthMethod::Fido, AuthMethod::Email]
        );
    }
}
