//! The per-tenant security configuration document.
//!
//! One document holds, for every role, its security policy and its
//! authentication chain, plus the trusted-resource registry those chains
//! reference. This is the unit an admin edits and saves.

use std::collections::BTreeMap;

use campanile_policy::{
    evaluate_chain, AuthChain, AuthContext, AuthStep, Condition, PolicyError, RiskOp,
    SecurityPolicy,
};
use campanile_registry::ResourceRegistry;
use campanile_types::{AuthMethod, ResourceId, RiskLevel, Role, StepId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Errors produced by configuration-level operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The document carries no entry for the role.
    #[error("role '{role}' is not configured")]
    RoleNotConfigured { role: Role },

    /// A role's policy failed save-time validation.
    #[error("policy for role '{role}' is invalid")]
    Policy {
        role: Role,
        #[source]
        source: PolicyError,
    },
}

type Result<T> = std::result::Result<T, ConfigError>;

/// A condition pointing at a resource the registry no longer holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub role: Role,
    pub step: StepId,
    pub resource: ResourceId,
}

/// One role's security settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSecurity {
    pub policy: SecurityPolicy,
    pub chain: AuthChain,
}

// ============================================================================
// Security Config
// ============================================================================

/// The security configuration for one tenant: every role's policy and
/// chain, plus the shared trusted-resource registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub roles: BTreeMap<Role, RoleSecurity>,
    pub registry: ResourceRegistry,
}

impl SecurityConfig {
    /// The shipped configuration: every role gets its default policy and
    /// a password-first chain with role-appropriate MFA escalation, over
    /// an empty registry.
    pub fn with_defaults() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| {
                (
                    role,
                    RoleSecurity {
                        policy: SecurityPolicy::default_for_role(role),
                        chain: default_chain(role),
                    },
                )
            })
            .collect();
        Self {
            roles,
            registry: ResourceRegistry::new(),
        }
    }

    /// One role's settings.
    pub fn role(&self, role: Role) -> Result<&RoleSecurity> {
        self.roles
            .get(&role)
            .ok_or(ConfigError::RoleNotConfigured { role })
    }

    /// Mutable access to one role's settings.
    pub fn role_mut(&mut self, role: Role) -> Result<&mut RoleSecurity> {
        self.roles
            .get_mut(&role)
            .ok_or(ConfigError::RoleNotConfigured { role })
    }

    /// Save-time validation: every role's policy must validate. Dangling
    /// resource references do not fail the save (removal never cascades)
    /// but are logged; fetch them via
    /// [`SecurityConfig::dangling_references`] to surface in the UI.
    pub fn validate(&self) -> Result<()> {
        for (role, security) in &self.roles {
            security
                .policy
                .validate()
                .map_err(|source| ConfigError::Policy {
                    role: *role,
                    source,
                })?;
        }
        for dangling in self.dangling_references() {
            warn!(
                role = %dangling.role,
                step = %dangling.step,
                resource = %dangling.resource,
                "condition references a missing resource"
            );
        }
        info!(roles = self.roles.len(), "security configuration validated");
        Ok(())
    }

    /// Every condition across all chains whose resource id is missing
    /// from the registry.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for (role, security) in &self.roles {
            for step in security.chain.steps() {
                for condition in &step.conditions {
                    if let Some(resource) = condition.resource() {
                        if !self.registry.contains(resource) {
                            dangling.push(DanglingReference {
                                role: *role,
                                step: step.id.clone(),
                                resource: resource.clone(),
                            });
                        }
                    }
                }
            }
        }
        dangling
    }

    /// Evaluates a role's chain against a login context: the ordered
    /// methods the user must pass.
    pub fn login_plan(&self, role: Role, ctx: &AuthContext) -> Result<Vec<AuthMethod>> {
        let security = self.role(role)?;
        let plan = evaluate_chain(&security.chain, &self.registry, ctx)
            .into_iter()
            .map(|step| step.method)
            .collect();
        Ok(plan)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The shipped chain per role: password first, then role-appropriate MFA.
/// These cannot fail: each method appears once per chain.
fn default_chain(role: Role) -> AuthChain {
    let risk_gte = |level: RiskLevel| Condition::Risk {
        op: RiskOp::Gte,
        level,
    };
    let result = match role {
        Role::Admin => AuthChain::new()
            .with_step(AuthStep::required(AuthMethod::Password))
            .and_then(|c| c.with_step(AuthStep::required(AuthMethod::Totp)))
            .and_then(|c| {
                c.with_step(AuthStep::conditional(
                    AuthMethod::Fido,
                    vec![risk_gte(RiskLevel::High)],
                ))
            }),
        Role::Professor => AuthChain::new()
            .with_step(AuthStep::required(AuthMethod::Password))
            .and_then(|c| {
                c.with_step(AuthStep::conditional(
                    AuthMethod::Totp,
                    vec![risk_gte(RiskLevel::Medium)],
                ))
            }),
        Role::Student => AuthChain::new()
            .with_step(AuthStep::required(AuthMethod::Password))
            .and_then(|c| {
                c.with_step(AuthStep::conditional(
                    AuthMethod::Email,
                    vec![risk_gte(RiskLevel::High)],
                ))
            }),
    };
    result.unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use campanile_policy::{MembershipOp, StepMode, StepPatch};
    use chrono::{TimeZone, Utc};

    fn ctx(risk: RiskLevel) -> AuthContext {
        AuthContext::new(risk, Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_defaults_cover_every_role_and_validate() {
        let config = SecurityConfig::with_defaults();
        assert_eq!(config.roles.len(), Role::ALL.len());
        config.validate().unwrap();
        assert!(config.dangling_references().is_empty());
    }

    #[test]
    fn test_login_plan_scales_with_risk() {
        let config = SecurityConfig::with_defaults();

        let calm = config.login_plan(Role::Admin, &ctx(RiskLevel::Low)).unwrap();
        assert_eq!(calm, vec![AuthMethod::Password, AuthMethod::Totp]);

        let risky = config.login_plan(Role::Admin, &ctx(RiskLevel::High)).unwrap();
        assert_eq!(
            risky,
            vec![AuthMethod::Password, AuthMethod::Totp, AuthMethod::Fido]
        );

        let student = config
            .login_plan(Role::Student, &ctx(RiskLevel::Low))
            .unwrap();
        assert_eq!(student, vec![AuthMethod::Password]);
    }

    #[test]
    fn test_invalid_policy_fails_validation_with_role() {
        let mut config = SecurityConfig::with_defaults();
        let student = config.role_mut(Role::Student).unwrap();
        student.policy.mfa_required = true;
        for method in AuthMethod::MFA {
            student.policy.set_mfa_method(method, false);
        }

        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::Policy {
                role: Role::Student,
                source: PolicyError::MfaNoMethodEnabled
            }
        );
    }

    #[test]
    fn test_dangling_references_found_after_resource_removal() {
        let mut config = SecurityConfig::with_defaults();
        let campus = config
            .registry
            .add_location("Campus", "", "DE", "Munich", &[])
            .unwrap();

        // Point a professor condition at the campus, then remove it.
        let step_id = {
            let professor = config.role_mut(Role::Professor).unwrap();
            let step_id = professor
                .chain
                .steps()
                .iter()
                .find(|s| s.mode == StepMode::Conditional)
                .map(|s| s.id.clone())
                .unwrap();
            professor
                .chain
                .add_condition(
                    &step_id,
                    Condition::Location {
                        op: MembershipOp::NotIn,
                        resource: campus.clone(),
                    },
                )
                .unwrap();
            step_id
        };
        assert!(config.dangling_references().is_empty());

        config.registry.remove(&campus);
        let dangling = config.dangling_references();
        assert_eq!(
            dangling,
            vec![DanglingReference {
                role: Role::Professor,
                step: step_id,
                resource: campus
            }]
        );
        // Danglers do not fail the save.
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_role_errors() {
        let config = SecurityConfig {
            roles: BTreeMap::new(),
            registry: ResourceRegistry::new(),
        };
        assert_eq!(
            config.login_plan(Role::Admin, &ctx(RiskLevel::Low)).unwrap_err(),
            ConfigError::RoleNotConfigured { role: Role::Admin }
        );
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = SecurityConfig::with_defaults();
        config
            .registry
            .add_device("Laptops", "", "laptop", "14.")
            .unwrap();
        let admin = config.role_mut(Role::Admin).unwrap();
        let first = admin.chain.steps()[0].id.clone();
        admin
            .chain
            .update_step(&first, StepPatch::default().name("Primary password"))
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let back: SecurityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_default_chains_have_no_duplicate_methods() {
        let config = SecurityConfig::with_defaults();
        for security in config.roles.values() {
            let methods: Vec<AuthMethod> =
                security.chain.steps().iter().map(|s| s.method).collect();
            let mut dedup = methods.clone();
            dedup.dedup();
            assert_eq!(methods, dedup);
            assert!(!security.chain.is_empty());
        }
    }
}
