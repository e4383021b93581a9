//! Ordered authentication chains.
//!
//! Each role owns one chain: an ordered list of authentication steps the
//! user walks through at login. A step is either always required or applies
//! conditionally. Every mutation validates before touching state, so a
//! chain is never observable with two steps sharing a method.

use campanile_types::{AuthMethod, StepId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{Condition, ConditionKind};

/// Errors produced by chain mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Each authentication method may appear at most once per chain.
    #[error("method '{method}' is already a step in this chain")]
    DuplicateMethod { method: AuthMethod },

    /// The referenced step does not exist.
    #[error("step '{step}' not found in chain")]
    StepNotFound { step: StepId },

    /// The referenced condition index is out of range for the step.
    #[error("condition index {index} out of range (step has {len})")]
    ConditionOutOfRange { index: usize, len: usize },

    /// Conditions can only be edited on conditional steps.
    #[error("step '{step}' is required, not conditional")]
    StepNotConditional { step: StepId },
}

type Result<T> = std::result::Result<T, ChainError>;

// ============================================================================
// Auth Step
// ============================================================================

/// Whether a step always applies or only under conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    Required,
    Conditional,
}

/// One step of an authentication chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStep {
    pub id: StepId,
    pub method: AuthMethod,
    pub mode: StepMode,
    /// Admin-facing override of the method's default label.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Non-empty only meaningful when `mode == Conditional`; the step
    /// applies when **any** condition is met.
    pub conditions: Vec<Condition>,
}

impl AuthStep {
    /// Creates an always-required step for a method.
    pub fn required(method: AuthMethod) -> Self {
        Self {
            id: StepId::generate(),
            method,
            mode: StepMode::Required,
            name: None,
            description: None,
            conditions: Vec::new(),
        }
    }

    /// Creates a conditional step. An empty condition list is seeded with
    /// the default risk condition when the step is added to a chain.
    pub fn conditional(method: AuthMethod, conditions: Vec<Condition>) -> Self {
        Self {
            id: StepId::generate(),
            method,
            mode: StepMode::Conditional,
            name: None,
            description: None,
            conditions,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Partial update applied to a step by [`AuthChain::update_step`].
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepPatch {
    pub method: Option<AuthMethod>,
    pub mode: Option<StepMode>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl StepPatch {
    pub fn method(mut self, method: AuthMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn mode(mut self, mode: StepMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

// ============================================================================
// Auth Chain
// ============================================================================

/// An ordered authentication chain for one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthChain {
    steps: Vec<AuthStep>,
}

impl AuthChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step. Rejects a method already present in the chain.
    /// A conditional step with no conditions is seeded with the default
    /// risk condition ("risk at least medium").
    pub fn add_step(&mut self, mut step: AuthStep) -> Result<()> {
        if self.uses_method(step.method) {
            return Err(ChainError::DuplicateMethod {
                method: step.method,
            });
        }
        if step.mode == StepMode::Conditional && step.conditions.is_empty() {
            step.conditions.push(Condition::default_for(ConditionKind::Risk));
        }
        debug!(step = %step.id, method = %step.method, mode = ?step.mode, "adding chain step");
        self.steps.push(step);
        Ok(())
    }

    /// Builder form of [`AuthChain::add_step`].
    pub fn with_step(mut self, step: AuthStep) -> Result<Self> {
        self.add_step(step)?;
        Ok(self)
    }

    /// Removes a step by id. Removing an unknown id is a no-op.
    pub fn remove_step(&mut self, id: &StepId) -> bool {
        let before = self.steps.len();
        self.steps.retain(|s| s.id != *id);
        self.steps.len() != before
    }

    /// Applies a partial update to a step.
    ///
    /// - Changing the method re-checks the one-method-per-chain rule.
    /// - Switching to conditional mode seeds the default risk condition
    ///   when the step has none.
    /// - Switching to required mode clears the conditions.
    pub fn update_step(&mut self, id: &StepId, patch: StepPatch) -> Result<()> {
        if let Some(method) = patch.method {
            let clash = self
                .steps
                .iter()
                .any(|s| s.id != *id && s.method == method);
            if clash {
                return Err(ChainError::DuplicateMethod { method });
            }
        }

        let step = self.step_mut(id)?;
        if let Some(method) = patch.method {
            step.method = method;
        }
        if let Some(mode) = patch.mode {
            step.mode = mode;
            match mode {
                StepMode::Conditional if step.conditions.is_empty() => {
                    step.conditions.push(Condition::default_for(ConditionKind::Risk));
                }
                StepMode::Required => step.conditions.clear(),
                StepMode::Conditional => {}
            }
        }
        if let Some(name) = patch.name {
            step.name = Some(name);
        }
        if let Some(description) = patch.description {
            step.description = Some(description);
        }
        Ok(())
    }

    /// Appends a condition to a conditional step.
    pub fn add_condition(&mut self, id: &StepId, condition: Condition) -> Result<()> {
        let step = self.conditional_step_mut(id)?;
        step.conditions.push(condition);
        Ok(())
    }

    /// Replaces the condition at `index` on a conditional step.
    pub fn update_condition(&mut self, id: &StepId, index: usize, condition: Condition) -> Result<()> {
        let step = self.conditional_step_mut(id)?;
        let len = step.conditions.len();
        let slot = step
            .conditions
            .get_mut(index)
            .ok_or(ChainError::ConditionOutOfRange { index, len })?;
        *slot = condition;
        Ok(())
    }

    /// Switches the condition at `index` to another kind, resetting its
    /// operator and value to that kind's defaults.
    pub fn change_condition_kind(
        &mut self,
        id: &StepId,
        index: usize,
        kind: ConditionKind,
    ) -> Result<()> {
        let step = self.conditional_step_mut(id)?;
        let len = step.conditions.len();
        let slot = step
            .conditions
            .get_mut(index)
            .ok_or(ChainError::ConditionOutOfRange { index, len })?;
        slot.set_kind(kind);
        Ok(())
    }

    /// Removes the condition at `index` from a conditional step. A
    /// conditional step left with zero conditions never applies.
    pub fn remove_condition(&mut self, id: &StepId, index: usize) -> Result<()> {
        let step = self.conditional_step_mut(id)?;
        let len = step.conditions.len();
        if index >= len {
            return Err(ChainError::ConditionOutOfRange { index, len });
        }
        step.conditions.remove(index);
        Ok(())
    }

    /// The steps, in chain order.
    pub fn steps(&self) -> &[AuthStep] {
        &self.steps
    }

    /// Looks up a step by id.
    pub fn get(&self, id: &StepId) -> Option<&AuthStep> {
        self.steps.iter().find(|s| s.id == *id)
    }

    /// Whether a method is already used by some step.
    pub fn uses_method(&self, method: AuthMethod) -> bool {
        self.steps.iter().any(|s| s.method == method)
    }

    /// Methods not yet used by any step, in display order. Editors offer
    /// only these when adding a step.
    pub fn available_methods(&self) -> Vec<AuthMethod> {
        AuthMethod::ALL
            .into_iter()
            .filter(|m| !self.uses_method(*m))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn step_mut(&mut self, id: &StepId) -> Result<&mut AuthStep> {
        self.steps
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or_else(|| ChainError::StepNotFound { step: id.clone() })
    }

    fn conditional_step_mut(&mut self, id: &StepId) -> Result<&mut AuthStep> {
        let step = self.step_mut(id)?;
        if step.mode != StepMode::Conditional {
            return Err(ChainError::StepNotConditional { step: id.clone() });
        }
        Ok(step)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{MembershipOp, RiskOp};
    use campanile_types::{ResourceId, RiskLevel};

    fn password_totp_chain() -> (AuthChain, StepId) {
        let mut chain = AuthChain::new();
        chain.add_step(AuthStep::required(AuthMethod::Password)).unwrap();
        let totp = AuthStep::conditional(AuthMethod::Totp, vec![]);
        let totp_id = totp.id.clone();
        chain.add_step(totp).unwrap();
        (chain, totp_id)
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let (mut chain, _) = password_totp_chain();
        let err = chain
            .add_step(AuthStep::required(AuthMethod::Password))
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::DuplicateMethod {
                method: AuthMethod::Password
            }
        );
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_conditional_step_seeded_with_default_risk_condition() {
        let (chain, totp_id) = password_totp_chain();
        let step = chain.get(&totp_id).unwrap();
        assert_eq!(
            step.conditions,
            vec![Condition::Risk {
                op: RiskOp::Gte,
                level: RiskLevel::Medium
            }]
        );
    }

    #[test]
    fn test_available_methods_excludes_used() {
        let (chain, _) = password_totp_chain();
        let available = chain.available_methods();
        assert!(!available.contains(&AuthMethod::Password));
        assert!(!available.contains(&AuthMethod::Totp));
        assert!(available.contains(&AuthMethod::Fido));
        assert_eq!(available.len(), 3);
    }

    #[test]
    fn test_remove_step_is_idempotent() {
        let (mut chain, totp_id) = password_totp_chain();
        assert!(chain.remove_step(&totp_id));
        assert!(!chain.remove_step(&totp_id));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_switching_to_conditional_seeds_default() {
        let mut chain = AuthChain::new();
        let step = AuthStep::required(AuthMethod::Fido);
        let id = step.id.clone();
        chain.add_step(step).unwrap();

        chain
            .update_step(&id, StepPatch::default().mode(StepMode::Conditional))
            .unwrap();
        let step = chain.get(&id).unwrap();
        assert_eq!(step.mode, StepMode::Conditional);
        assert_eq!(step.conditions, vec![Condition::default_for(ConditionKind::Risk)]);
    }

    #[test]
    fn test_switching_to_required_clears_conditions() {
        let (mut chain, totp_id) = password_totp_chain();
        chain
            .update_step(&totp_id, StepPatch::default().mode(StepMode::Required))
            .unwrap();
        let step = chain.get(&totp_id).unwrap();
        assert_eq!(step.mode, StepMode::Required);
        assert!(step.conditions.is_empty());
    }

    #[test]
    fn test_update_step_method_checks_duplicates() {
        let (mut chain, totp_id) = password_totp_chain();
        let err = chain
            .update_step(&totp_id, StepPatch::default().method(AuthMethod::Password))
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::DuplicateMethod {
                method: AuthMethod::Password
            }
        );
        // Setting a step's own method is fine.
        chain
            .update_step(&totp_id, StepPatch::default().method(AuthMethod::Totp))
            .unwrap();
    }

    #[test]
    fn test_condition_edits() {
        let (mut chain, totp_id) = password_totp_chain();
        chain
            .add_condition(
                &totp_id,
                Condition::Location {
                    op: MembershipOp::NotIn,
                    resource: ResourceId::new("campus"),
                },
            )
            .unwrap();
        assert_eq!(chain.get(&totp_id).unwrap().conditions.len(), 2);

        // Changing kind resets to that kind's defaults.
        chain
            .change_condition_kind(&totp_id, 1, ConditionKind::Ip)
            .unwrap();
        assert_eq!(
            chain.get(&totp_id).unwrap().conditions[1],
            Condition::default_for(ConditionKind::Ip)
        );

        chain.remove_condition(&totp_id, 1).unwrap();
        assert_eq!(chain.get(&totp_id).unwrap().conditions.len(), 1);

        let err = chain.remove_condition(&totp_id, 5).unwrap_err();
        assert_eq!(err, ChainError::ConditionOutOfRange { index: 5, len: 1 });
    }

    #[test]
    fn test_condition_edits_rejected_on_required_steps() {
        let mut chain = AuthChain::new();
        let step = AuthStep::required(AuthMethod::Password);
        let id = step.id.clone();
        chain.add_step(step).unwrap();

        let err = chain
            .add_condition(&id, Condition::default_for(ConditionKind::Risk))
            .unwrap_err();
        assert_eq!(err, ChainError::StepNotConditional { step: id });
    }

    #[test]
    fn test_unknown_step_errors() {
        let mut chain = AuthChain::new();
        let ghost = StepId::new("ghost");
        assert_eq!(
            chain.update_step(&ghost, StepPatch::default()).unwrap_err(),
            ChainError::StepNotFound { step: ghost }
        );
    }

    #[test]
    fn test_chain_serde_roundtrip() {
        let (chain, _) = password_totp_chain();
        let json = serde_json::to_string(&chain).unwrap();
        let back: AuthChain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chain);
    }
}
