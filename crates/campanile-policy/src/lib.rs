//! # campanile-policy: Adaptive authentication
//!
//! Per-role adaptive authentication: ordered chains of authentication
//! steps, conditional step applicability, and security policies with
//! level presets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Login Attempt                               │
//! │  (risk level + client facts)                 │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Chain Evaluator                             │
//! │  ├─ Required steps always apply              │
//! │  ├─ Conditional steps: any condition met     │
//! │  └─ Memberships resolved via the registry    │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Login Plan                                  │
//! │  (ordered steps the user must pass)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use campanile_policy::{
//!     evaluate_chain, AuthChain, AuthContext, AuthStep, Condition, RiskOp,
//! };
//! use campanile_registry::ResourceRegistry;
//! use campanile_types::{AuthMethod, RiskLevel};
//! use chrono::Utc;
//!
//! let chain = AuthChain::new()
//!     .with_step(AuthStep::required(AuthMethod::Password))
//!     .unwrap()
//!     .with_step(AuthStep::conditional(
//!         AuthMethod::Totp,
//!         vec![Condition::Risk { op: RiskOp::Gte, level: RiskLevel::High }],
//!     ))
//!     .unwrap();
//!
//! let registry = ResourceRegistry::new();
//! let ctx = AuthContext::new(RiskLevel::High, Utc::now());
//! let plan = evaluate_chain(&chain, &registry, &ctx);
//! assert_eq!(plan.len(), 2);
//! ```

pub mod chain;
pub mod condition;
pub mod context;
pub mod evaluator;
pub mod policy;

pub use chain::{AuthChain, AuthStep, ChainError, StepMode, StepPatch};
pub use condition::{Condition, ConditionKind, MembershipOp, RiskOp};
pub use context::AuthContext;
pub use evaluator::{condition_met, evaluate_chain};
pub use policy::{PolicyError, SecurityPolicy, SecurityPreset};
