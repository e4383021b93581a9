//! # Campanile
//!
//! Core engines of the Campanile campus platform:
//!
//! - **Adaptive authentication** - per-role chains of authentication
//!   steps whose applicability depends on risk and on trusted resources
//!   (locations, devices, time windows, IP ranges)
//! - **Survey flows** - directed acyclic graphs of questions with
//!   invariant-preserving edits and a validating preview runtime
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        campanile                          │
//! │            SecurityConfig · login_plan · re-exports       │
//! ├──────────────┬──────────────┬──────────────┬─────────────┤
//! │   policy     │   registry   │    survey    │    types    │
//! │ chains,      │ trusted      │ flow graph,  │ ids, roles, │
//! │ conditions,  │ resources,   │ edits,       │ scales,     │
//! │ presets      │ matching     │ preview      │ methods     │
//! └──────────────┴──────────────┴──────────────┴─────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use campanile::{AuthContext, Role, RiskLevel, SecurityConfig};
//! use chrono::Utc;
//!
//! let config = SecurityConfig::with_defaults();
//! config.validate().unwrap();
//!
//! // A risky admin login needs the full chain.
//! let ctx = AuthContext::new(RiskLevel::High, Utc::now());
//! let plan = config.login_plan(Role::Admin, &ctx).unwrap();
//! assert_eq!(plan.len(), 3);
//! ```

mod security;

pub use security::{ConfigError, DanglingReference, RoleSecurity, SecurityConfig};

// Shared types
pub use campanile_types::{
    AuthMethod, EdgeId, NodeId, ResourceId, RiskLevel, Role, SecurityLevel, StepId,
};

// Trusted resources
pub use campanile_registry::{
    Cidr, ClientContext, IpRangeMode, RegistryError, ResourceDetail, ResourceKind,
    ResourceRegistry, TrustedResource,
};

// Adaptive authentication
pub use campanile_policy::{
    evaluate_chain, AuthChain, AuthContext, AuthStep, ChainError, Condition, ConditionKind,
    MembershipOp, PolicyError, RiskOp, SecurityPolicy, SecurityPreset, StepMode, StepPatch,
};

// Survey flows
pub use campanile_survey::{
    linearize, Advance, Answer, Direction, FlowEdge, GraphError, HandleId, InsertedAtDirection,
    InsertedOnEdge, NodePatch, Position, PreviewError, PreviewSession, QuestionNode, QuestionType,
    SurveyDocument, SurveyGraph, SurveySettings,
};
