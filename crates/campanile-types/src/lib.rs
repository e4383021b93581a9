//! # campanile-types: Core types for Campanile
//!
//! This crate contains shared types used across the Campanile engines:
//! - Entity IDs ([`ResourceId`], [`StepId`], [`NodeId`], [`EdgeId`])
//! - Access roles ([`Role`])
//! - Risk and security scales ([`RiskLevel`], [`SecurityLevel`])
//! - Authentication methods ([`AuthMethod`])
//!
//! IDs are opaque strings. Fresh IDs are minted as UUIDv4, but any unique
//! string is accepted so that reserved ids (e.g. the survey `start` node)
//! and ids restored from persisted documents round-trip unchanged.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs - opaque strings
// ============================================================================

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing id value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mints a fresh unique id (UUIDv4).
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a trusted resource (location, device, time
    /// range, or IP range).
    ResourceId
);

string_id!(
    /// Unique identifier for a step within an authentication chain.
    StepId
);

string_id!(
    /// Unique identifier for a node in a survey flow graph.
    NodeId
);

string_id!(
    /// Unique identifier for an edge in a survey flow graph.
    EdgeId
);

// ============================================================================
// Role
// ============================================================================

/// A user role. Each role owns exactly one security policy and one
/// authentication chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Student,
    Professor,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Student, Role::Professor];
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Professor => "professor",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// RiskLevel
// ============================================================================

/// Risk level of an authentication attempt, ordered from least to most
/// severe: Low < Medium < High < Critical.
///
/// The derived `Ord` follows declaration order, which is what the `gte` /
/// `lte` condition operators compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Numeric rank: Low = 0 .. Critical = 3.
    pub fn rank(self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// SecurityLevel
// ============================================================================

/// Overall security level of a role's policy. Selecting a level applies a
/// preset of session/password parameters (see `campanile-policy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecurityLevel::Low => "low",
            SecurityLevel::Medium => "medium",
            SecurityLevel::High => "high",
            SecurityLevel::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// AuthMethod
// ============================================================================

/// An authentication method usable as a chain step.
///
/// `Password` is the primary factor; the remaining methods are the MFA
/// factors offered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Password,
    Totp,
    Fido,
    Email,
    Sms,
}

impl AuthMethod {
    /// All methods, in display order.
    pub const ALL: [AuthMethod; 5] = [
        AuthMethod::Password,
        AuthMethod::Totp,
        AuthMethod::Fido,
        AuthMethod::Email,
        AuthMethod::Sms,
    ];

    /// The MFA factors (every method except the primary password).
    pub const MFA: [AuthMethod; 4] = [
        AuthMethod::Totp,
        AuthMethod::Fido,
        AuthMethod::Email,
        AuthMethod::Sms,
    ];

    /// Human-readable label for admin surfaces.
    pub fn label(self) -> &'static str {
        match self {
            AuthMethod::Password => "Password",
            AuthMethod::Totp => "TOTP",
            AuthMethod::Fido => "FIDO/WebAuthn",
            AuthMethod::Email => "Email verification",
            AuthMethod::Sms => "SMS verification",
        }
    }
}

impl Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthMethod::Password => "password",
            AuthMethod::Totp => "totp",
            AuthMethod::Fido => "fido",
            AuthMethod::Email => "email",
            AuthMethod::Sms => "sms",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Tests
// ============================================================================
