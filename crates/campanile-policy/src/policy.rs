//! Per-role security policies and level presets.
//!
//! A policy bundles session/password parameters with MFA settings.
//! Selecting a security level applies a preset over the numeric fields
//! only; the password-character toggles and MFA settings are independent
//! and survive level changes.

use std::collections::BTreeMap;

use campanile_types::{AuthMethod, Role, SecurityLevel};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Errors produced by policy validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// MFA is required but no MFA method is enabled, which would lock
    /// every user of the role out.
    #[error("MFA is required but no MFA method is enabled")]
    MfaNoMethodEnabled,

    /// A numeric field holds a value that cannot work.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

type Result<T> = std::result::Result<T, PolicyError>;

// ============================================================================
// Security Preset
// ============================================================================

/// The numeric parameters a security level implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPreset {
    pub session_timeout_minutes: u32,
    pub idle_timeout_minutes: u32,
    pub max_login_attempts: u32,
    pub lockout_minutes: u32,
    pub password_min_length: u32,
    pub password_expiry_days: u32,
}

impl SecurityPreset {
    /// The preset for a security level.
    pub const fn for_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Low => Self {
                session_timeout_minutes: 480,
                idle_timeout_minutes: 240,
                max_login_attempts: 10,
                lockout_minutes: 15,
                password_min_length: 8,
                password_expiry_days: 180,
            },
            SecurityLevel::Medium => Self {
                session_timeout_minutes: 240,
                idle_timeout_minutes: 120,
                max_login_attempts: 5,
                lockout_minutes: 30,
                password_min_length: 10,
                password_expiry_days: 90,
            },
            SecurityLevel::High => Self {
                session_timeout_minutes: 120,
                idle_timeout_minutes: 60,
                max_login_attempts: 3,
                lockout_minutes: 60,
                password_min_length: 12,
                password_expiry_days: 60,
            },
            SecurityLevel::Critical => Self {
                session_timeout_minutes: 60,
                idle_timeout_minutes: 30,
                max_login_attempts: 3,
                lockout_minutes: 120,
                password_min_length: 14,
                password_expiry_days: 30,
            },
        }
    }
}

// ============================================================================
// Security Policy
// ============================================================================

/// The security policy for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub security_level: SecurityLevel,

    // Preset-derived; overwritten by apply_security_level.
    pub session_timeout_minutes: u32,
    pub idle_timeout_minutes: u32,
    pub max_login_attempts: u32,
    pub lockout_minutes: u32,
    pub password_min_length: u32,
    pub password_expiry_days: u32,

    // Independent of the level.
    pub require_uppercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,

    /// Whether a second factor is mandatory at login.
    pub mfa_required: bool,
    /// Per-method MFA toggle; password is the primary factor and is never
    /// listed here.
    pub mfa_enabled_methods: BTreeMap<AuthMethod, bool>,
}

impl SecurityPolicy {
    /// Creates a policy at the given level with its preset, all password
    /// character classes required, and MFA off.
    pub fn for_level(level: SecurityLevel) -> Self {
        let preset = SecurityPreset::for_level(level);
        Self {
            security_level: level,
            session_timeout_minutes: preset.session_timeout_minutes,
            idle_timeout_minutes: preset.idle_timeout_minutes,
            max_login_attempts: preset.max_login_attempts,
            lockout_minutes: preset.lockout_minutes,
            password_min_length: preset.password_min_length,
            password_expiry_days: preset.password_expiry_days,
            require_uppercase: true,
            require_numbers: true,
            require_special_chars: true,
            mfa_required: false,
            mfa_enabled_methods: AuthMethod::MFA.iter().map(|m| (*m, false)).collect(),
        }
    }

    /// The default policy for a role, mirroring the platform's shipped
    /// configuration: elevated roles start at high with MFA on, students
    /// at medium.
    pub fn default_for_role(role: Role) -> Self {
        match role {
            Role::Admin => {
                let mut p = Self::for_level(SecurityLevel::High);
                p.mfa_required = true;
                p.set_mfa_method(AuthMethod::Totp, true);
                p.set_mfa_method(AuthMethod::Fido, true);
                p
            }
            Role::Professor => {
                let mut p = Self::for_level(SecurityLevel::High);
                p.mfa_required = true;
                p.set_mfa_method(AuthMethod::Totp, true);
                p.set_mfa_method(AuthMethod::Email, true);
                p
            }
            Role::Student => {
                let mut p = Self::for_level(SecurityLevel::Medium);
                p.set_mfa_method(AuthMethod::Email, true);
                p
            }
        }
    }

    /// Switches the security level, overwriting the preset-derived numeric
    /// fields. The password-character toggles and MFA settings are left
    /// untouched.
    pub fn apply_security_level(&mut self, level: SecurityLevel) {
        let preset = SecurityPreset::for_level(level);
        self.security_level = level;
        self.session_timeout_minutes = preset.session_timeout_minutes;
        self.idle_timeout_minutes = preset.idle_timeout_minutes;
        self.max_login_attempts = preset.max_login_attempts;
        self.lockout_minutes = preset.lockout_minutes;
        self.password_min_length = preset.password_min_length;
        self.password_expiry_days = preset.password_expiry_days;
    }

    /// Enables or disables an MFA method. The password method is the
    /// primary factor and is ignored here.
    pub fn set_mfa_method(&mut self, method: AuthMethod, enabled: bool) {
        if method == AuthMethod::Password {
            warn!("password is the primary factor, not an MFA method");
            return;
        }
        self.mfa_enabled_methods.insert(method, enabled);
    }

    /// The enabled MFA methods.
    pub fn enabled_mfa_methods(&self) -> Vec<AuthMethod> {
        self.mfa_enabled_methods
            .iter()
            .filter_map(|(m, enabled)| enabled.then_some(*m))
            .collect()
    }

    /// Save-time validation. A policy that requires MFA with zero enabled
    /// methods is rejected rather than warned about, since it would lock
    /// out every user of the role.
    pub fn validate(&self) -> Result<()> {
        if self.mfa_required && self.enabled_mfa_methods().is_empty() {
            return Err(PolicyError::MfaNoMethodEnabled);
        }
        for (field, value) in [
            ("session_timeout_minutes", self.session_timeout_minutes),
            ("idle_timeout_minutes", self.idle_timeout_minutes),
            ("max_login_attempts", self.max_login_attempts),
            ("lockout_minutes", self.lockout_minutes),
            ("password_min_length", self.password_min_length),
            ("password_expiry_days", self.password_expiry_days),
        ] {
            if value == 0 {
                return Err(PolicyError::InvalidField {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.idle_timeout_minutes > self.session_timeout_minutes {
            return Err(PolicyError::InvalidField {
                field: "idle_timeout_minutes",
                reason: format!(
                    "idle timeout ({}) exceeds session timeout ({})",
                    self.idle_timeout_minutes, self.session_timeout_minutes
                ),
            });
        }
        info!(level = %self.security_level, "security policy validated");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
