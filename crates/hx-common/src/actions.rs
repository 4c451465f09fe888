//! Static action classification registry.
//!
//! Maps raw action codes to `{category, description, default severity}` so
//! every component classifies activity the same way without sharing a
//! runtime object graph. The lookup is a pure, total function: unknown
//! codes resolve to a safe default instead of erroring, because
//! classification must never be the reason a handshake step fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification bucket for an action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    Authentication,
    Registration,
    Token,
    Validation,
    Unknown,
}

impl ActionCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCategory::Authentication => "Authentication",
            ActionCategory::Registration => "Registration",
            ActionCategory::Token => "Token",
            ActionCategory::Validation => "Validation",
            ActionCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry entry for a single action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMetadata {
    pub category: ActionCategory,
    pub description: &'static str,
    pub default_severity: Severity,
}

// Action codes emitted by the handshake steps. Components reference these
// constants rather than spelling codes inline.
pub const USER_REGISTERED: &str = "user_registered";
pub const USER_LOGGED_IN: &str = "user_logged_in";
pub const TOKEN_REQUESTED: &str = "token_requested";
pub const TOKEN_GENERATED: &str = "token_generated";
pub const TOKEN_ISSUE_SKIPPED: &str = "token_issue_skipped";
pub const USER_VALIDATED: &str = "user_validated";
pub const TOKEN_VALIDATION_FAILED: &str = "token_validation_failed";

/// Resolve an action code to its classification.
///
/// Total over all inputs; unknown codes get the `Unknown`/`Debug` default.
#[must_use]
pub fn metadata_for(action: &str) -> ActionMetadata {
    match action {
        USER_REGISTERED => ActionMetadata {
            category: ActionCategory::Registration,
            description: "User completed registration.",
            default_severity: Severity::Info,
        },
        USER_LOGGED_IN => ActionMetadata {
            category: ActionCategory::Authentication,
            description: "User logged in.",
            default_severity: Severity::Info,
        },
        TOKEN_REQUESTED => ActionMetadata {
            category: ActionCategory::Token,
            description: "Token issuance requested.",
            default_severity: Severity::Info,
        },
        TOKEN_GENERATED => ActionMetadata {
            category: ActionCategory::Token,
            description: "Signed token issued and cached.",
            default_severity: Severity::Info,
        },
        TOKEN_ISSUE_SKIPPED => ActionMetadata {
            category: ActionCategory::Token,
            description: "Token request had no staged identity; nothing issued.",
            default_severity: Severity::Warning,
        },
        USER_VALIDATED => ActionMetadata {
            category: ActionCategory::Validation,
            description: "Presented token matched the cached token.",
            default_severity: Severity::Info,
        },
        TOKEN_VALIDATION_FAILED => ActionMetadata {
            category: ActionCategory::Validation,
            description: "Presented token did not match or has expired.",
            default_severity: Severity::Warning,
        },
        _ => ActionMetadata {
            category: ActionCategory::Unknown,
            description: "Unrecognized action code.",
            default_severity: Severity::Debug,
        },
    }
}
