//! Queue name constants shared by every component.
//!
//! These are stable string identifiers; any component may publish to or
//! consume from a queue by name without central registration beyond this
//! constant set.

/// Token-request events from producers to the token issuer.
pub const AUTH_ACTIVITY: &str = "auth-activity";

/// Registration/login activity from producers.
pub const USER_ACTIVITY: &str = "user-activity";

/// Issuance notifications from the token issuer.
pub const TOKEN_GENERATED: &str = "token-generated";

/// Classified activity events for the downstream log sink.
pub const LOGGER_ACTIVITY: &str = "logger-activity";
