//! Configuration validation.
//!
//! Validates the resolved context before the bot starts talking to anyone.

use super::Context;
use super::defaults::PLACEHOLDER_SERVER;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("default/example server detected ({0}), refusing to run")]
    PlaceholderServer(String),
    #[error("server is required")]
    MissingServer,
    #[error("poll interval must be at least one second")]
    ZeroPoll,
    #[error("identity name is empty")]
    MissingName,
}

/// Whether `server` is the shipped example value.
pub fn is_placeholder_server(server: &str) -> bool {
    server.eq_ignore_ascii_case(PLACEHOLDER_SERVER)
}

/// Validate a context for bot mode, returning all errors found.
pub fn validate(ctx: &Context) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if ctx.server.trim().is_empty() {
        errors.push(ValidationError::MissingServer);
    } else if is_placeholder_server(&ctx.server) {
        errors.push(ValidationError::PlaceholderServer(ctx.server.clone()));
    }
    if ctx.poll.is_zero() {
        errors.push(ValidationError::ZeroPoll);
    }
    if ctx.name.trim().is_empty() {
        errors.push(ValidationError::MissingName);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
