//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (timeouts > 0, addresses parse)
//! - Compile every rule list so a bad pattern never reaches a live resolver
//! - Detect duplicate content URIs and token values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResolverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ResolverConfig, PLACEHOLDER_API_KEY};
use crate::routing::compiler::compile;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field (e.g. `rules[2]`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ResolverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let routing = &config.routing;
    for (field, value) in [
        ("routing.cp_trigger", &routing.cp_trigger),
        ("routing.token_param", &routing.token_param),
        ("routing.action_trigger", &routing.action_trigger),
        ("routing.fallback_handler", &routing.fallback_handler),
        ("routing.fallback_param", &routing.fallback_param),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }
    for (field, value) in [
        ("routing.cp_trigger", &routing.cp_trigger),
        ("routing.private_template_trigger", &routing.private_template_trigger),
    ] {
        if value.contains('/') {
            errors.push(ValidationError::new(field, "must be a single path segment"));
        }
    }

    for (field, rules) in [("rules", &config.rules), ("cp_rules", &config.cp_rules)] {
        if let Err(e) = compile(rules.clone()) {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }

    let mut uris = HashSet::new();
    for (i, content) in config.content.iter().enumerate() {
        let field = format!("content[{}]", i);
        if content.id.trim().is_empty() {
            errors.push(ValidationError::new(&field, "id must not be empty"));
        }
        if content.handler.as_deref().is_some_and(|h| h.trim().is_empty()) {
            errors.push(ValidationError::new(&field, "handler must not be empty when set"));
        }
        let uri = content.uri.trim_matches('/').to_string();
        if !uris.insert((content.site_id, uri.clone())) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate uri '{}' for {}", uri, content.site_id),
            ));
        }
    }

    let mut tokens = HashSet::new();
    for (i, token) in config.tokens.iter().enumerate() {
        let field = format!("tokens[{}]", i);
        if token.token.is_empty() {
            errors.push(ValidationError::new(&field, "token must not be empty"));
        }
        if token.handler.trim().is_empty() {
            errors.push(ValidationError::new(&field, "handler must not be empty"));
        }
        if token.usage_limit == Some(0) {
            errors.push(ValidationError::new(&field, "usage_limit must be greater than 0"));
        }
        if !tokens.insert(token.token.as_str()) {
            errors.push(ValidationError::new(&field, "duplicate token"));
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new("admin.api_key", "must be set when admin is enabled"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address '{}'", value)));
    }
}
