//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Check client routes compile and do not collide
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: HydrateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::admin::STATUS_PATH;
use crate::config::schema::HydrateConfig;
use crate::routing::PathPattern;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("bundler.service_url: `{0}` is not an http(s) URL")]
    InvalidServiceUrl(String),

    #[error("bundler.executable must not be empty")]
    EmptyExecutable,

    #[error("client route `{path}`: {reason}")]
    InvalidClientRoute { path: String, reason: String },

    #[error("client route `{0}` is declared more than once")]
    DuplicateClientRoute(String),

    #[error("client route `{0}` is reserved for the status endpoint")]
    ReservedClientRoute(String),
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &HydrateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.listener.max_in_flight == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_in_flight",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }
    if config.bundler.build_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "bundler.build_timeout_secs",
        });
    }
    if config.bundler.executable.trim().is_empty() {
        errors.push(ValidationError::EmptyExecutable);
    }

    if let Some(raw) = &config.bundler.service_url {
        let ok = Url::parse(raw)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !ok {
            errors.push(ValidationError::InvalidServiceUrl(raw.clone()));
        }
    }

    let mut seen = HashSet::new();
    for route in &config.client_routes {
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateClientRoute(route.path.clone()));
        }
        if route.path == STATUS_PATH {
            errors.push(ValidationError::ReservedClientRoute(route.path.clone()));
        }

        let invalid = |reason: String| ValidationError::InvalidClientRoute {
            path: route.path.clone(),
            reason,
        };

        if let Err(e) = PathPattern::parse(&route.path) {
            errors.push(invalid(e.to_string()));
        }
        if route.components.is_empty() {
            errors.push(invalid("no components declared".to_string()));
        }
        for component in &route.components {
            if component.mount_id.trim().is_empty() {
                errors.push(invalid(format!(
                    "component `{}` has an empty mount_id",
                    component.source_path.display()
                )));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
