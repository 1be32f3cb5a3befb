//! Route-list validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate method names against the registrable set
//! - Check path shape before the router sees it (axum panics on bad paths)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: &[RouteDescriptor] → Result<(), ValidationErrors>
//! - Runs before descriptors are accepted into the system, whether they
//!   came from a config file or were passed pre-parsed

use std::fmt;

use thiserror::Error;

use crate::config::schema::{RouteDescriptor, RouteMethod};

/// A single semantic problem with a route descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("route `{name}`: unknown method `{method}`")]
    UnknownMethod { name: String, method: String },

    #[error("route `{name}`: path `{path}` must start with '/'")]
    PathNotRooted { name: String, path: String },

    #[error("route at index {index} has an empty name")]
    EmptyName { index: usize },
}

/// All problems found in a route list, reported together.
#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate every descriptor, collecting all errors before returning.
pub fn validate_descriptors(routes: &[RouteDescriptor]) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    for (index, route) in routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { index });
        }

        if let Some(method) = &route.method {
            if RouteMethod::parse(method).is_none() {
                errors.push(ValidationError::UnknownMethod {
                    name: route.name.clone(),
                    method: method.clone(),
                });
            }
        }

        let path = route.path.value();
        if !path.starts_with('/') {
            errors.push(ValidationError::PathNotRooted {
                name: route.name.clone(),
                path: path.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}
