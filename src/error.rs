//! Error types.
//!
//! Hook failures are never swallowed: they end the failing task's `perform`
//! and stall its outlet queue, and the queue keeps the error as its fault.

use thiserror::Error;

/// Failure reported by a consumer-supplied component hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure while driving a render task through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("`{hook}` hook of component `{component_name}` (route `{route_name}`) failed: {source}")]
    Hook {
        component_name: String,
        route_name: String,
        hook: &'static str,
        #[source]
        source: HookError,
    },

    #[error("render task `{component_name}` (route `{route_name}`) was dropped while waiting for {waiting_for}")]
    Abandoned {
        component_name: String,
        route_name: String,
        waiting_for: &'static str,
    },
}

/// Failure raised by the route integration layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route has no action named `{0}`")]
    UnknownAction(String),
}

/// Failure loading a [`RouterConfig`](crate::config::RouterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid router configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("`{field}` must not be empty")]
    Empty { field: &'static str },
}
