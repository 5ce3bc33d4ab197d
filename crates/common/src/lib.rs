//! Common types and interfaces shared across Huddle components.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for common data types
pub mod types;

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for the session-provider, render-target and device interfaces
pub mod provider;

/// Module for tracing subscriber setup
pub mod observability;
