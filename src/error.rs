//! Error types for geoguard
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API.
//! Expected outcomes (no grant found, grant denies) are data, not errors:
//! only unrepresentable configuration surfaces here.

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Access resolution error: {0}")]
    Access(#[from] AccessError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Filter error: {0}")]
    Filter(#[from] CqlError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid area in {rule}: {reason}")]
    InvalidArea { rule: String, reason: String },

    #[error("Invalid CQL filter in {rule}: {reason}")]
    InvalidFilter { rule: String, reason: String },
}

/// Errors raised while turning a grant into enforceable limits.
///
/// Every variant names the workspace and layer being resolved so the
/// caller can report it without relogging.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Invalid cql filter for {workspace}:{layer}: {source}")]
    InvalidFilter {
        workspace: String,
        layer: String,
        #[source]
        source: CqlError,
    },

    #[error("Cannot apply restriction area for {workspace}:{layer} ({area}): {reason}")]
    InvalidArea {
        workspace: String,
        layer: String,
        area: String,
        reason: String,
    },

    #[error("The '{style}' style is not available on layer {layer}")]
    StyleNotAllowed { style: String, layer: String },
}

impl AccessError {
    pub fn invalid_filter(workspace: Option<&str>, layer: &str, source: CqlError) -> Self {
        Self::InvalidFilter {
            workspace: workspace.unwrap_or_default().to_string(),
            layer: layer.to_string(),
            source,
        }
    }

    pub fn invalid_area(
        workspace: Option<&str>,
        layer: &str,
        area: impl Into<String>,
        err: GeometryError,
    ) -> Self {
        Self::InvalidArea {
            workspace: workspace.unwrap_or_default().to_string(),
            layer: layer.to_string(),
            area: area.into(),
            reason: err.to_string(),
        }
    }

    pub fn style_not_allowed(style: impl Into<String>, layer: impl Into<String>) -> Self {
        Self::StyleNotAllowed {
            style: style.into(),
            layer: layer.into(),
        }
    }
}

/// Geometry parsing and projection errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Failed to parse '{text}': {reason}")]
    Parse { text: String, reason: String },

    #[error("Unsupported geometry '{text}': {reason}")]
    Unsupported { text: String, reason: String },

    #[error("Unable to merge areas: can't reproject from EPSG:{from} to EPSG:{to}")]
    Reprojection { from: u32, to: u32 },
}

/// CQL parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CqlError {
    #[error("Unexpected '{found}' at position {position}")]
    UnexpectedToken { position: usize, found: String },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("Invalid geometry literal: {0}")]
    InvalidGeometry(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for access resolution
pub type AccessResult<T> = std::result::Result<T, AccessError>;
