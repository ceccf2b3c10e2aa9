//! Style enforcement

use crate::access::types::GrantRecord;
use crate::error::{AccessError, AccessResult};
use serde::Serialize;

/// Styles a grant lets a principal render a layer with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StylePolicy {
    pub default_style: Option<String>,
    pub allowed_styles: Vec<String>,
}

impl StylePolicy {
    /// No constraint at all
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn from_grant(grant: &GrantRecord) -> Self {
        Self {
            default_style: grant.default_style.clone(),
            allowed_styles: grant.allowed_styles.clone(),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.default_style.is_some() || !self.allowed_styles.is_empty()
    }

    /// Check a requested style against the policy.
    ///
    /// Returns the style to render with: the requested one when allowed, or
    /// the configured default when nothing was requested.
    pub fn check(&self, requested: Option<&str>, layer: &str) -> AccessResult<Option<String>> {
        let Some(style) = requested else {
            return Ok(self.default_style.clone());
        };
        if !self.is_restricted()
            || self.default_style.as_deref() == Some(style)
            || self.allowed_styles.iter().any(|s| s == style)
        {
            Ok(Some(style.to_string()))
        } else {
            Err(AccessError::style_not_allowed(style, layer))
        }
    }
}
