//! Configuration types for geoguard
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access::{CatalogMode, GrantType, LayerAttribute, PresentationMode, ResourceKind};
use crate::geometry::WGS84;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Decision engine settings
    pub access: AccessConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Data rules served by the built-in rule store
    pub rules: Vec<RuleConfig>,

    /// Workspace administration rules
    pub admin_rules: Vec<AdminRuleConfig>,

    /// Catalog layout used for containment discovery
    pub catalog: CatalogConfig,
}

/// Decision engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Roles granting full administrator rights
    pub admin_roles: Vec<String>,

    /// Let every authenticated user write to workspaces
    pub grant_write_to_workspaces_to_authenticated_users: bool,

    /// Services for which direct access looks up enclosing layer groups.
    /// Empty means every service.
    pub containment_services: Vec<String>,

    /// CRS of rule areas written without an `SRID=` prefix
    pub default_srid: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            admin_roles: vec!["ROLE_ADMINISTRATOR".to_string(), "ADMIN".to_string()],
            grant_write_to_workspaces_to_authenticated_users: false,
            containment_services: Vec::new(),
            default_srid: WGS84,
        }
    }
}

/// A data rule. Unset matchers match anything.
///
/// Rules are evaluated by ascending priority; the first matching rule
/// decides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub priority: i64,
    pub user: Option<String>,
    pub role: Option<String>,
    pub service: Option<String>,
    pub request: Option<String>,
    /// Use `""` to target global layer groups
    pub workspace: Option<String>,
    pub layer: Option<String>,

    pub grant: GrantType,
    pub mode: Option<CatalogMode>,

    /// EWKT polygon(s) features must intersect
    pub allowed_area: Option<String>,
    /// EWKT polygon(s) results are clipped to
    pub clip_area: Option<String>,

    pub cql_read: Option<String>,
    pub cql_write: Option<String>,
    pub attributes: Vec<LayerAttribute>,

    pub default_style: Option<String>,
    pub allowed_styles: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            priority: 0,
            user: None,
            role: None,
            service: None,
            request: None,
            workspace: None,
            layer: None,
            grant: GrantType::Deny,
            mode: None,
            allowed_area: None,
            clip_area: None,
            cql_read: None,
            cql_write: None,
            attributes: Vec::new(),
            default_style: None,
            allowed_styles: Vec::new(),
        }
    }
}

/// Workspace administration rule
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminRuleConfig {
    pub priority: i64,
    pub user: Option<String>,
    pub role: Option<String>,
    pub workspace: Option<String>,
    /// `false` grants plain user access
    pub admin: bool,
}

/// Catalog layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub layers: Vec<LayerConfig>,
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    pub workspace: String,
    pub name: String,
    #[serde(default = "default_layer_kind")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub srid: Option<u32>,
}

fn default_layer_kind() -> ResourceKind {
    ResourceKind::Vector
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Unset for global groups
    #[serde(default)]
    pub workspace: Option<String>,
    pub name: String,
    #[serde(default = "default_group_mode")]
    pub mode: PresentationMode,
    /// Layer or group references, `"ws:name"` or `"name"`
    #[serde(default)]
    pub members: Vec<String>,
}

fn default_group_mode() -> PresentationMode {
    PresentationMode::Plain
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
