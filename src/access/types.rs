//! Access decision types
//!
//! Grants, visibility modes, principals and catalog references shared by the
//! resolver, the decision engine and the reference rule store.

use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tri-state authorization verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantType {
    #[serde(alias = "allow")]
    Allow,
    #[serde(alias = "limit")]
    Limit,
    #[serde(alias = "deny")]
    Deny,
}

impl GrantType {
    /// ALLOW and LIMIT both let the request through
    pub const fn is_allowed(&self) -> bool {
        matches!(self, GrantType::Allow | GrantType::Limit)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            GrantType::Allow => "ALLOW",
            GrantType::Limit => "LIMIT",
            GrantType::Deny => "DENY",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a hidden or limited resource is reported to the caller.
///
/// Variants are declared from least to most restrictive, so the derived
/// ordering is the strictness ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CatalogMode {
    #[serde(alias = "challenge")]
    Challenge,
    #[serde(alias = "mixed")]
    Mixed,
    #[serde(alias = "hide")]
    Hide,
}

impl CatalogMode {
    /// Fail-closed mode used whenever no mode was resolved
    pub const DEFAULT: CatalogMode = CatalogMode::Hide;

    /// The more restrictive of two modes; an unset mode has no opinion
    pub fn stricter(a: Option<CatalogMode>, b: Option<CatalogMode>) -> Option<CatalogMode> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// The less restrictive of two modes; an unset mode has no opinion
    pub fn lenient(a: Option<CatalogMode>, b: Option<CatalogMode>) -> Option<CatalogMode> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Per-attribute access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributeAccess {
    #[serde(alias = "none")]
    None,
    #[serde(alias = "readonly", alias = "read_only")]
    ReadOnly,
    #[serde(alias = "readwrite", alias = "read_write")]
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerAttribute {
    pub name: String,
    pub access: AttributeAccess,
}

/// One role's verdict for one (workspace, resource) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantRecord {
    pub grant: GrantType,
    pub mode: Option<CatalogMode>,
    pub allowed_area: Option<Geometry>,
    pub clip_area: Option<Geometry>,
    pub cql_read: Option<String>,
    pub cql_write: Option<String>,
    pub attributes: Vec<LayerAttribute>,
    pub default_style: Option<String>,
    pub allowed_styles: Vec<String>,
}

impl GrantRecord {
    pub fn new(grant: GrantType) -> Self {
        Self {
            grant,
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

    /// Unrestricted ALLOW
    pub fn allow_all() -> Self {
        Self::new(GrantType::Allow)
    }

    /// DENY with nothing else attached
    pub fn deny_all() -> Self {
        Self::new(GrantType::Deny)
    }

    pub fn with_grant(mut self, grant: GrantType) -> Self {
        self.grant = grant;
        self
    }

    pub fn with_mode(mut self, mode: CatalogMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_allowed_area(mut self, area: Geometry) -> Self {
        self.allowed_area = Some(area);
        self
    }

    pub fn with_clip_area(mut self, area: Geometry) -> Self {
        self.clip_area = Some(area);
        self
    }

    pub fn is_denied(&self) -> bool {
        self.grant == GrantType::Deny
    }

    pub fn has_area(&self) -> bool {
        self.allowed_area.is_some() || self.clip_area.is_some()
    }
}

/// The identity an access decision is made for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub name: String,
    pub roles: BTreeSet<String>,
    pub authenticated: bool,
}

impl Principal {
    pub fn user<I, S>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            roles: BTreeSet::new(),
            authenticated: false,
        }
    }

    pub fn has_any_role<'a>(&self, roles: impl IntoIterator<Item = &'a String>) -> bool {
        roles.into_iter().any(|r| self.roles.contains(r))
    }
}

/// Request-scoped context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    /// OGC service, e.g. `WMS`
    pub service: Option<String>,
    /// Service operation, e.g. `GetMap`
    pub request: Option<String>,
    /// Set for administrative (configuration) requests
    pub admin_request: bool,
}

impl RequestContext {
    pub fn service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Default::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            admin_request: true,
            ..Default::default()
        }
    }
}

/// Kind of a catalog resource, selecting the typed limits it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[serde(alias = "featuretype")]
    Vector,
    #[serde(alias = "coverage")]
    Raster,
    /// Cascaded WMS/WMTS layers
    #[serde(alias = "wms", alias = "wmts")]
    Tiled,
    #[serde(alias = "layergroup")]
    Group,
}

impl ResourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vector => "vector",
            ResourceKind::Raster => "raster",
            ResourceKind::Tiled => "tiled",
            ResourceKind::Group => "group",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A layer, resource or layer group being requested
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CatalogResource {
    /// `None` for global layer groups
    pub workspace: Option<String>,
    pub name: String,
    pub kind: ResourceKind,
    /// Native CRS; restriction areas are reprojected into it when known
    pub srid: Option<u32>,
}

impl CatalogResource {
    pub fn new(workspace: Option<&str>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            workspace: workspace.map(str::to_string),
            name: name.into(),
            kind,
            srid: None,
        }
    }

    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn qualified_name(&self) -> String {
        qualified(self.workspace.as_deref(), &self.name)
    }
}

/// How a layer group exposes its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    /// Members are listed on their own and through the group
    #[serde(alias = "container")]
    Plain,
    /// Rendered as one named layer; adds no restriction of its own
    #[serde(alias = "single")]
    Named,
    /// Members are reachable only through the group
    #[serde(alias = "opaque_container")]
    Opaque,
}

/// A layer group enclosing a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupMembership {
    pub workspace: Option<String>,
    pub name: String,
    pub mode: PresentationMode,
}

impl GroupMembership {
    pub fn new(workspace: Option<&str>, name: impl Into<String>, mode: PresentationMode) -> Self {
        Self {
            workspace: workspace.map(str::to_string),
            name: name.into(),
            mode,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.mode == PresentationMode::Opaque
    }

    pub fn qualified_name(&self) -> String {
        qualified(self.workspace.as_deref(), &self.name)
    }
}

pub(crate) fn qualified(workspace: Option<&str>, name: &str) -> String {
    match workspace {
        Some(ws) if !ws.is_empty() => format!("{ws}:{name}"),
        _ => name.to_string(),
    }
}
