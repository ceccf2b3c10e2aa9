//! Collaborator contracts consumed by the decision engine
//!
//! Grant lookups and containment discovery are network or cache bound in a
//! real deployment, so both traits are async. Implementations bound their own
//! latency; the engine neither retries nor times out.

use crate::access::types::{CatalogResource, GrantRecord, GroupMembership, Principal, RequestContext};
use crate::catalog::AccessSummary;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;

/// Parameters of a single grant lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantRequest {
    pub user: Option<String>,
    pub roles: BTreeSet<String>,
    pub service: Option<String>,
    pub request: Option<String>,
    pub workspace: Option<String>,
    pub layer: String,
}

impl GrantRequest {
    /// Lookup for a principal on a named resource
    pub fn new(
        principal: &Principal,
        context: &RequestContext,
        workspace: Option<&str>,
        layer: impl Into<String>,
    ) -> Self {
        Self {
            user: principal.authenticated.then(|| principal.name.clone()),
            roles: principal.roles.clone(),
            service: context.service.clone(),
            request: context.request.clone(),
            workspace: workspace.map(str::to_string),
            layer: layer.into(),
        }
    }

    /// Same lookup narrowed to one role. The user is kept, so user-bound
    /// rules still apply to every role of the principal.
    pub fn for_role(&self, role: &str) -> Self {
        Self {
            roles: BTreeSet::from([role.to_string()]),
            ..self.clone()
        }
    }

    /// Same lookup retargeted at another resource
    pub fn for_resource(&self, workspace: Option<&str>, layer: &str) -> Self {
        Self {
            workspace: workspace.map(str::to_string),
            layer: layer.to_string(),
            ..self.clone()
        }
    }
}

/// Source of grant records and per-principal visibility summaries
#[async_trait]
pub trait GrantProvider: Send + Sync {
    /// Resolve one grant. `None` means the provider could not answer; the
    /// engine treats that as DENY. A provider with no applicable rule should
    /// answer with a DENY record instead.
    async fn grant(&self, request: &GrantRequest) -> Option<GrantRecord>;

    /// Aggregate visibility for a principal, `None` when unavailable
    async fn access_summary(&self, principal: &Principal) -> Option<AccessSummary>;
}

/// Discovers the layer groups that expose a resource
#[async_trait]
pub trait ContainmentIndex: Send + Sync {
    /// Groups containing `resource` directly or through nested groups
    async fn containers_of(&self, resource: &CatalogResource) -> Vec<GroupMembership>;
}
