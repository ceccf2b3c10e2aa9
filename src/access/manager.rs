//! Access-decision engine
//!
//! Entry point for every access question: typed limits for a resource,
//! workspace limits, catalog security filters and style checks. The manager
//! is constructed once with its collaborators and shared by handle; it holds
//! no mutable state, so concurrent decisions are independent.

use crate::access::limits::{AccessLimits, WorkspaceLimits, build_limits};
use crate::access::provider::{ContainmentIndex, GrantProvider, GrantRequest};
use crate::access::restriction::{MergedRestriction, ResolutionPath, RestrictionResolver};
use crate::access::style::StylePolicy;
use crate::access::types::{
    CatalogMode, CatalogResource, GrantRecord, GrantType, GroupMembership, PresentationMode,
    Principal, RequestContext, ResourceKind,
};
use crate::catalog::{AccessSummary, CatalogType, build_security_filter};
use crate::config::AccessConfig;
use crate::error::{AccessError, AccessResult};
use crate::filter::Filter;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Resolves access decisions against a grant provider and a containment index
pub struct AccessManager {
    provider: Arc<dyn GrantProvider>,
    containment: Arc<dyn ContainmentIndex>,
    config: AccessConfig,
}

impl AccessManager {
    pub fn new(
        provider: Arc<dyn GrantProvider>,
        containment: Arc<dyn ContainmentIndex>,
        config: AccessConfig,
    ) -> Self {
        Self {
            provider,
            containment,
            config,
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Authenticated and holding one of the configured administrator roles
    pub fn is_admin(&self, principal: &Principal) -> bool {
        principal.authenticated && principal.has_any_role(&self.config.admin_roles)
    }

    /// Typed access limits of `principal` over `resource`.
    ///
    /// `containers` lists the groups the resource is requested through; an
    /// empty slice means direct access.
    pub async fn access_limits(
        &self,
        principal: &Principal,
        resource: &CatalogResource,
        containers: &[GroupMembership],
        context: &RequestContext,
    ) -> AccessResult<AccessLimits> {
        debug!(
            user = %principal.name,
            resource = %resource.qualified_name(),
            kind = %resource.kind,
            containers = containers.len(),
            service = ?context.service,
            "Checking access"
        );

        if self.is_admin(principal) {
            debug!(resource = %resource.qualified_name(), "Admin level access, returning full rights");
            return build_limits(resource, &GrantRecord::allow_all(), None);
        }

        let (grant, merged) = if context.admin_request
            && self
                .is_workspace_admin(principal, resource.workspace.as_deref())
                .await
        {
            trace!("Administrative request by workspace admin");
            (GrantRecord::allow_all(), None)
        } else {
            self.resolve_grant(principal, resource, containers, context).await?
        };

        let limits = build_limits(resource, &grant, merged.as_ref())?;
        debug!(
            user = %principal.name,
            resource = %resource.qualified_name(),
            grant = %grant.grant,
            mode = ?limits.mode(),
            "Access limits resolved"
        );
        Ok(limits)
    }

    async fn resolve_grant(
        &self,
        principal: &Principal,
        resource: &CatalogResource,
        containers: &[GroupMembership],
        context: &RequestContext,
    ) -> AccessResult<(GrantRecord, Option<MergedRestriction>)> {
        let request = GrantRequest::new(
            principal,
            context,
            resource.workspace.as_deref(),
            resource.name.as_str(),
        );
        let grant = self.base_grant(&request).await;

        if !containers.is_empty() {
            let merged = self
                .resolve_containers(&request, resource, containers, ResolutionPath::GroupContext)
                .await?;
            return Ok((grant, merged));
        }

        if !self.discovers_containment(context) {
            return Ok((grant, None));
        }

        let found = self.containment.containers_of(resource).await;
        if found.is_empty() {
            return Ok((grant, None));
        }
        if found.iter().all(GroupMembership::is_opaque) {
            debug!(
                resource = %resource.qualified_name(),
                "Only reachable through opaque groups, denying direct access"
            );
            return Ok((grant.with_grant(GrantType::Deny), None));
        }
        if found.iter().any(|g| g.mode == PresentationMode::Named) {
            trace!("Enclosed by a named group, container limits not applied");
            return Ok((grant, None));
        }

        let merged = self
            .resolve_containers(&request, resource, &found, ResolutionPath::DirectAccess)
            .await?;
        Ok((grant, merged))
    }

    /// The principal's grant; an unavailable answer becomes DENY
    async fn base_grant(&self, request: &GrantRequest) -> GrantRecord {
        match self.provider.grant(request).await {
            Some(grant) => grant,
            None => {
                warn!(
                    user = ?request.user,
                    workspace = ?request.workspace,
                    layer = %request.layer,
                    "Grant unavailable, denying access"
                );
                GrantRecord::deny_all()
            }
        }
    }

    async fn resolve_containers(
        &self,
        request: &GrantRequest,
        resource: &CatalogResource,
        groups: &[GroupMembership],
        path: ResolutionPath,
    ) -> AccessResult<Option<MergedRestriction>> {
        // Group limits carry no areas, so there is nothing to merge into
        if resource.kind == ResourceKind::Group {
            trace!(resource = %resource.qualified_name(), "Skipping container areas for a group");
            return Ok(None);
        }

        RestrictionResolver::new(self.provider.as_ref())
            .resolve(request, groups, path)
            .await
            .map_err(|e| {
                AccessError::invalid_area(
                    resource.workspace.as_deref(),
                    &resource.name,
                    "container restriction",
                    e,
                )
            })
    }

    fn discovers_containment(&self, context: &RequestContext) -> bool {
        let services = &self.config.containment_services;
        services.is_empty()
            || context
                .service
                .as_deref()
                .is_some_and(|s| services.iter().any(|c| c.eq_ignore_ascii_case(s)))
    }

    async fn summary(&self, principal: &Principal) -> Option<AccessSummary> {
        let summary = self.provider.access_summary(principal).await;
        if summary.is_none() {
            warn!(user = %principal.name, "Access summary unavailable");
        }
        summary
    }

    async fn is_workspace_admin(&self, principal: &Principal, workspace: Option<&str>) -> bool {
        let Some(workspace) = workspace else {
            return false;
        };
        self.summary(principal)
            .await
            .is_some_and(|s| s.has_admin_write_access(workspace))
    }

    /// Whether the principal administers at least one workspace
    pub async fn is_workspace_admin_anywhere(&self, principal: &Principal) -> bool {
        if self.is_admin(principal) {
            return true;
        }
        self.summary(principal)
            .await
            .is_some_and(|s| s.has_admin_rights_to_any_workspace())
    }

    /// Limits over a workspace as a whole
    pub async fn workspace_limits(
        &self,
        principal: Option<&Principal>,
        workspace: &str,
    ) -> WorkspaceLimits {
        let (read, write, admin) = match principal {
            Some(p) if self.is_admin(p) => (true, true, true),
            Some(p) if p.authenticated => (
                true,
                self.config.grant_write_to_workspaces_to_authenticated_users,
                self.is_workspace_admin(p, Some(workspace)).await,
            ),
            _ => (true, false, false),
        };
        WorkspaceLimits {
            mode: CatalogMode::DEFAULT,
            read,
            write,
            admin,
        }
    }

    /// Predicate selecting the catalog objects of `kind` the principal may list
    pub async fn security_filter(&self, principal: Option<&Principal>, kind: CatalogType) -> Filter {
        let Some(principal) = principal else {
            return Filter::Exclude;
        };
        if self.is_admin(principal) {
            return Filter::Include;
        }
        match self.summary(principal).await {
            Some(summary) => build_security_filter(&summary, kind),
            None => Filter::Exclude,
        }
    }

    /// Validate a requested style, or pick the default one to render with
    pub async fn check_style(
        &self,
        principal: &Principal,
        resource: &CatalogResource,
        context: &RequestContext,
        requested: Option<&str>,
    ) -> AccessResult<Option<String>> {
        let policy = if self.is_admin(principal) {
            StylePolicy::unrestricted()
        } else {
            let request = GrantRequest::new(
                principal,
                context,
                resource.workspace.as_deref(),
                resource.name.as_str(),
            );
            StylePolicy::from_grant(&self.base_grant(&request).await)
        };
        policy.check(requested, &resource.qualified_name())
    }
}
