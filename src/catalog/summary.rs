//! Per-principal visibility summary
//!
//! A condensed view of what a principal can see, keyed by workspace. Two
//! marker keys exist besides real workspace names: [`ANY_WORKSPACE`] applies
//! to every workspace and [`NO_WORKSPACE`] holds global layer groups.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Matches any workspace or layer name
pub const ANY: &str = "*";

/// Workspace key applying to every workspace
pub const ANY_WORKSPACE: &str = ANY;

/// Workspace key of global (workspace-less) layer groups
pub const NO_WORKSPACE: &str = "";

/// Administrative grant over a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminGrant {
    Admin,
    User,
}

/// What a principal can see in one workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceAccessSummary {
    pub workspace: String,
    pub admin: Option<AdminGrant>,
    /// Visible layer names, possibly [`ANY`]
    pub allowed: BTreeSet<String>,
    /// Hidden layer names, possibly [`ANY`]
    pub forbidden: BTreeSet<String>,
}

impl WorkspaceAccessSummary {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            admin: None,
            allowed: BTreeSet::new(),
            forbidden: BTreeSet::new(),
        }
    }

    pub fn allow<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(layers.into_iter().map(Into::into));
        self
    }

    pub fn forbid<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden.extend(layers.into_iter().map(Into::into));
        self
    }

    pub fn with_admin(mut self, admin: AdminGrant) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Nothing allowed and everything forbidden
    pub fn is_hidden(&self) -> bool {
        self.allowed.is_empty() && self.forbidden.contains(ANY)
    }

    pub fn is_admin(&self) -> bool {
        self.admin == Some(AdminGrant::Admin)
    }

    pub fn is_any_workspace(&self) -> bool {
        self.workspace == ANY_WORKSPACE
    }

    pub fn is_no_workspace(&self) -> bool {
        self.workspace == NO_WORKSPACE
    }
}

/// Visibility summary across workspaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    workspaces: BTreeMap<String, WorkspaceAccessSummary>,
}

impl AccessSummary {
    /// Later entries for the same workspace replace earlier ones
    pub fn of(entries: impl IntoIterator<Item = WorkspaceAccessSummary>) -> Self {
        Self {
            workspaces: entries
                .into_iter()
                .map(|ws| (ws.workspace.clone(), ws))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub fn workspace(&self, name: &str) -> Option<&WorkspaceAccessSummary> {
        self.workspaces.get(name)
    }

    pub fn workspaces(&self) -> impl Iterator<Item = &WorkspaceAccessSummary> {
        self.workspaces.values()
    }

    /// Admin rights over `workspace`, either directly or through the
    /// any-workspace entry
    pub fn has_admin_write_access(&self, workspace: &str) -> bool {
        self.workspace(workspace)
            .or_else(|| self.workspace(ANY_WORKSPACE))
            .is_some_and(WorkspaceAccessSummary::is_admin)
    }

    pub fn has_admin_rights_to_any_workspace(&self) -> bool {
        self.workspaces().any(WorkspaceAccessSummary::is_admin)
    }

    /// Names of workspaces that are not entirely hidden, sorted, without the
    /// marker keys
    pub fn visible_workspaces(&self) -> BTreeSet<String> {
        self.workspaces()
            .filter(|ws| !ws.is_hidden() && !ws.is_any_workspace() && !ws.is_no_workspace())
            .map(|ws| ws.workspace.clone())
            .collect()
    }

    /// Whether the any-workspace entry makes every workspace visible
    pub fn any_workspace_visible(&self) -> bool {
        self.workspace(ANY_WORKSPACE).is_some_and(|ws| !ws.is_hidden())
    }

    /// Whether global layer groups (and global styles) are visible
    pub fn no_workspace_visible(&self) -> bool {
        self.workspace(NO_WORKSPACE).is_some_and(|ws| !ws.is_hidden())
    }
}
