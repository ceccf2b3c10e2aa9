//! Catalog security filter builder
//!
//! Turns an [`AccessSummary`] into one predicate per catalog entity type, so
//! a catalog query only returns what the principal may list.

use crate::catalog::summary::{ANY, AccessSummary, WorkspaceAccessSummary};
use crate::filter::{Filter, simplify};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog entity types a filter can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogType {
    Workspace,
    Namespace,
    Store,
    Resource,
    Layer,
    LayerGroup,
    /// Layers and layer groups together
    Published,
    Style,
}

impl CatalogType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CatalogType::Workspace => "workspace",
            CatalogType::Namespace => "namespace",
            CatalogType::Store => "store",
            CatalogType::Resource => "resource",
            CatalogType::Layer => "layer",
            CatalogType::LayerGroup => "layer_group",
            CatalogType::Published => "published",
            CatalogType::Style => "style",
        }
    }

    pub fn all() -> &'static [CatalogType] {
        &[
            CatalogType::Workspace,
            CatalogType::Namespace,
            CatalogType::Store,
            CatalogType::Resource,
            CatalogType::Layer,
            CatalogType::LayerGroup,
            CatalogType::Published,
            CatalogType::Style,
        ]
    }
}

impl fmt::Display for CatalogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        CatalogType::all()
            .iter()
            .find(|t| t.as_str() == normalized || (normalized == "layergroup" && **t == CatalogType::LayerGroup))
            .copied()
            .ok_or_else(|| format!("Unknown catalog type: {s}"))
    }
}

/// Property naming an entity's workspace, per entity type
mod property {
    pub const WORKSPACE: &str = "name";
    pub const NAMESPACE: &str = "prefix";
    pub const STORE: &str = "workspace.name";
    pub const RESOURCE: &str = "store.workspace.name";
    pub const LAYER: &str = "resource.store.workspace.name";
    pub const LAYER_GROUP: &str = "workspace.name";
    pub const STYLE: &str = "workspace.name";
    pub const NAME: &str = "name";
}

const LAYER_INFO: &str = "LayerInfo";
const LAYER_GROUP_INFO: &str = "LayerGroupInfo";

/// Build the simplified security filter for `kind`
pub fn build_security_filter(summary: &AccessSummary, kind: CatalogType) -> Filter {
    let nothing_visible = summary.visible_workspaces().is_empty()
        && !summary.any_workspace_visible()
        && !summary.no_workspace_visible();
    if nothing_visible {
        return Filter::Exclude;
    }

    let filter = match kind {
        CatalogType::Workspace => workspace_filter(summary, property::WORKSPACE),
        CatalogType::Namespace => workspace_filter(summary, property::NAMESPACE),
        CatalogType::Store => workspace_filter(summary, property::STORE),
        CatalogType::Resource => layer_filter(summary, property::RESOURCE, false),
        CatalogType::Layer => layer_filter(summary, property::LAYER, false),
        CatalogType::LayerGroup => layer_filter(summary, property::LAYER_GROUP, true),
        CatalogType::Published => published_filter(summary),
        CatalogType::Style => style_filter(summary),
    };
    simplify(filter)
}

fn workspace_filter(summary: &AccessSummary, property: &str) -> Filter {
    if summary.any_workspace_visible() {
        return Filter::Include;
    }
    Filter::in_list(property, summary.visible_workspaces())
}

fn style_filter(summary: &AccessSummary) -> Filter {
    if summary.any_workspace_visible() {
        return Filter::Include;
    }
    let global = if summary.no_workspace_visible() {
        Filter::is_null(property::STYLE)
    } else {
        Filter::Exclude
    };
    Filter::or([
        global,
        Filter::in_list(property::STYLE, summary.visible_workspaces()),
    ])
}

/// Per-workspace clauses OR'd together, behind an exclusion of the
/// workspaces that are hidden entirely
fn layer_filter(summary: &AccessSummary, property: &str, global_groups: bool) -> Filter {
    let mut hidden: Vec<String> = Vec::new();
    let mut hide_global = false;
    let mut clauses: Vec<Filter> = Vec::new();

    for ws in summary.workspaces() {
        if ws.is_no_workspace() && !global_groups {
            continue;
        }
        if ws.is_hidden() {
            if ws.is_no_workspace() {
                hide_global = true;
            } else if !ws.is_any_workspace() {
                hidden.push(ws.workspace.clone());
            }
            continue;
        }
        let workspace_match = if ws.is_any_workspace() {
            Filter::Include
        } else if ws.is_no_workspace() {
            Filter::is_null(property)
        } else {
            Filter::equal(property, ws.workspace.as_str())
        };
        clauses.push(Filter::and([workspace_match, layer_names(ws)]));
    }

    let exclusion = match hidden.len() {
        0 => Filter::Include,
        1 => Filter::not_equal(property, hidden.remove(0)),
        _ => Filter::not(Filter::in_list(property, hidden)),
    };
    let global_exclusion = if hide_global {
        Filter::not(Filter::is_null(property))
    } else {
        Filter::Include
    };
    Filter::and([exclusion, global_exclusion, Filter::or(clauses)])
}

/// Allowed names decide on their own unless they include the wildcard;
/// only then are forbidden names subtracted.
fn layer_names(ws: &WorkspaceAccessSummary) -> Filter {
    if !ws.allowed.is_empty() && !ws.allowed.contains(ANY) {
        return Filter::in_list(property::NAME, ws.allowed.iter().cloned());
    }
    let forbidden: Vec<String> = ws.forbidden.iter().filter(|n| *n != ANY).cloned().collect();
    if forbidden.is_empty() {
        Filter::Include
    } else {
        Filter::not(Filter::in_list(property::NAME, forbidden))
    }
}

fn published_filter(summary: &AccessSummary) -> Filter {
    let layers = simplify(layer_filter(summary, property::LAYER, false));
    let groups = simplify(layer_filter(summary, property::LAYER_GROUP, true));
    if layers.is_include() || groups.is_include() {
        return Filter::Include;
    }
    let guarded = [(LAYER_INFO, layers), (LAYER_GROUP_INFO, groups)]
        .into_iter()
        .filter(|(_, f)| !f.is_exclude())
        .map(|(kind, f)| Filter::and([Filter::instance_of(kind), f]));
    Filter::or(guarded)
}
