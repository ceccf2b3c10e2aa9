//! Catalog containment index
//!
//! Built from `[catalog]`. Answers which layer groups expose a resource,
//! following nested groups upward.

use crate::access::types::qualified;
use crate::access::{CatalogResource, ContainmentIndex, GroupMembership};
use crate::config::CatalogConfig;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::trace;

/// In-process [`ContainmentIndex`] over a static catalog
#[derive(Debug, Default)]
pub struct CatalogIndex {
    resources: HashMap<String, CatalogResource>,
    groups: HashMap<String, GroupMembership>,
    /// Member reference to the qualified names of the groups listing it
    parents: HashMap<String, Vec<String>>,
}

impl CatalogIndex {
    pub fn new(config: &CatalogConfig) -> Self {
        let resources = config
            .layers
            .iter()
            .map(|l| {
                let mut resource = CatalogResource::new(Some(&l.workspace), &l.name, l.kind);
                resource.srid = l.srid;
                (resource.qualified_name(), resource)
            })
            .collect();

        let mut groups = HashMap::new();
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        for g in &config.groups {
            let workspace = g.workspace.as_deref().filter(|ws| !ws.is_empty());
            let membership = GroupMembership::new(workspace, &g.name, g.mode);
            let key = membership.qualified_name();
            for member in &g.members {
                parents.entry(member.clone()).or_default().push(key.clone());
            }
            groups.insert(key, membership);
        }

        Self {
            resources,
            groups,
            parents,
        }
    }

    /// Layer lookup by workspace and name
    pub fn resource(&self, workspace: Option<&str>, name: &str) -> Option<&CatalogResource> {
        self.resources.get(&qualified(workspace, name))
    }

    /// Group lookup, `None` workspace for global groups
    pub fn group(&self, workspace: Option<&str>, name: &str) -> Option<&GroupMembership> {
        self.groups.get(&qualified(workspace, name))
    }

    /// Groups enclosing the member `key`, transitively, sorted
    pub fn containers(&self, key: &str) -> Vec<GroupMembership> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([key]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(parents) = self.parents.get(current) else {
                continue;
            };
            for parent in parents {
                if !visited.insert(parent.as_str()) {
                    continue;
                }
                if let Some(group) = self.groups.get(parent) {
                    found.push(group.clone());
                }
                queue.push_back(parent.as_str());
            }
        }

        found.sort();
        found
    }
}

#[async_trait]
impl ContainmentIndex for CatalogIndex {
    async fn containers_of(&self, resource: &CatalogResource) -> Vec<GroupMembership> {
        let found = self.containers(&resource.qualified_name());
        trace!(resource = %resource.qualified_name(), groups = found.len(), "Containers discovered");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{PresentationMode, ResourceKind};
    use crate::config::load_config_from_str;

    fn index() -> CatalogIndex {
        let config = load_config_from_str(
            r#"
[[catalog.layers]]
workspace = "topp"
name = "states"
srid = 3857

[[catalog.layers]]
workspace = "topp"
name = "roads"

[[catalog.groups]]
workspace = "topp"
name = "inner"
members = ["topp:states"]

[[catalog.groups]]
name = "outer"
mode = "opaque"
members = ["topp:inner", "topp:states"]

[[catalog.groups]]
name = "single"
mode = "named"
members = ["outer"]
"#,
        )
        .unwrap();
        CatalogIndex::new(&config.catalog)
    }

    #[test]
    fn test_transitive_containers() {
        let index = index();
        let names: Vec<_> = index
            .containers("topp:states")
            .iter()
            .map(GroupMembership::qualified_name)
            .collect();
        // global groups sort first
        assert_eq!(names, vec!["outer", "single", "topp:inner"]);
    }

    #[test]
    fn test_uncontained_layer() {
        assert!(index().containers("topp:roads").is_empty());
    }

    #[test]
    fn test_lookups() {
        let index = index();
        let states = index.resource(Some("topp"), "states").unwrap();
        assert_eq!(states.kind, ResourceKind::Vector);
        assert_eq!(states.srid, Some(3857));
        assert!(index.resource(None, "states").is_none());
        assert_eq!(index.group(None, "outer").unwrap().mode, PresentationMode::Opaque);
        assert!(index.group(Some("topp"), "outer").is_none());
    }

    #[tokio::test]
    async fn test_containers_of() {
        let index = index();
        let roads = CatalogResource::new(Some("topp"), "roads", ResourceKind::Vector);
        assert!(index.containers_of(&roads).await.is_empty());
    }
}
