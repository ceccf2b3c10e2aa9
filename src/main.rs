//! geoguard
//!
//! Evaluates access decisions against a configuration and prints them as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use geoguard::{
    access::{AccessManager, CatalogResource, GroupMembership, Principal, RequestContext, ResourceKind},
    catalog::CatalogType,
    config::{AppConfig, LogFormat, load_config},
    rules::{CatalogIndex, RuleStore},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// geoguard - access decisions for geospatial catalogs
#[derive(Parser, Debug)]
#[command(name = "geoguard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GEOGUARD_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long, env = "GEOGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Identity {
    /// Authenticated user name; anonymous when omitted
    #[arg(long)]
    user: Option<String>,

    /// Role held by the user (repeatable)
    #[arg(long = "role")]
    roles: Vec<String>,
}

impl Identity {
    fn principal(&self) -> Principal {
        match &self.user {
            Some(user) => Principal::user(user, self.roles.iter().cloned()),
            None => {
                let mut principal = Principal::anonymous();
                principal.roles.extend(self.roles.iter().cloned());
                principal
            }
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the access limits of a layer or layer group
    Check {
        #[command(flatten)]
        identity: Identity,

        /// Layer or group, as `ws:name` or `name`
        #[arg(long)]
        layer: String,

        /// Enclosing group the layer is requested through (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,

        /// OGC service, e.g. WMS
        #[arg(long)]
        service: Option<String>,

        /// Service operation, e.g. GetMap
        #[arg(long)]
        request: Option<String>,

        /// Treat as an administrative request
        #[arg(long)]
        admin_request: bool,

        /// Requested style
        #[arg(long)]
        style: Option<String>,
    },

    /// Print the catalog security filter for an object kind
    Filter {
        #[command(flatten)]
        identity: Identity,

        /// workspace, namespace, store, resource, layer, layergroup, published, style
        #[arg(long)]
        kind: CatalogType,
    },

    /// Print the limits over a workspace
    Workspace {
        #[command(flatten)]
        identity: Identity,

        #[arg(long)]
        workspace: String,
    },
}

fn init_logging(args: &Args, config: &AppConfig) {
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json = args.log_json || config.logging.format == LogFormat::Json;
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn split_ref(reference: &str) -> (Option<&str>, &str) {
    match reference.split_once(':') {
        Some((ws, name)) => (Some(ws), name),
        None => (None, reference),
    }
}

/// Resolve a `--layer` reference against the catalog
fn lookup_resource(index: &CatalogIndex, reference: &str) -> CatalogResource {
    let (workspace, name) = split_ref(reference);
    if let Some(resource) = index.resource(workspace, name) {
        return resource.clone();
    }
    if index.group(workspace, name).is_some() {
        return CatalogResource::new(workspace, name, ResourceKind::Group);
    }
    warn!(layer = reference, "Layer not in catalog, assuming a vector resource");
    CatalogResource::new(workspace, name, ResourceKind::Vector)
}

fn lookup_groups(index: &CatalogIndex, references: &[String]) -> anyhow::Result<Vec<GroupMembership>> {
    references
        .iter()
        .map(|reference| {
            let (workspace, name) = split_ref(reference);
            index
                .group(workspace, name)
                .cloned()
                .with_context(|| format!("Unknown layer group: {}", reference))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&args, &config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting geoguard");

    // Build collaborators
    let store = Arc::new(
        RuleStore::new(&config)
            .inspect_err(|e| error!(error = %e, "Failed to compile rules"))?,
    );
    let index = Arc::new(CatalogIndex::new(&config.catalog));
    debug!(rules = store.len(), "Collaborators ready");

    let manager = AccessManager::new(store, index.clone(), config.access.clone());

    let output = match args.command {
        Command::Check {
            identity,
            layer,
            groups,
            service,
            request,
            admin_request,
            style,
        } => {
            let principal = identity.principal();
            let resource = lookup_resource(&index, &layer);
            let containers = lookup_groups(&index, &groups)?;
            let context = RequestContext {
                service,
                request,
                admin_request,
            };

            let limits = manager
                .access_limits(&principal, &resource, &containers, &context)
                .await?;
            if !limits.allows_read() {
                warn!(user = %principal.name, layer = %resource.qualified_name(), "Access denied");
            }
            let style = match manager
                .check_style(&principal, &resource, &context, style.as_deref())
                .await
            {
                Ok(style) => json!({ "allowed": true, "style": style }),
                Err(e) => json!({ "allowed": false, "reason": e.to_string() }),
            };

            json!({
                "resource": resource,
                "limits": limits,
                "style": style,
            })
        }
        Command::Filter { identity, kind } => {
            let principal = identity.principal();
            let filter = manager.security_filter(Some(&principal), kind).await;
            json!({
                "kind": kind.as_str(),
                "filter": filter.to_string(),
            })
        }
        Command::Workspace {
            identity,
            workspace,
        } => {
            let principal = identity.principal();
            let limits = manager.workspace_limits(Some(&principal), &workspace).await;
            json!({
                "workspace": workspace,
                "limits": limits,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ref() {
        assert_eq!(split_ref("topp:states"), (Some("topp"), "states"));
        assert_eq!(split_ref("basemap"), (None, "basemap"));
    }

    #[test]
    fn test_args_parse_check() {
        let args = Args::try_parse_from([
            "geoguard", "check", "--user", "bob", "--role", "R1", "--role", "R2", "--layer",
            "topp:states", "--group", "basemap", "--service", "WMS",
        ])
        .unwrap();
        match args.command {
            Command::Check {
                identity, groups, ..
            } => {
                assert_eq!(identity.roles, vec!["R1", "R2"]);
                assert_eq!(groups, vec!["basemap"]);
                assert!(identity.principal().authenticated);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_parse_filter_kind() {
        let args = Args::try_parse_from(["geoguard", "filter", "--kind", "layergroup"]).unwrap();
        match args.command {
            Command::Filter { identity, kind } => {
                assert_eq!(kind, CatalogType::LayerGroup);
                assert!(!identity.principal().authenticated);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
