//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (GEOGUARD_*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::{AppConfig, CatalogConfig};
use crate::error::ConfigError;
use crate::filter;
use crate::geometry::{self, Geometry};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "geoguard.toml",
    ".geoguard.toml",
    "~/.config/geoguard/config.toml",
    "/etc/geoguard/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with GEOGUARD_ prefix
    // e.g., GEOGUARD_ACCESS__DEFAULT_SRID, GEOGUARD_LOGGING__LEVEL
    // Double underscore (__) maps to nested keys (access.default_srid)
    builder = builder.add_source(
        Environment::with_prefix("GEOGUARD")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("access.admin_roles")
            .with_list_parse_key("access.containment_services")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.access.admin_roles.is_empty() {
        return Err(ConfigError::Missing {
            field: "access.admin_roles".to_string(),
        });
    }

    if !geometry::is_supported(config.access.default_srid) {
        return Err(ConfigError::Invalid {
            message: format!(
                "access.default_srid must be EPSG:4326 or EPSG:3857, got: {}",
                config.access.default_srid
            ),
        });
    }

    validate_rules(config)?;
    validate_catalog(&config.catalog)?;

    Ok(())
}

/// Every rule area must parse as EWKT and every CQL expression must parse
fn validate_rules(config: &AppConfig) -> Result<(), ConfigError> {
    for (i, rule) in config.rules.iter().enumerate() {
        let name = format!("rules[{}]", i);
        for area in [&rule.allowed_area, &rule.clip_area].into_iter().flatten() {
            let geometry = Geometry::parse(area, config.access.default_srid).map_err(|e| {
                ConfigError::InvalidArea {
                    rule: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            if !geometry::is_supported(geometry.srid()) {
                return Err(ConfigError::InvalidArea {
                    rule: name,
                    reason: format!("EPSG:{} cannot be reprojected", geometry.srid()),
                });
            }
        }
        for cql in [&rule.cql_read, &rule.cql_write].into_iter().flatten() {
            filter::parse(cql).map_err(|e| ConfigError::InvalidFilter {
                rule: name.clone(),
                reason: e.to_string(),
            })?;
        }
    }

    for (i, rule) in config.admin_rules.iter().enumerate() {
        if rule.workspace.as_deref() == Some("") {
            return Err(ConfigError::Invalid {
                message: format!("admin_rules[{}].workspace must not be empty", i),
            });
        }
    }

    Ok(())
}

/// Names must be unique and every group member must resolve
fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    let mut known: HashSet<String> = HashSet::new();

    for layer in &catalog.layers {
        if layer.workspace.is_empty() || layer.name.is_empty() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "catalog layer needs a workspace and a name, got '{}:{}'",
                    layer.workspace, layer.name
                ),
            });
        }
        let key = format!("{}:{}", layer.workspace, layer.name);
        if !known.insert(key.clone()) {
            return Err(ConfigError::Invalid {
                message: format!("duplicate catalog entry: {}", key),
            });
        }
    }

    for group in &catalog.groups {
        let key = match group.workspace.as_deref() {
            Some(ws) if !ws.is_empty() => format!("{}:{}", ws, group.name),
            _ => group.name.clone(),
        };
        if !known.insert(key.clone()) {
            return Err(ConfigError::Invalid {
                message: format!("duplicate catalog entry: {}", key),
            });
        }
    }

    for group in &catalog.groups {
        for member in &group.members {
            if !known.contains(member) {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "group '{}' references unknown member '{}'",
                        group.name, member
                    ),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_str_basic() {
        let toml = r#"
[access]
admin_roles = ["ROLE_ADMIN"]
containment_services = ["WMS"]

[logging]
level = "debug"
format = "json"
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.access.admin_roles, vec!["ROLE_ADMIN"]);
        assert_eq!(config.access.containment_services, vec!["WMS"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_admin_roles_error() {
        let toml = r#"
[access]
admin_roles = []
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_unsupported_default_srid() {
        let toml = r#"
[access]
default_srid = 32632
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_invalid_rule_area() {
        let toml = r#"
[[rules]]
grant = "LIMIT"
allowed_area = "POINT(1 2)"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArea { ref rule, .. } if rule == "rules[0]"));
    }

    #[test]
    fn test_invalid_rule_cql() {
        let toml = r#"
[[rules]]
grant = "ALLOW"

[[rules]]
grant = "ALLOW"
cql_read = "name = "
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFilter { ref rule, .. } if rule == "rules[1]"));
    }

    #[test]
    fn test_unknown_group_member() {
        let toml = r#"
[[catalog.layers]]
workspace = "topp"
name = "states"

[[catalog.groups]]
name = "basemap"
members = ["topp:states", "topp:roads"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("topp:roads"));
    }

    #[test]
    fn test_nested_group_member_resolves() {
        let toml = r#"
[[catalog.layers]]
workspace = "topp"
name = "states"

[[catalog.groups]]
workspace = "topp"
name = "inner"
members = ["topp:states"]

[[catalog.groups]]
name = "outer"
mode = "opaque"
members = ["topp:inner"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.catalog.groups.len(), 2);
    }
}
