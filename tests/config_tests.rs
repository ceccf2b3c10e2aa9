//! Configuration loading tests

use geoguard::access::{CatalogMode, GrantType, PresentationMode, ResourceKind};
use geoguard::config::{LogFormat, load_config_from_str};
use geoguard::error::ConfigError;

const MINIMAL_CONFIG: &str = r#"
[access]
admin_roles = ["ROLE_ADMINISTRATOR"]
"#;

const FULL_CONFIG: &str = r#"
[access]
admin_roles = ["ROLE_ADMINISTRATOR", "ROLE_GEOADMIN"]
grant_write_to_workspaces_to_authenticated_users = true
containment_services = ["WMS", "WMTS"]
default_srid = 3857

[logging]
level = "debug"
format = "json"

[[rules]]
priority = 10
role = "ROLE_EDITOR"
service = "WMS"
workspace = "topp"
layer = "states"
grant = "LIMIT"
mode = "MIXED"
allowed_area = "SRID=4326;POLYGON((0 0,10 0,10 10,0 10,0 0))"
cql_read = "STATE_NAME = 'Texas'"
default_style = "population"
allowed_styles = ["population", "polygon"]
attributes = [
    { name = "PERSONS", access = "READONLY" },
    { name = "the_geom", access = "READWRITE" },
]

[[rules]]
priority = 100
grant = "DENY"

[[admin_rules]]
role = "ROLE_EDITOR"
workspace = "topp"
admin = true

[[catalog.layers]]
workspace = "topp"
name = "states"
srid = 4326

[[catalog.layers]]
workspace = "nurc"
name = "mosaic"
kind = "raster"

[[catalog.groups]]
workspace = "topp"
name = "tasmania"
mode = "named"
members = ["topp:states"]

[[catalog.groups]]
name = "world"
mode = "opaque"
members = ["topp:tasmania", "nurc:mosaic"]
"#;

#[test]
fn test_minimal_config() {
    let config = load_config_from_str(MINIMAL_CONFIG).unwrap();

    assert_eq!(config.access.admin_roles, vec!["ROLE_ADMINISTRATOR"]);
    assert!(config.rules.is_empty());
    assert!(config.catalog.layers.is_empty());
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = load_config_from_str("").unwrap();

    assert_eq!(config.access.admin_roles, vec!["ROLE_ADMINISTRATOR", "ADMIN"]);
    assert_eq!(config.access.default_srid, 4326);
    assert!(config.access.containment_services.is_empty());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_full_config() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();

    // Access
    assert!(config.access.grant_write_to_workspaces_to_authenticated_users);
    assert_eq!(config.access.containment_services, vec!["WMS", "WMTS"]);
    assert_eq!(config.access.default_srid, 3857);

    // Logging
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);

    // Rules
    assert_eq!(config.rules.len(), 2);
    let rule = &config.rules[0];
    assert_eq!(rule.grant, GrantType::Limit);
    assert_eq!(rule.mode, Some(CatalogMode::Mixed));
    assert_eq!(rule.workspace.as_deref(), Some("topp"));
    assert_eq!(rule.attributes.len(), 2);
    assert_eq!(rule.allowed_styles, vec!["population", "polygon"]);
    assert_eq!(config.rules[1].grant, GrantType::Deny);
    assert!(config.rules[1].role.is_none());

    // Admin rules
    assert_eq!(config.admin_rules.len(), 1);
    assert!(config.admin_rules[0].admin);

    // Catalog
    assert_eq!(config.catalog.layers[0].kind, ResourceKind::Vector);
    assert_eq!(config.catalog.layers[0].srid, Some(4326));
    assert_eq!(config.catalog.layers[1].kind, ResourceKind::Raster);
    assert_eq!(config.catalog.groups[0].mode, PresentationMode::Named);
    assert_eq!(config.catalog.groups[1].mode, PresentationMode::Opaque);
    assert_eq!(config.catalog.groups[1].workspace, None);
}

#[test]
fn test_lowercase_enum_aliases() {
    let toml = r#"
[[rules]]
grant = "limit"
mode = "hide"
"#;

    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.rules[0].grant, GrantType::Limit);
    assert_eq!(config.rules[0].mode, Some(CatalogMode::Hide));
}

#[test]
fn test_invalid_grant_value() {
    let toml = r#"
[[rules]]
grant = "MAYBE"
"#;

    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_invalid_toml() {
    assert!(matches!(
        load_config_from_str("[access\nadmin_roles = "),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_area_with_unsupported_srid() {
    let toml = r#"
[[rules]]
grant = "LIMIT"
allowed_area = "SRID=32632;POLYGON((0 0,1 0,1 1,0 1,0 0))"
"#;

    let err = load_config_from_str(toml).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidArea { ref rule, .. } if rule == "rules[0]"));
}

#[test]
fn test_area_without_srid_uses_default() {
    let toml = r#"
[access]
default_srid = 3857

[[rules]]
grant = "LIMIT"
clip_area = "POLYGON((0 0,100000 0,100000 100000,0 100000,0 0))"
"#;

    assert!(load_config_from_str(toml).is_ok());
}

#[test]
fn test_invalid_write_filter() {
    let toml = r#"
[[rules]]
grant = "ALLOW"
cql_write = "(a = 1"
"#;

    let err = load_config_from_str(toml).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFilter { .. }));
}

#[test]
fn test_empty_admin_rule_workspace() {
    let toml = r#"
[[admin_rules]]
workspace = ""
admin = true
"#;

    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_duplicate_catalog_entry() {
    let toml = r#"
[[catalog.layers]]
workspace = "topp"
name = "states"

[[catalog.groups]]
workspace = "topp"
name = "states"
"#;

    let err = load_config_from_str(toml).unwrap_err();
    assert!(err.to_string().contains("topp:states"));
}

#[test]
fn test_layer_without_workspace() {
    let toml = r#"
[[catalog.layers]]
workspace = ""
name = "states"
"#;

    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
#[serial_test::serial]
fn test_explicit_config_file() {
    use geoguard::config::load_config;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("geoguard.toml");
    fs::write(&config_path, FULL_CONFIG).unwrap();

    let config = load_config(Some(config_path.to_str().unwrap())).unwrap();

    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.catalog.groups.len(), 2);
}

#[test]
#[serial_test::serial]
fn test_missing_explicit_config_file() {
    use geoguard::config::load_config;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("does-not-exist.toml");

    let err = load_config(Some(config_path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, ConfigError::Load(ref msg) if msg.contains("not found")));
}

#[test]
#[serial_test::serial]
fn test_env_vars_override_file() {
    use geoguard::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("geoguard.toml");
    fs::write(&config_path, MINIMAL_CONFIG).unwrap();

    unsafe {
        env::set_var("GEOGUARD_LOGGING__LEVEL", "trace");
        env::set_var("GEOGUARD_ACCESS__DEFAULT_SRID", "3857");
    }

    let result = load_config(Some(config_path.to_str().unwrap()));

    // Cleanup before asserting so a failure does not leak into other tests
    unsafe {
        env::remove_var("GEOGUARD_LOGGING__LEVEL");
        env::remove_var("GEOGUARD_ACCESS__DEFAULT_SRID");
    }

    let config = result.unwrap();
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.access.default_srid, 3857);
    assert_eq!(config.access.admin_roles, vec!["ROLE_ADMINISTRATOR"]);
}

#[test]
#[serial_test::serial]
fn test_env_var_lists() {
    use geoguard::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("geoguard.toml");
    fs::write(&config_path, MINIMAL_CONFIG).unwrap();

    unsafe {
        env::set_var("GEOGUARD_ACCESS__ADMIN_ROLES", "ROLE_ROOT,ROLE_OPS");
        env::set_var("GEOGUARD_ACCESS__CONTAINMENT_SERVICES", "WMS");
    }

    let result = load_config(Some(config_path.to_str().unwrap()));

    unsafe {
        env::remove_var("GEOGUARD_ACCESS__ADMIN_ROLES");
        env::remove_var("GEOGUARD_ACCESS__CONTAINMENT_SERVICES");
    }

    let config = result.unwrap();
    assert_eq!(config.access.admin_roles, vec!["ROLE_ROOT", "ROLE_OPS"]);
    assert_eq!(config.access.containment_services, vec!["WMS"]);
}

#[test]
#[serial_test::serial]
fn test_env_var_invalid_srid_rejected() {
    use geoguard::config::load_config;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("geoguard.toml");
    fs::write(&config_path, MINIMAL_CONFIG).unwrap();

    unsafe {
        env::set_var("GEOGUARD_ACCESS__DEFAULT_SRID", "27700");
    }

    let result = load_config(Some(config_path.to_str().unwrap()));

    unsafe {
        env::remove_var("GEOGUARD_ACCESS__DEFAULT_SRID");
    }

    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}
