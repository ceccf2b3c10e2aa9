//! geoguard
//!
//! Access decisions and restriction algebra for geospatial catalogs.
//!
//! ## Features
//!
//! - **Typed access limits** for vector, raster, tiled resources and layer groups
//! - **Restriction merging** across roles and enclosing layer groups
//! - **Catalog security filters** selecting the objects a principal may list
//! - **Reference collaborators** driven by TOML rules and a static catalog
//!
//! ## Decision Model
//!
//! ```text
//! grant (per principal) → group restrictions (per role) → typed limits
//! ```
//!
//! Grants are tri-state (`ALLOW`, `LIMIT`, `DENY`). Anything the engine
//! cannot resolve is denied.
//!
//! ## Example Configuration
//!
//! ```toml
//! [access]
//! admin_roles = ["ROLE_ADMINISTRATOR"]
//! containment_services = ["WMS"]
//!
//! [[rules]]
//! priority = 10
//! role = "ROLE_EDITOR"
//! workspace = "topp"
//! grant = "LIMIT"
//! allowed_area = "SRID=4326;POLYGON((0 0,10 0,10 10,0 10,0 0))"
//!
//! [[catalog.layers]]
//! workspace = "topp"
//! name = "states"
//! ```

pub mod access;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod rules;

// Re-export main types
pub use access::{AccessLimits, AccessManager, CatalogResource, GrantRecord, Principal, RequestContext};
pub use catalog::{AccessSummary, CatalogType};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use rules::{CatalogIndex, RuleStore};
