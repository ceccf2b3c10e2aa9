//! Catalog visibility
//!
//! [`AccessSummary`] condenses what a principal can see per workspace;
//! [`build_security_filter`] turns it into a catalog query predicate.

pub mod filter_builder;
pub mod summary;

pub use filter_builder::{CatalogType, build_security_filter};
pub use summary::{ANY, ANY_WORKSPACE, AccessSummary, AdminGrant, NO_WORKSPACE, WorkspaceAccessSummary};
