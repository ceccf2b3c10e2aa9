//! In-process collaborators driven by configuration
//!
//! [`RuleStore`] answers grant lookups and access summaries from static
//! rules; [`CatalogIndex`] discovers enclosing layer groups.

pub mod containment;
pub mod store;

pub use containment::CatalogIndex;
pub use store::RuleStore;
