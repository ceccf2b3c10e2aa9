//! Access decisions
//!
//! ## Decision flow
//!
//! 1. Administrators get unrestricted limits without any lookup.
//! 2. Administrative requests by a workspace admin are allowed outright.
//! 3. Otherwise the principal's grant is looked up; an unavailable answer
//!    is a DENY.
//! 4. On direct access the enclosing groups are discovered: if all of them
//!    are opaque the resource is denied, and if none is a named group their
//!    restrictions are merged in. Requests through explicit groups always
//!    merge the restrictions of those groups. Group resources skip merging.
//! 5. The grant and merged restriction become typed [`AccessLimits`]. A
//!    merged restriction can only narrow the grant's own areas.
//!
//! Restriction merging is described in [`restriction`].

pub mod limits;
pub mod manager;
pub mod provider;
pub mod restriction;
pub mod style;
pub mod types;

pub use limits::{AccessLimits, GroupLimits, RasterLimits, TiledLimits, VectorLimits, WorkspaceLimits};
pub use manager::AccessManager;
pub use provider::{ContainmentIndex, GrantProvider, GrantRequest};
pub use restriction::{
    MergedRestriction, ResolutionPath, RestrictionBucket, RestrictionResolver, RoleRestriction,
    classify,
};
pub use style::StylePolicy;
pub use types::{
    AttributeAccess, CatalogMode, CatalogResource, GrantRecord, GrantType, GroupMembership,
    LayerAttribute, PresentationMode, Principal, RequestContext, ResourceKind,
};
