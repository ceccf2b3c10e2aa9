//! Typed access limits
//!
//! The enforceable outcome of an access decision, shaped by the kind of
//! resource it applies to.

use crate::access::restriction::MergedRestriction;
use crate::access::types::{AttributeAccess, CatalogMode, CatalogResource, GrantRecord, GrantType, LayerAttribute, ResourceKind};
use crate::error::{AccessError, AccessResult, GeometryError};
use crate::filter::{self, Filter};
use crate::geometry::{self, Geometry, NullPolicy};
use serde::Serialize;

/// Limits for vector (feature type) resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorLimits {
    pub mode: CatalogMode,
    pub read_filter: Filter,
    pub write_filter: Filter,
    /// `None` means every attribute is readable
    pub read_attributes: Option<Vec<String>>,
    /// `None` means every attribute is writable
    pub write_attributes: Option<Vec<String>>,
    pub clip_area: Option<Geometry>,
    pub intersect_area: Option<Geometry>,
}

/// Limits for raster (coverage) resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterLimits {
    pub mode: CatalogMode,
    pub read_filter: Filter,
    /// Union of the clip and allowed areas
    pub area: Option<Geometry>,
}

/// Limits for cascaded tiled/map resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiledLimits {
    pub mode: CatalogMode,
    pub read_filter: Filter,
    pub area: Option<Geometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupLimits {
    pub mode: CatalogMode,
}

/// Access limits typed by resource kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccessLimits {
    Vector(VectorLimits),
    Raster(RasterLimits),
    Tiled(TiledLimits),
    /// `None` means the group is fully visible
    Group { limits: Option<GroupLimits> },
}

impl AccessLimits {
    /// Visibility mode; `None` for a fully visible group
    pub fn mode(&self) -> Option<CatalogMode> {
        match self {
            AccessLimits::Vector(l) => Some(l.mode),
            AccessLimits::Raster(l) => Some(l.mode),
            AccessLimits::Tiled(l) => Some(l.mode),
            AccessLimits::Group { limits } => limits.map(|l| l.mode),
        }
    }

    /// Whether anything at all may be read
    pub fn allows_read(&self) -> bool {
        match self {
            AccessLimits::Vector(l) => !l.read_filter.is_exclude(),
            AccessLimits::Raster(l) => !l.read_filter.is_exclude(),
            AccessLimits::Tiled(l) => !l.read_filter.is_exclude(),
            AccessLimits::Group { limits } => limits.is_none(),
        }
    }
}

/// Workspace-level limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkspaceLimits {
    pub mode: CatalogMode,
    pub read: bool,
    pub write: bool,
    pub admin: bool,
}

/// Translate a grant, optionally merged with its container restrictions,
/// into limits for `resource`.
pub fn build_limits(
    resource: &CatalogResource,
    grant: &GrantRecord,
    merged: Option<&MergedRestriction>,
) -> AccessResult<AccessLimits> {
    let mode = resolve_mode(grant, merged);

    let limits = match resource.kind {
        ResourceKind::Group => AccessLimits::Group {
            limits: (!grant.grant.is_allowed()).then(|| GroupLimits {
                mode: grant.mode.unwrap_or(CatalogMode::DEFAULT),
            }),
        },
        ResourceKind::Vector => {
            let (allowed, clip) = resolve_areas(resource, grant, merged)?;
            let mut read_filter = to_filter(resource, grant.grant, grant.cql_read.as_deref())?;
            let mut write_filter = to_filter(resource, grant.grant, grant.cql_write.as_deref())?;
            if let Some(allowed) = &allowed {
                let area_filter = match &clip {
                    Some(clip) => Filter::or([
                        Filter::intersects(allowed.clone()),
                        Filter::intersects(clip.clone()),
                    ]),
                    None => Filter::intersects(allowed.clone()),
                };
                read_filter = and_area(read_filter, area_filter.clone());
                write_filter = and_area(write_filter, area_filter);
            }
            let (read_attributes, write_attributes) = attribute_masks(&grant.attributes);
            AccessLimits::Vector(VectorLimits {
                mode,
                read_filter,
                write_filter,
                read_attributes,
                write_attributes,
                clip_area: clip,
                intersect_area: allowed,
            })
        }
        ResourceKind::Raster => {
            let (allowed, clip) = resolve_areas(resource, grant, merged)?;
            let area = geometry::union(clip.as_ref(), allowed.as_ref(), NullPolicy::Permissive)
                .map_err(|e| area_error(resource, clip.as_ref().or(allowed.as_ref()), e))?;
            AccessLimits::Raster(RasterLimits {
                mode,
                read_filter: to_filter(resource, grant.grant, grant.cql_read.as_deref())?,
                area,
            })
        }
        ResourceKind::Tiled => {
            let (allowed, _) = resolve_areas(resource, grant, merged)?;
            AccessLimits::Tiled(TiledLimits {
                mode,
                read_filter: to_filter(resource, grant.grant, grant.cql_read.as_deref())?,
                area: allowed,
            })
        }
    };
    Ok(limits)
}

/// Merged areas narrow the grant's own, slot by slot, and both end up in
/// the resource CRS. An open merged slot keeps the grant's area.
fn resolve_areas(
    resource: &CatalogResource,
    grant: &GrantRecord,
    merged: Option<&MergedRestriction>,
) -> AccessResult<(Option<Geometry>, Option<Geometry>)> {
    let Some(m) = merged else {
        return Ok((
            to_resource_crs(resource, grant.allowed_area.as_ref())?,
            to_resource_crs(resource, grant.clip_area.as_ref())?,
        ));
    };
    let narrow = |merged_area: Option<&Geometry>, own: Option<&Geometry>| {
        geometry::intersection(merged_area, own, NullPolicy::Permissive)
            .map_err(|e| area_error(resource, own, e))
    };
    let allowed = narrow(m.allowed_area.as_ref(), grant.allowed_area.as_ref())?;
    let clip = narrow(m.clip_area.as_ref(), grant.clip_area.as_ref())?;
    Ok((
        to_resource_crs(resource, allowed.as_ref())?,
        to_resource_crs(resource, clip.as_ref())?,
    ))
}

/// DENY always falls back to the default mode; otherwise the merged mode
/// wins over the grant's own.
fn resolve_mode(grant: &GrantRecord, merged: Option<&MergedRestriction>) -> CatalogMode {
    if grant.is_denied() {
        return CatalogMode::DEFAULT;
    }
    merged
        .and_then(|m| m.mode)
        .or(grant.mode)
        .unwrap_or(CatalogMode::DEFAULT)
}

/// Parse a grant's CQL text, or pick INCLUDE from the verdict. DENY is
/// always EXCLUDE, whatever text it carries.
fn to_filter(resource: &CatalogResource, grant: GrantType, cql: Option<&str>) -> AccessResult<Filter> {
    if !grant.is_allowed() {
        return Ok(Filter::Exclude);
    }
    match cql {
        Some(text) => filter::parse(text)
            .map_err(|e| AccessError::invalid_filter(resource.workspace.as_deref(), &resource.name, e)),
        None => Ok(Filter::Include),
    }
}

fn and_area(filter: Filter, area_filter: Filter) -> Filter {
    match filter {
        Filter::Include => area_filter,
        Filter::Exclude => Filter::Exclude,
        other => Filter::and([other, area_filter]),
    }
}

fn attribute_masks(attributes: &[LayerAttribute]) -> (Option<Vec<String>>, Option<Vec<String>>) {
    let read: Vec<String> = attributes
        .iter()
        .filter(|a| matches!(a.access, AttributeAccess::ReadOnly | AttributeAccess::ReadWrite))
        .map(|a| a.name.clone())
        .collect();
    let write: Vec<String> = attributes
        .iter()
        .filter(|a| a.access == AttributeAccess::ReadWrite)
        .map(|a| a.name.clone())
        .collect();
    (
        (!read.is_empty()).then_some(read),
        (!write.is_empty()).then_some(write),
    )
}

fn to_resource_crs(
    resource: &CatalogResource,
    area: Option<&Geometry>,
) -> AccessResult<Option<Geometry>> {
    match (area, resource.srid) {
        (Some(area), Some(srid)) => geometry::reproject(area, srid)
            .map(Some)
            .map_err(|e| area_error(resource, Some(area), e)),
        (area, _) => Ok(area.cloned()),
    }
}

fn area_error(
    resource: &CatalogResource,
    area: Option<&Geometry>,
    err: GeometryError,
) -> AccessError {
    let text = area.map(ToString::to_string).unwrap_or_default();
    AccessError::invalid_area(resource.workspace.as_deref(), &resource.name, text, err)
}
