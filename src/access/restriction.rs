//! Restriction resolver
//!
//! Combines a resource's own grant with the grants of the layer groups that
//! enclose it. Resolution runs in two phases:
//!
//! 1. **Restrict**, per role: the areas of every enclosing group are
//!    intersected together, then intersected with the resource's own areas.
//!    The role's mode is the strictest of all modes involved. The result is
//!    classified into a [`RestrictionBucket`].
//! 2. **Enlarge**, across roles: results in the same bucket are unioned, then
//!    buckets are unioned in [`RestrictionBucket::MERGE_ORDER`]. An area slot
//!    that any role leaves open stays open. Modes are combined leniently.
//!
//! A principal is never more permissive than one of its roles allows, and
//! never less permissive than its most generous role.

use crate::access::provider::{GrantProvider, GrantRequest};
use crate::access::types::{CatalogMode, GrantRecord, GrantType, GroupMembership};
use crate::error::GeometryError;
use crate::geometry::{self, Geometry, NullPolicy};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, trace};

/// Which slots a per-role result got its areas from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictionBucket {
    GroupIntersect,
    GroupClip,
    GroupBoth,
    LayerIntersect,
    LayerClip,
    LayerBoth,
}

impl RestrictionBucket {
    /// Order in which bucket results are folded into the final restriction
    pub const MERGE_ORDER: [RestrictionBucket; 6] = [
        RestrictionBucket::GroupIntersect,
        RestrictionBucket::GroupClip,
        RestrictionBucket::GroupBoth,
        RestrictionBucket::LayerIntersect,
        RestrictionBucket::LayerClip,
        RestrictionBucket::LayerBoth,
    ];
}

/// Pick the bucket for a per-role result.
///
/// Group-level areas take precedence; the layer's own (post-intersection)
/// areas only matter when no group contributed one. `None` means the role
/// carries no area restriction at all.
pub fn classify(
    group_intersect: bool,
    group_clip: bool,
    layer_intersect: bool,
    layer_clip: bool,
) -> Option<RestrictionBucket> {
    use RestrictionBucket::*;
    match (group_intersect, group_clip, layer_intersect, layer_clip) {
        (true, true, _, _) => Some(GroupBoth),
        (true, false, _, _) => Some(GroupIntersect),
        (false, true, _, _) => Some(GroupClip),
        (false, false, true, true) => Some(LayerBoth),
        (false, false, true, false) => Some(LayerIntersect),
        (false, false, false, true) => Some(LayerClip),
        (false, false, false, false) => None,
    }
}

/// Outcome of group and role merging
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedRestriction {
    pub allowed_area: Option<Geometry>,
    pub clip_area: Option<Geometry>,
    pub mode: Option<CatalogMode>,
}

impl MergedRestriction {
    pub fn is_unrestricted(&self) -> bool {
        self.allowed_area.is_none() && self.clip_area.is_none()
    }

    fn union(&self, other: &MergedRestriction, policy: NullPolicy) -> Result<Self, GeometryError> {
        Ok(Self {
            allowed_area: geometry::union(
                self.allowed_area.as_ref(),
                other.allowed_area.as_ref(),
                policy,
            )?,
            clip_area: geometry::union(self.clip_area.as_ref(), other.clip_area.as_ref(), policy)?,
            mode: CatalogMode::lenient(self.mode, other.mode),
        })
    }
}

/// How the enclosing groups were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// The resource was requested by name; groups came from the containment index
    DirectAccess,
    /// The resource was requested through explicitly named groups
    GroupContext,
}

impl ResolutionPath {
    /// Null handling when intersecting the areas of several groups
    pub const fn group_policy(&self) -> NullPolicy {
        match self {
            ResolutionPath::DirectAccess => NullPolicy::Permissive,
            ResolutionPath::GroupContext => NullPolicy::Strict,
        }
    }
}

/// Phase 1 outcome for a single role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleRestriction {
    /// `None` when the role imposes no area at all
    pub bucket: Option<RestrictionBucket>,
    pub restriction: MergedRestriction,
}

/// Phase 1: narrow one role's access to the resource by its groups.
///
/// `layer` must not be a DENY grant. DENY group grants are skipped, and an
/// ALLOW group without areas contributes nothing. Other groups without areas
/// contribute their mode only.
pub fn restrict(
    layer: &GrantRecord,
    groups: &[GrantRecord],
    path: ResolutionPath,
) -> Result<RoleRestriction, GeometryError> {
    let contributing: Vec<&GrantRecord> = groups
        .iter()
        .filter(|g| !g.is_denied())
        .filter(|g| g.grant != GrantType::Allow || g.has_area())
        .collect();

    let mode = contributing
        .iter()
        .fold(layer.mode, |acc, g| CatalogMode::stricter(acc, g.mode));

    let policy = path.group_policy();
    let group_areas = contributing.iter().filter(|g| g.has_area()).try_fold(
        None,
        |acc: Option<(Option<Geometry>, Option<Geometry>)>, g| {
            let next = match acc {
                None => (g.allowed_area.clone(), g.clip_area.clone()),
                Some((allowed, clip)) => (
                    geometry::intersection(allowed.as_ref(), g.allowed_area.as_ref(), policy)?,
                    geometry::intersection(clip.as_ref(), g.clip_area.as_ref(), policy)?,
                ),
            };
            Ok::<_, GeometryError>(Some(next))
        },
    )?;
    let (group_allowed, group_clip) = group_areas.unwrap_or((None, None));

    // An absent group area never weakens the layer's own one
    let allowed_area = geometry::intersection(
        layer.allowed_area.as_ref(),
        group_allowed.as_ref(),
        NullPolicy::Permissive,
    )?;
    let clip_area = geometry::intersection(
        layer.clip_area.as_ref(),
        group_clip.as_ref(),
        NullPolicy::Permissive,
    )?;

    let bucket = classify(
        group_allowed.is_some(),
        group_clip.is_some(),
        allowed_area.is_some(),
        clip_area.is_some(),
    );

    Ok(RoleRestriction {
        bucket,
        restriction: MergedRestriction {
            allowed_area,
            clip_area,
            mode,
        },
    })
}

/// Phase 2: widen across roles.
///
/// A role without any area restriction makes the whole result unrestricted.
/// Returns `None` when no role contributed.
pub fn enlarge(roles: &[RoleRestriction]) -> Result<Option<MergedRestriction>, GeometryError> {
    if roles.is_empty() {
        return Ok(None);
    }

    let mode = roles
        .iter()
        .fold(None, |acc, r| CatalogMode::lenient(acc, r.restriction.mode));

    if roles.iter().any(|r| r.bucket.is_none()) {
        return Ok(Some(MergedRestriction {
            allowed_area: None,
            clip_area: None,
            mode,
        }));
    }

    let merged = RestrictionBucket::MERGE_ORDER.iter().try_fold(
        None,
        |acc: Option<MergedRestriction>, bucket| {
            let Some(result) = union_bucket(roles, *bucket)? else {
                return Ok(acc);
            };
            Ok::<_, GeometryError>(Some(match acc {
                None => result,
                Some(acc) => acc.union(&result, NullPolicy::Strict)?,
            }))
        },
    )?;

    Ok(Some(MergedRestriction {
        mode,
        ..merged.unwrap_or_default()
    }))
}

fn union_bucket(
    roles: &[RoleRestriction],
    bucket: RestrictionBucket,
) -> Result<Option<MergedRestriction>, GeometryError> {
    roles
        .iter()
        .filter(|r| r.bucket == Some(bucket))
        .map(|r| &r.restriction)
        .try_fold(None, |acc: Option<MergedRestriction>, r| {
            Ok(Some(match acc {
                None => r.clone(),
                Some(acc) => acc.union(r, NullPolicy::Strict)?,
            }))
        })
}

/// Runs both phases against a [`GrantProvider`]
pub struct RestrictionResolver<'a> {
    provider: &'a dyn GrantProvider,
}

impl<'a> RestrictionResolver<'a> {
    pub fn new(provider: &'a dyn GrantProvider) -> Self {
        Self { provider }
    }

    /// Resolve the merged restriction of `request`'s resource within
    /// `groups`. Opaque groups are ignored. `None` when no role has access
    /// to the resource, so there is nothing to merge.
    pub async fn resolve(
        &self,
        request: &GrantRequest,
        groups: &[GroupMembership],
        path: ResolutionPath,
    ) -> Result<Option<MergedRestriction>, GeometryError> {
        let groups: Vec<&GroupMembership> = groups.iter().filter(|g| !g.is_opaque()).collect();

        debug!(
            workspace = ?request.workspace,
            layer = %request.layer,
            roles = request.roles.len(),
            groups = groups.len(),
            path = ?path,
            "Resolving container restrictions"
        );

        let per_role = join_all(
            request
                .roles
                .iter()
                .map(|role| self.role_restriction(request, role, &groups, path)),
        )
        .await;

        let restrictions: Vec<RoleRestriction> = per_role
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();

        let merged = enlarge(&restrictions)?;
        trace!(
            contributing_roles = restrictions.len(),
            unrestricted = merged.as_ref().map(MergedRestriction::is_unrestricted),
            mode = ?merged.as_ref().and_then(|m| m.mode),
            "Container restrictions resolved"
        );
        Ok(merged)
    }

    async fn role_restriction(
        &self,
        request: &GrantRequest,
        role: &str,
        groups: &[&GroupMembership],
        path: ResolutionPath,
    ) -> Result<Option<RoleRestriction>, GeometryError> {
        let role_request = request.for_role(role);
        let layer_grant = match self.provider.grant(&role_request).await {
            Some(grant) if !grant.is_denied() => grant,
            Some(_) => {
                trace!(role, "Layer denied for role, skipping");
                return Ok(None);
            }
            None => {
                trace!(role, "No layer grant available for role, skipping");
                return Ok(None);
            }
        };

        let lookups = groups.iter().map(|group| {
            let group_request = role_request.for_resource(group.workspace.as_deref(), &group.name);
            async move { self.provider.grant(&group_request).await }
        });
        let group_grants: Vec<GrantRecord> = join_all(lookups).await.into_iter().flatten().collect();

        let restriction = restrict(&layer_grant, &group_grants, path)?;
        trace!(role, bucket = ?restriction.bucket, "Role restriction computed");
        Ok(Some(restriction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WGS84;
    use rstest::rstest;

    fn area(x1: f64, y1: f64, x2: f64, y2: f64) -> Geometry {
        Geometry::rect(WGS84, x1, y1, x2, y2)
    }

    fn limit() -> GrantRecord {
        GrantRecord::new(GrantType::Limit)
    }

    #[rstest]
    #[case(true, true, false, false, Some(RestrictionBucket::GroupBoth))]
    #[case(true, false, true, true, Some(RestrictionBucket::GroupIntersect))]
    #[case(false, true, true, false, Some(RestrictionBucket::GroupClip))]
    #[case(false, false, true, true, Some(RestrictionBucket::LayerBoth))]
    #[case(false, false, true, false, Some(RestrictionBucket::LayerIntersect))]
    #[case(false, false, false, true, Some(RestrictionBucket::LayerClip))]
    #[case(false, false, false, false, None)]
    fn test_classify(
        #[case] gi: bool,
        #[case] gc: bool,
        #[case] li: bool,
        #[case] lc: bool,
        #[case] expected: Option<RestrictionBucket>,
    ) {
        assert_eq!(classify(gi, gc, li, lc), expected);
    }

    #[test]
    fn test_restrict_intersects_layer_with_group() {
        let layer = limit().with_allowed_area(area(0.0, 0.0, 10.0, 10.0));
        let group = limit()
            .with_allowed_area(area(5.0, 5.0, 20.0, 20.0))
            .with_mode(CatalogMode::Mixed);

        let r = restrict(&layer, &[group], ResolutionPath::DirectAccess).unwrap();
        assert_eq!(r.bucket, Some(RestrictionBucket::GroupIntersect));
        let allowed = r.restriction.allowed_area.unwrap();
        assert!(allowed.contains_point(7.0, 7.0));
        assert!(!allowed.contains_point(2.0, 2.0));
        assert_eq!(r.restriction.mode, Some(CatalogMode::Mixed));
    }

    #[test]
    fn test_restrict_mode_is_strictest() {
        let layer = GrantRecord::allow_all().with_mode(CatalogMode::Challenge);
        let g1 = limit().with_mode(CatalogMode::Hide);
        let g2 = limit().with_mode(CatalogMode::Mixed);
        let r = restrict(&layer, &[g1, g2], ResolutionPath::DirectAccess).unwrap();
        assert_eq!(r.restriction.mode, Some(CatalogMode::Hide));
        assert_eq!(r.bucket, None);
    }

    #[test]
    fn test_restrict_skips_denied_and_plain_allow_groups() {
        let layer = GrantRecord::allow_all();
        let denied = GrantRecord::deny_all()
            .with_allowed_area(area(0.0, 0.0, 1.0, 1.0))
            .with_mode(CatalogMode::Hide);
        let plain = GrantRecord::allow_all().with_mode(CatalogMode::Hide);
        let r = restrict(&layer, &[denied, plain], ResolutionPath::GroupContext).unwrap();
        assert_eq!(r.bucket, None);
        assert_eq!(r.restriction.mode, None);
        assert!(r.restriction.is_unrestricted());
    }

    #[test]
    fn test_group_context_intersection_is_strict() {
        let layer = GrantRecord::allow_all();
        let g1 = limit().with_allowed_area(area(0.0, 0.0, 10.0, 10.0));
        let g2 = limit().with_clip_area(area(0.0, 0.0, 10.0, 10.0));

        let strict = restrict(&layer, &[g1.clone(), g2.clone()], ResolutionPath::GroupContext).unwrap();
        assert!(strict.restriction.allowed_area.unwrap().is_empty());

        let permissive = restrict(&layer, &[g1, g2], ResolutionPath::DirectAccess).unwrap();
        assert_eq!(permissive.bucket, Some(RestrictionBucket::GroupBoth));
        assert!(!permissive.restriction.allowed_area.unwrap().is_empty());
    }

    #[test]
    fn test_enlarge_unions_within_bucket() {
        let r1 = RoleRestriction {
            bucket: Some(RestrictionBucket::GroupIntersect),
            restriction: MergedRestriction {
                allowed_area: Some(area(0.0, 0.0, 1.0, 1.0)),
                clip_area: None,
                mode: Some(CatalogMode::Hide),
            },
        };
        let r2 = RoleRestriction {
            bucket: Some(RestrictionBucket::GroupIntersect),
            restriction: MergedRestriction {
                allowed_area: Some(area(5.0, 5.0, 6.0, 6.0)),
                clip_area: None,
                mode: Some(CatalogMode::Challenge),
            },
        };
        let merged = enlarge(&[r1, r2]).unwrap().unwrap();
        let allowed = merged.allowed_area.unwrap();
        assert!(allowed.contains_point(0.5, 0.5));
        assert!(allowed.contains_point(5.5, 5.5));
        assert_eq!(merged.mode, Some(CatalogMode::Challenge));
    }

    #[test]
    fn test_enlarge_unrestricted_role_wins() {
        let restricted = RoleRestriction {
            bucket: Some(RestrictionBucket::LayerIntersect),
            restriction: MergedRestriction {
                allowed_area: Some(area(0.0, 0.0, 1.0, 1.0)),
                clip_area: None,
                mode: Some(CatalogMode::Hide),
            },
        };
        let open = RoleRestriction {
            bucket: None,
            restriction: MergedRestriction::default(),
        };
        let merged = enlarge(&[restricted, open]).unwrap().unwrap();
        assert!(merged.is_unrestricted());
        assert_eq!(merged.mode, Some(CatalogMode::Hide));
    }

    #[test]
    fn test_enlarge_without_roles_has_no_result() {
        assert_eq!(enlarge(&[]).unwrap(), None);
    }

    #[test]
    fn test_open_slot_survives_group_bucket_union() {
        let intersect = RoleRestriction {
            bucket: Some(RestrictionBucket::GroupIntersect),
            restriction: MergedRestriction {
                allowed_area: Some(area(0.0, 0.0, 1.0, 1.0)),
                clip_area: None,
                mode: None,
            },
        };
        let clip = RoleRestriction {
            bucket: Some(RestrictionBucket::GroupClip),
            restriction: MergedRestriction {
                allowed_area: None,
                clip_area: Some(area(2.0, 2.0, 3.0, 3.0)),
                mode: None,
            },
        };
        // Each role leaves one slot open, so neither slot is restricted
        let merged = enlarge(&[intersect, clip]).unwrap().unwrap();
        assert!(merged.allowed_area.is_none());
        assert!(merged.clip_area.is_none());
    }
}
