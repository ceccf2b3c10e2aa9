//! Union and intersection over optional areas
//!
//! An absent area (`None`) means "no restriction on this slot". How an absent
//! operand combines with a present one depends on the call path, so it is an
//! explicit [`NullPolicy`] chosen once by the caller.

use super::{Geometry, projection::reproject};
use crate::error::GeometryError;

/// How an absent operand takes part in a binary area operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Union: an absent operand absorbs the other (nothing is restricted).
    /// Intersection: an absent operand admits nothing next to a present one.
    Strict,
    /// An absent operand is ignored and the present one is kept as is.
    Permissive,
}

/// Union of two optional areas. The result is in the CRS of `first`
/// (or of `second` when `first` is absent).
pub fn union(
    first: Option<&Geometry>,
    second: Option<&Geometry>,
    policy: NullPolicy,
) -> Result<Option<Geometry>, GeometryError> {
    match (first, second, policy) {
        (Some(a), Some(b), _) => {
            let b = reproject(b, a.srid())?;
            Ok(Some(a.union(&b)))
        }
        (None, None, _) => Ok(None),
        (_, _, NullPolicy::Strict) => Ok(None),
        (Some(a), None, NullPolicy::Permissive) | (None, Some(a), NullPolicy::Permissive) => {
            Ok(Some(a.clone()))
        }
    }
}

/// Intersection of two optional areas. The result is in the CRS of `first`
/// (or of `second` when `first` is absent).
pub fn intersection(
    first: Option<&Geometry>,
    second: Option<&Geometry>,
    policy: NullPolicy,
) -> Result<Option<Geometry>, GeometryError> {
    match (first, second, policy) {
        (Some(a), Some(b), _) => {
            let b = reproject(b, a.srid())?;
            Ok(Some(a.intersection(&b)))
        }
        (None, None, _) => Ok(None),
        (Some(a), None, NullPolicy::Strict) | (None, Some(a), NullPolicy::Strict) => {
            Ok(Some(Geometry::empty(a.srid())))
        }
        (Some(a), None, NullPolicy::Permissive) | (None, Some(a), NullPolicy::Permissive) => {
            Ok(Some(a.clone()))
        }
    }
}
