//! Boolean filter model
//!
//! One predicate type serves both sides of the engine: feature filters built
//! from grant CQL expressions and restriction areas, and catalog filters that
//! select the objects a principal may list.

pub mod cql;
pub mod simplify;

pub use cql::parse;
pub use simplify::simplify;

use crate::geometry::Geometry;
use serde::{Serialize, Serializer};
use std::fmt;

/// Literal operand of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Accepts everything
    Include,
    /// Rejects everything
    Exclude,
    Compare {
        property: String,
        op: CompareOp,
        value: Literal,
    },
    In {
        property: String,
        values: Vec<Literal>,
    },
    Like {
        property: String,
        pattern: String,
    },
    IsNull(String),
    /// Spatial predicate; `property: None` targets the default geometry
    Intersects {
        property: Option<String>,
        geometry: Geometry,
    },
    /// Type guard used by catalog filters over mixed entity kinds
    InstanceOf(String),
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn equal(property: impl Into<String>, value: impl Into<Literal>) -> Self {
        Filter::Compare {
            property: property.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn not_equal(property: impl Into<String>, value: impl Into<Literal>) -> Self {
        Filter::Compare {
            property: property.into(),
            op: CompareOp::NotEq,
            value: value.into(),
        }
    }

    /// Set membership; collapses to an equality for a single value
    pub fn in_list<I, V>(property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let property = property.into();
        let mut values: Vec<Literal> = values.into_iter().map(Into::into).collect();
        match values.len() {
            0 => Filter::Exclude,
            1 => Filter::equal(property, values.remove(0)),
            _ => Filter::In { property, values },
        }
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Filter::IsNull(property.into())
    }

    pub fn intersects(geometry: Geometry) -> Self {
        Filter::Intersects {
            property: None,
            geometry,
        }
    }

    pub fn instance_of(kind: impl Into<String>) -> Self {
        Filter::InstanceOf(kind.into())
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    pub fn is_exclude(&self) -> bool {
        matches!(self, Filter::Exclude)
    }

    fn is_compound(&self) -> bool {
        matches!(self, Filter::And(_) | Filter::Or(_))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Include => f.write_str("INCLUDE"),
            Filter::Exclude => f.write_str("EXCLUDE"),
            Filter::Compare {
                property,
                op,
                value,
            } => write!(f, "{property} {} {value}", op.as_str()),
            Filter::In { property, values } => {
                let list = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{property} IN ({list})")
            }
            Filter::Like { property, pattern } => {
                write!(f, "{property} LIKE {}", Literal::String(pattern.clone()))
            }
            Filter::IsNull(property) => write!(f, "{property} IS NULL"),
            Filter::Intersects { property, geometry } => match property {
                Some(p) => write!(f, "INTERSECTS({p}, {geometry})"),
                None => write!(f, "INTERSECTS({geometry})"),
            },
            Filter::InstanceOf(kind) => write!(f, "IsInstanceOf({kind})"),
            Filter::Not(inner) => write!(f, "NOT ({inner})"),
            Filter::And(children) => write_joined(f, children, " AND "),
            Filter::Or(children) => write_joined(f, children, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Filter], sep: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if child.is_compound() {
            write!(f, "({child})")?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
