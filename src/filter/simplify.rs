//! Filter simplification
//!
//! Removes redundant INCLUDE/EXCLUDE branches and flattens nested
//! conjunctions and disjunctions. The output is a fixed point: simplifying
//! an already simplified filter returns it unchanged.

use super::Filter;

/// Simplify a filter bottom-up
pub fn simplify(filter: Filter) -> Filter {
    match filter {
        Filter::Not(inner) => match simplify(*inner) {
            Filter::Include => Filter::Exclude,
            Filter::Exclude => Filter::Include,
            Filter::Not(double) => *double,
            other => Filter::Not(Box::new(other)),
        },
        Filter::And(children) => {
            let mut kept = Vec::with_capacity(children.len());
            for child in children {
                match simplify(child) {
                    Filter::Include => {}
                    Filter::Exclude => return Filter::Exclude,
                    Filter::And(nested) => kept.extend(nested),
                    other => kept.push(other),
                }
            }
            collapse(kept, Filter::Include, Filter::And)
        }
        Filter::Or(children) => {
            let mut kept = Vec::with_capacity(children.len());
            for child in children {
                match simplify(child) {
                    Filter::Exclude => {}
                    Filter::Include => return Filter::Include,
                    Filter::Or(nested) => kept.extend(nested),
                    other => kept.push(other),
                }
            }
            collapse(kept, Filter::Exclude, Filter::Or)
        }
        Filter::In { values, .. } if values.is_empty() => Filter::Exclude,
        leaf => leaf,
    }
}

fn collapse(mut kept: Vec<Filter>, identity: Filter, wrap: fn(Vec<Filter>) -> Filter) -> Filter {
    match kept.len() {
        0 => identity,
        1 => kept.remove(0),
        _ => wrap(kept),
    }
}
