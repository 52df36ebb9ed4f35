//! Inclusion transformation.
//!
//! `transform(a, b, priority)` rewrites `a` so that it can be applied after
//! `b`, where both were generated against the same document state. For any
//! such pair,
//!
//! ```text
//! apply(apply(s, b), transform(a, b, p)) == apply(apply(s, a), transform(b, a, !p))
//! ```
//!
//! The two sides of a channel always call with complementary priorities,
//! so ties between inserts at the same position are broken the same way on
//! both ends without any negotiation.
//!
//! Composite operations are transformed by walking the grid of their
//! members: a split on the right is threaded through member by member, a
//! split on the left transforms its second member against the right side as
//! seen *after* the first member. Each cell of that grid is itself a
//! primitive transform, so the property above holds for arbitrarily nested
//! splits as long as it holds for the four primitive pairs.

use std::cmp::Ordering;

use tracing::trace;

use super::op::Delete;
use super::op::Insert;
use super::op::Operation;
use super::op::Split;
use super::op::char_slice;

/// Transform `a` against the concurrent operation `b`.
pub fn transform(a: &Operation, b: &Operation, priority: bool) -> Operation {
    let result = match (a, b) {
        (Operation::NoOp, _) => Operation::NoOp,
        (_, Operation::NoOp) => a.clone(),
        (_, Operation::Split(split)) => {
            let after_first = transform(a, &split.first, priority);
            transform(&after_first, &split.second, priority)
        }
        (Operation::Split(split), _) => transform_split(split, b, priority),
        (Operation::Insert(ia), Operation::Insert(ib)) => insert_insert(ia, ib, priority),
        (Operation::Insert(ia), Operation::Delete(db)) => insert_delete(ia, db),
        (Operation::Delete(da), Operation::Insert(ib)) => delete_insert(da, ib),
        (Operation::Delete(da), Operation::Delete(db)) => delete_delete(da, db),
    };
    trace!(%a, %b, priority, %result, "transform");
    return result;
}

fn transform_split(split: &Split, b: &Operation, priority: bool) -> Operation {
    let first = transform(&split.first, b, priority);
    // `second` was authored after `first` ran, so it must meet `b` as `b`
    // looks once `first` has been applied.
    let b_after_first = transform(b, &split.first, !priority);
    let second = transform(&split.second, &b_after_first, priority);
    return Operation::join(first, second);
}

fn shifted_insert(ins: &Insert, position: usize) -> Operation {
    return Operation::Insert(Insert {
        position,
        content: ins.content.clone(),
        origin: Some(ins.effective_origin()),
    });
}

fn insert_insert(a: &Insert, b: &Insert, priority: bool) -> Operation {
    let a_first = match a.position.cmp(&b.position) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => match a.effective_origin().cmp(&b.effective_origin()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => priority,
        },
    };
    if a_first {
        return Operation::Insert(a.clone());
    }
    return shifted_insert(a, a.position + b.len());
}

fn insert_delete(a: &Insert, b: &Delete) -> Operation {
    if a.position <= b.position {
        return Operation::Insert(a.clone());
    }
    let b_end = b.end();
    if a.position > b_end {
        return shifted_insert(a, a.position - b.len());
    }
    // The text around the insert is gone; it lands where the delete was and
    // remembers where it used to point.
    return Operation::Insert(Insert {
        position: b.position,
        content: a.content.clone(),
        origin: Some(a.position),
    });
}

fn delete_insert(a: &Delete, b: &Insert) -> Operation {
    let a_end = a.end();
    if b.position >= a_end {
        return Operation::Delete(a.clone());
    }
    if b.position <= a.position {
        return Operation::Delete(Delete {
            position: a.position + b.len(),
            content: a.content.clone(),
        });
    }
    // The insert landed inside the range; delete around it.
    let cut = b.position - a.position;
    let len = a.len();
    let prefix = Operation::Delete(Delete {
        position: a.position,
        content: char_slice(&a.content, 0, cut),
    });
    let suffix = Operation::Delete(Delete {
        position: a.position + b.len(),
        content: char_slice(&a.content, cut, len),
    });
    return Operation::join(prefix, suffix);
}

fn delete_delete(a: &Delete, b: &Delete) -> Operation {
    let a_len = a.len();
    let a_end = a.position + a_len;
    let b_len = b.len();
    let b_end = b.position + b_len;

    if b.position >= a_end {
        return Operation::Delete(a.clone());
    }
    if a.position >= b_end {
        return Operation::Delete(Delete {
            position: a.position - b_len,
            content: a.content.clone(),
        });
    }

    // The ranges overlap.
    let front_covered = b.position <= a.position;
    let back_covered = b_end >= a_end;
    return match (front_covered, back_covered) {
        (true, true) => Operation::NoOp,
        (true, false) => Operation::Delete(Delete {
            position: b.position,
            content: char_slice(&a.content, b_end - a.position, a_len),
        }),
        (false, true) => Operation::Delete(Delete {
            position: a.position,
            content: char_slice(&a.content, 0, b.position - a.position),
        }),
        (false, false) => {
            // b sits strictly inside a. Once b is gone the suffix slides
            // back to a's position.
            let prefix = Operation::Delete(Delete {
                position: a.position,
                content: char_slice(&a.content, 0, b.position - a.position),
            });
            let suffix = Operation::Delete(Delete {
                position: a.position,
                content: char_slice(&a.content, b_end - a.position, a_len),
            });
            Operation::join(prefix, suffix)
        }
    };
}
