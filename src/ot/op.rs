//! Text operations over a single linear character buffer.
//!
//! Positions and lengths are counted in `char`s, never bytes, so that a
//! multi-byte character is always one unit of position on every replica.
//!
//! Deletes carry the literal text they remove rather than a length. That
//! lets the transformation engine cut a delete into pieces while still
//! knowing exactly which characters each piece refers to, and lets the
//! document reject a delete whose text does not match what it holds.

use std::fmt;

use smallvec::SmallVec;

use crate::error::OpError;

/// A single text edit, or a sequence of two edits produced by
/// transformation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Does nothing.
    NoOp,
    Insert(Insert),
    Delete(Delete),
    /// Apply `first`, then `second` against the state `first` left behind.
    Split(Box<Split>),
}

/// Insert `content` at `position`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insert {
    pub(crate) position: usize,
    pub(crate) content: String,
    /// Where this insert originally pointed before transformation moved it.
    /// Only used to order inserts that end up at the same position.
    pub(crate) origin: Option<usize>,
}

/// Delete `content`, which must sit at `position`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delete {
    pub(crate) position: usize,
    pub(crate) content: String,
}

/// Two operations applied one after the other. Neither member is a no-op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub(crate) first: Operation,
    pub(crate) second: Operation,
}

/// Number of characters in `s`.
pub(crate) fn char_len(s: &str) -> usize {
    return s.chars().count();
}

/// The characters of `s` in `[start, end)`, by character index.
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> String {
    return s.chars().skip(start).take(end.saturating_sub(start)).collect();
}

impl Operation {
    /// The identity operation.
    pub fn nop() -> Operation {
        return Operation::NoOp;
    }

    /// Insert `content` at `position`.
    pub fn insert(position: usize, content: impl Into<String>) -> Result<Operation, OpError> {
        let content = content.into();
        if content.is_empty() {
            return Err(OpError::EmptyInsert);
        }
        return Ok(Operation::Insert(Insert { position, content, origin: None }));
    }

    /// Insert `content` at `position`, remembering that it was originally
    /// aimed at `origin`.
    pub fn insert_with_origin(
        position: usize,
        content: impl Into<String>,
        origin: usize,
    ) -> Result<Operation, OpError> {
        let content = content.into();
        if content.is_empty() {
            return Err(OpError::EmptyInsert);
        }
        return Ok(Operation::Insert(Insert { position, content, origin: Some(origin) }));
    }

    /// Delete `content`, which must be found at `position` when applied.
    pub fn delete(position: usize, content: impl Into<String>) -> Result<Operation, OpError> {
        let content = content.into();
        if content.is_empty() {
            return Err(OpError::EmptyDelete);
        }
        return Ok(Operation::Delete(Delete { position, content }));
    }

    /// Apply `first` and then `second`. Neither may be a no-op.
    pub fn split(first: Operation, second: Operation) -> Result<Operation, OpError> {
        if first.is_noop() || second.is_noop() {
            return Err(OpError::SplitWithNoOp);
        }
        return Ok(Operation::Split(Box::new(Split { first, second })));
    }

    /// Sequence two operations, dropping no-op members so that the result
    /// never holds a split around a no-op.
    pub(crate) fn join(first: Operation, second: Operation) -> Operation {
        return match (first.is_noop(), second.is_noop()) {
            (true, true) => Operation::NoOp,
            (true, false) => second,
            (false, true) => first,
            (false, false) => Operation::Split(Box::new(Split { first, second })),
        };
    }

    pub fn is_noop(&self) -> bool {
        return matches!(self, Operation::NoOp);
    }

    /// The `Insert` and `Delete` leaves of this operation, in the order they
    /// are applied.
    pub fn primitives(&self) -> SmallVec<[&Operation; 4]> {
        let mut out = SmallVec::new();
        self.collect_primitives(&mut out);
        return out;
    }

    fn collect_primitives<'a>(&'a self, out: &mut SmallVec<[&'a Operation; 4]>) {
        match self {
            Operation::NoOp => {}
            Operation::Split(split) => {
                split.first.collect_primitives(out);
                split.second.collect_primitives(out);
            }
            Operation::Insert(_) | Operation::Delete(_) => out.push(self),
        }
    }
}

impl Insert {
    pub fn position(&self) -> usize {
        return self.position;
    }

    pub fn content(&self) -> &str {
        return &self.content;
    }

    /// The explicit origin, if transformation recorded one.
    pub fn origin(&self) -> Option<usize> {
        return self.origin;
    }

    /// The origin used for ordering: the recorded one, or the position.
    pub fn effective_origin(&self) -> usize {
        return self.origin.unwrap_or(self.position);
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        return char_len(&self.content);
    }

    pub fn is_empty(&self) -> bool {
        return self.content.is_empty();
    }
}

impl Delete {
    pub fn position(&self) -> usize {
        return self.position;
    }

    pub fn content(&self) -> &str {
        return &self.content;
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        return char_len(&self.content);
    }

    pub fn is_empty(&self) -> bool {
        return self.content.is_empty();
    }

    /// One past the last character this delete removes.
    pub fn end(&self) -> usize {
        return self.position + self.len();
    }
}

impl Split {
    pub fn first(&self) -> &Operation {
        return &self.first;
    }

    pub fn second(&self) -> &Operation {
        return &self.second;
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Operation::NoOp => write!(f, "NoOp"),
            Operation::Insert(ins) => match ins.origin {
                Some(origin) => write!(f, "Insert({}, {:?}, origin {})", ins.position, ins.content, origin),
                None => write!(f, "Insert({}, {:?})", ins.position, ins.content),
            },
            Operation::Delete(del) => write!(f, "Delete({}, {:?})", del.position, del.content),
            Operation::Split(split) => write!(f, "Split({}, {})", split.first, split.second),
        };
    }
}
