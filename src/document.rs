//! The text buffer a replica edits.
//!
//! A `Document` only changes through `apply`. Applying is atomic: when one
//! member of a split fails, members already applied are rolled back before
//! the error is returned, so a rejected operation never leaves the buffer
//! half-edited.

use std::fmt;

use tracing::warn;

use crate::error::Error;
use crate::ot::Operation;
use crate::ot::op::char_len;

/// A blake3 digest of a document's text, 32 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Checksum(pub [u8; 32]);

/// A shared text buffer plus the path it is shared under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    path: String,
    text: Vec<char>,
}

impl Document {
    /// Create a document from an initial snapshot.
    pub fn new(path: impl Into<String>, text: &str) -> Document {
        return Document {
            path: path.into(),
            text: text.chars().collect(),
        };
    }

    /// The identity this document is shared under.
    pub fn path(&self) -> &str {
        return &self.path;
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        return self.text.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.text.is_empty();
    }

    /// The full text.
    pub fn text(&self) -> String {
        return self.text.iter().collect();
    }

    /// The characters in `[start, end)`, or `None` if the range is invalid.
    pub fn slice(&self, start: usize, end: usize) -> Option<String> {
        if start > end || end > self.text.len() {
            return None;
        }
        return Some(self.text[start..end].iter().collect());
    }

    /// Digest of the current text, for comparing replicas.
    pub fn checksum(&self) -> Checksum {
        let text = self.text();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
        return Checksum(*hasher.finalize().as_bytes());
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) -> Result<(), Error> {
        let primitives = op.primitives();
        for (applied, primitive) in primitives.iter().enumerate() {
            if let Err(err) = self.apply_primitive(primitive) {
                for done in primitives[..applied].iter().rev() {
                    self.revert_primitive(done);
                }
                warn!(path = %self.path, %op, %err, "rejected operation");
                return Err(err);
            }
        }
        return Ok(());
    }

    fn apply_primitive(&mut self, op: &Operation) -> Result<(), Error> {
        return match op {
            Operation::Insert(ins) => self.insert(ins.position(), ins.content()),
            Operation::Delete(del) => self.delete(del.position(), del.content()),
            // `primitives` only yields leaves.
            Operation::NoOp | Operation::Split(_) => Ok(()),
        };
    }

    fn insert(&mut self, position: usize, content: &str) -> Result<(), Error> {
        if position > self.text.len() {
            return Err(Error::OutOfBounds {
                position,
                len: self.text.len(),
            });
        }
        self.text.splice(position..position, content.chars());
        return Ok(());
    }

    fn delete(&mut self, position: usize, content: &str) -> Result<(), Error> {
        let end = match position.checked_add(char_len(content)) {
            Some(end) if end <= self.text.len() => end,
            end => {
                return Err(Error::OutOfBounds {
                    position: end.unwrap_or(position),
                    len: self.text.len(),
                });
            }
        };
        let found = &self.text[position..end];
        if !found.iter().copied().eq(content.chars()) {
            return Err(Error::ContentMismatch {
                position,
                expected: content.to_string(),
                found: found.iter().collect(),
            });
        }
        self.text.drain(position..end);
        return Ok(());
    }

    /// Undo a primitive that was just applied successfully.
    fn revert_primitive(&mut self, op: &Operation) {
        match op {
            Operation::Insert(ins) => {
                let start = ins.position();
                self.text.drain(start..start + ins.len());
            }
            Operation::Delete(del) => {
                let start = del.position();
                self.text.splice(start..start, del.content().chars());
            }
            Operation::NoOp | Operation::Split(_) => {}
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.text {
            write!(f, "{}", c)?;
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        return Document::new("test.txt", text);
    }

    #[test]
    fn insert_and_delete() {
        let mut d = doc("hello world");
        d.apply(&Operation::insert(5, ",").unwrap()).unwrap();
        assert_eq!(d.text(), "hello, world");
        d.apply(&Operation::delete(0, "hello").unwrap()).unwrap();
        assert_eq!(d.text(), ", world");
        assert_eq!(d.len(), 7);
    }

    #[test]
    fn noop_changes_nothing() {
        let mut d = doc("abc");
        d.apply(&Operation::nop()).unwrap();
        assert_eq!(d.text(), "abc");
    }

    #[test]
    fn split_members_apply_in_order() {
        // "0123456" with "abc" inserted at 3, then the split delete around it.
        let mut d = doc("012abc3456");
        let op = Operation::split(
            Operation::delete(2, "2").unwrap(),
            Operation::delete(5, "34").unwrap(),
        )
        .unwrap();
        d.apply(&op).unwrap();
        assert_eq!(d.text(), "01abc56");
    }

    #[test]
    fn delete_with_wrong_content_is_rejected() {
        let mut d = doc("abcdef");
        let err = d.apply(&Operation::delete(1, "bd").unwrap()).unwrap_err();
        assert_eq!(
            err,
            Error::ContentMismatch {
                position: 1,
                expected: "bd".into(),
                found: "bc".into(),
            }
        );
        assert!(err.requires_resync());
        assert_eq!(d.text(), "abcdef");
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut d = doc("abc");
        assert_eq!(
            d.apply(&Operation::insert(4, "x").unwrap()),
            Err(Error::OutOfBounds { position: 4, len: 3 })
        );
        assert_eq!(
            d.apply(&Operation::delete(2, "cd").unwrap()),
            Err(Error::OutOfBounds { position: 4, len: 3 })
        );
    }

    #[test]
    fn delete_past_the_addressable_range_is_rejected() {
        let mut d = doc("abc");
        assert_eq!(
            d.apply(&Operation::delete(usize::MAX, "a").unwrap()),
            Err(Error::OutOfBounds { position: usize::MAX, len: 3 })
        );
        assert_eq!(
            d.apply(&Operation::delete(usize::MAX - 1, "a").unwrap()),
            Err(Error::OutOfBounds { position: usize::MAX, len: 3 })
        );
        assert_eq!(d.text(), "abc");
    }

    #[test]
    fn failed_split_rolls_back_earlier_members() {
        let mut d = doc("abcdef");
        let op = Operation::split(
            Operation::insert(0, "XY").unwrap(),
            Operation::split(
                Operation::delete(2, "a").unwrap(),
                Operation::delete(0, "nope").unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        assert!(d.apply(&op).is_err());
        assert_eq!(d.text(), "abcdef");
    }

    #[test]
    fn positions_are_characters() {
        let mut d = doc("héllo");
        d.apply(&Operation::delete(1, "é").unwrap()).unwrap();
        d.apply(&Operation::insert(1, "ë").unwrap()).unwrap();
        assert_eq!(d.text(), "hëllo");
        assert_eq!(d.slice(1, 3), Some("ël".to_string()));
        assert_eq!(d.slice(3, 9), None);
    }

    #[test]
    fn checksum_tracks_text() {
        let a = doc("same");
        let mut b = Document::new("other/path.txt", "same");
        assert_eq!(a.checksum(), b.checksum());
        b.apply(&Operation::insert(4, "!").unwrap()).unwrap();
        assert_ne!(a.checksum(), b.checksum());
    }
}
