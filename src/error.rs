//! Error types.
//!
//! Two families live here. `OpError` is raised while *constructing* an
//! operation and never reaches the transformation engine. `Error` covers
//! everything that can go wrong once operations start flowing between
//! replicas. Every `Error` that concerns document state is fatal to the
//! channel it was raised on: the session layer is expected to drop the pair
//! and request a fresh snapshot (see `Error::requires_resync`).

use thiserror::Error;

/// Rejection of a malformed operation at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("insert content must not be empty")]
    EmptyInsert,

    #[error("delete content must not be empty")]
    EmptyDelete,

    #[error("a split cannot contain a no-op member")]
    SplitWithNoOp,
}

/// A broken ordering guarantee on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CausalityViolation {
    /// The remote side claims to have seen more of our operations than we
    /// have ever generated.
    #[error("remote acknowledged {acknowledged} operations but only {generated} were generated")]
    AcknowledgedAhead { acknowledged: u64, generated: u64 },

    /// The remote acknowledgement moved backwards, referencing log entries
    /// that were already pruned.
    #[error("remote acknowledged {acknowledged} operations after previously acknowledging {pruned}")]
    AcknowledgedBehind { acknowledged: u64, pruned: u64 },

    /// The remote operation is not the next one in sequence, so a message
    /// was lost or duplicated in transit.
    #[error("expected remote operation {expected}, received {received}")]
    OutOfOrder { expected: u64, received: u64 },
}

/// Errors raised while applying, receiving or routing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Operation(#[from] OpError),

    #[error("delete at {position} expected {expected:?} but document holds {found:?}")]
    ContentMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("position {position} is outside a document of length {len}")]
    OutOfBounds { position: usize, len: usize },

    #[error("causality violation: {0}")]
    Causality(#[from] CausalityViolation),

    #[error("participant is not part of this session")]
    UnknownParticipant,

    #[error("participant has already joined this session")]
    DuplicateParticipant,

    #[error("session is full ({max} participants)")]
    SessionFull { max: usize },

    #[error("session has shut down")]
    SessionClosed,
}

impl Error {
    /// Whether the replica that raised this error can no longer be trusted
    /// and must be re-snapshotted.
    pub fn requires_resync(&self) -> bool {
        return matches!(
            self,
            Error::ContentMismatch { .. } | Error::OutOfBounds { .. } | Error::Causality(_)
        );
    }
}
