//! The per-channel Jupiter state machine.
//!
//! Each side of a client/server channel keeps one `Jupiter`. It counts the
//! operations it has sent and the operations it has received, and keeps
//! every sent operation the other side has not yet acknowledged. A message
//! carries both counters, which tells the receiver exactly which of its own
//! sent operations the remote operation was generated without, and so which
//! ones it must be transformed against.
//!
//! ```text
//!        client                     server
//!   generate(c0) ----(c0, 0/0)---->  receive: log [s0] -> c0' = T(c0, s0)
//!   receive: log [c0]  <----(s0, 0/0)---- generate(s0)
//!   s0' = T(s0, c0)
//! ```
//!
//! Both ends transform with opposite priorities fixed by their `Role`, so
//! the pair of results always converges.

use std::collections::VecDeque;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::document::Document;
use crate::error::CausalityViolation;
use crate::error::Error;
use crate::ot::Operation;
use crate::ot::transform;

/// Which end of the channel a pair sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    /// Priority this role passes when transforming a remote operation.
    ///
    /// The server side passes `true`, so the operation it receives (the
    /// client's) is ordered first when two inserts tie. The client side
    /// passes `false` and reaches the same order.
    pub fn priority(self) -> bool {
        return match self {
            Role::Client => false,
            Role::Server => true,
        };
    }
}

/// The two counters attached to every message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Index of this operation among the sender's generated operations.
    pub generated: u64,
    /// How many of the receiver's operations the sender had applied.
    pub acknowledged: u64,
}

/// An operation on its way to the other side of a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub operation: Operation,
    pub timestamp: Timestamp,
}

/// A sent operation the other side has not acknowledged yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pending {
    pub index: u64,
    pub operation: Operation,
}

/// One side of a client/server channel.
#[derive(Clone, Debug)]
pub struct Jupiter {
    role: Role,
    generated: u64,
    acknowledged: u64,
    /// Highest acknowledgement received so far; entries below it are gone.
    remote_acknowledged: u64,
    outgoing: VecDeque<Pending>,
}

impl Jupiter {
    /// A fresh pair, counters at zero.
    pub fn new(role: Role) -> Jupiter {
        return Jupiter {
            role,
            generated: 0,
            acknowledged: 0,
            remote_acknowledged: 0,
            outgoing: VecDeque::new(),
        };
    }

    pub fn role(&self) -> Role {
        return self.role;
    }

    /// Number of operations sent.
    pub fn generated(&self) -> u64 {
        return self.generated;
    }

    /// Number of remote operations received and applied.
    pub fn acknowledged(&self) -> u64 {
        return self.acknowledged;
    }

    /// Sent operations not yet acknowledged by the other side, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Pending> {
        return self.outgoing.iter();
    }

    /// Record a local operation, already applied to the local document, and
    /// tag it for sending.
    pub fn generate(&mut self, operation: Operation) -> Message {
        let timestamp = Timestamp {
            generated: self.generated,
            acknowledged: self.acknowledged,
        };
        self.outgoing.push_back(Pending {
            index: self.generated,
            operation: operation.clone(),
        });
        self.generated += 1;
        debug!(
            role = ?self.role,
            %operation,
            generated = timestamp.generated,
            acknowledged = timestamp.acknowledged,
            pending = self.outgoing.len(),
            "generate"
        );
        return Message { operation, timestamp };
    }

    /// Transform a remote operation against everything the other side had
    /// not seen, apply it to `document`, and return what was applied.
    ///
    /// On error, neither the pair nor the document is changed.
    pub fn receive(&mut self, message: Message, document: &mut Document) -> Result<Operation, Error> {
        let Message { operation, timestamp } = message;
        if let Err(violation) = self.check(timestamp) {
            warn!(role = ?self.role, ?timestamp, %violation, "causality violation");
            return Err(violation.into());
        }
        if let Err(err) = self.check_reach(&operation, document) {
            warn!(role = ?self.role, %operation, %err, "operation out of reach");
            return Err(err);
        }

        let priority = self.role.priority();
        let mut incoming = operation;
        let mut outgoing = VecDeque::with_capacity(self.outgoing.len());
        for pending in &self.outgoing {
            if pending.index < timestamp.acknowledged {
                continue;
            }
            let rebased = transform(&incoming, &pending.operation, priority);
            let pending_rebased = transform(&pending.operation, &incoming, !priority);
            trace!(index = pending.index, %incoming, %rebased, "fold");
            outgoing.push_back(Pending {
                index: pending.index,
                operation: pending_rebased,
            });
            incoming = rebased;
        }

        document.apply(&incoming)?;

        self.outgoing = outgoing;
        self.remote_acknowledged = timestamp.acknowledged;
        self.acknowledged += 1;
        debug!(
            role = ?self.role,
            operation = %incoming,
            acknowledged = self.acknowledged,
            pending = self.outgoing.len(),
            "receive"
        );
        return Ok(incoming);
    }

    /// Reject positions no state the other side could have seen would
    /// contain. That state is at most the text here with every pending
    /// delete undone, and the operation's own inserts can only grow it.
    fn check_reach(&self, operation: &Operation, document: &Document) -> Result<(), Error> {
        let mut limit = document.len();
        for pending in &self.outgoing {
            for primitive in pending.operation.primitives() {
                if let Operation::Delete(del) = primitive {
                    limit = limit.saturating_add(del.len());
                }
            }
        }
        let primitives = operation.primitives();
        for primitive in &primitives {
            if let Operation::Insert(ins) = primitive {
                limit = limit.saturating_add(ins.len());
            }
        }
        for primitive in &primitives {
            let (position, len) = match primitive {
                Operation::Insert(ins) => (ins.position(), ins.len()),
                Operation::Delete(del) => (del.position(), del.len()),
                Operation::NoOp | Operation::Split(_) => continue,
            };
            match position.checked_add(len) {
                Some(end) if end <= limit => {}
                _ => return Err(Error::OutOfBounds { position, len: limit }),
            }
        }
        return Ok(());
    }

    fn check(&self, timestamp: Timestamp) -> Result<(), CausalityViolation> {
        if timestamp.generated != self.acknowledged {
            return Err(CausalityViolation::OutOfOrder {
                expected: self.acknowledged,
                received: timestamp.generated,
            });
        }
        if timestamp.acknowledged > self.generated {
            return Err(CausalityViolation::AcknowledgedAhead {
                acknowledged: timestamp.acknowledged,
                generated: self.generated,
            });
        }
        if timestamp.acknowledged < self.remote_acknowledged {
            return Err(CausalityViolation::AcknowledgedBehind {
                acknowledged: timestamp.acknowledged,
                pruned: self.remote_acknowledged,
            });
        }
        return Ok(());
    }
}
