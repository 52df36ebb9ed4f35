//! The arbitrating server: the authoritative document and one channel per
//! participant.
//!
//! Every operation that reaches the server is integrated on the sender's
//! channel, applied to the authoritative document once, and then generated
//! on every other channel as if it were a local edit of the server. That
//! keeps each channel a plain two-party Jupiter exchange, however many
//! participants there are.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::Config;
use crate::document::Document;
use crate::error::Error;
use crate::jupiter::Jupiter;
use crate::jupiter::Message;
use crate::jupiter::Role;
use crate::ot::Operation;

/// A message addressed to one participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope<P> {
    pub to: P,
    pub message: Message,
}

/// The server side of a shared document.
///
/// Generic over the participant id so that callers can use whatever
/// identifies a connection (a user id, a public key, a socket address).
#[derive(Clone, Debug)]
pub struct Server<P: Clone + Eq + Hash + fmt::Debug> {
    document: Document,
    pairs: FxHashMap<P, Jupiter>,
    config: Config,
}

impl<P: Clone + Eq + Hash + fmt::Debug> Server<P> {
    pub fn new(document: Document, config: Config) -> Server<P> {
        return Server {
            document,
            pairs: FxHashMap::default(),
            config,
        };
    }

    /// The authoritative document.
    pub fn document(&self) -> &Document {
        return &self.document;
    }

    /// The limits this server was started with.
    pub fn config(&self) -> &Config {
        return &self.config;
    }

    /// Connected participants, in no particular order.
    pub fn participants(&self) -> impl Iterator<Item = &P> {
        return self.pairs.keys();
    }

    /// The server side of a participant's channel.
    pub fn pair(&self, participant: &P) -> Option<&Jupiter> {
        return self.pairs.get(participant);
    }

    /// Open a channel for a new participant and hand back the snapshot it
    /// must start from.
    pub fn join(&mut self, participant: P) -> Result<Document, Error> {
        if self.pairs.contains_key(&participant) {
            return Err(Error::DuplicateParticipant);
        }
        if let Some(max) = self.config.max_participants {
            if self.pairs.len() >= max {
                return Err(Error::SessionFull { max });
            }
        }
        debug!(?participant, len = self.document.len(), "join");
        self.pairs.insert(participant, Jupiter::new(Role::Server));
        return Ok(self.document.clone());
    }

    /// Close a participant's channel. Returns whether it was connected.
    pub fn leave(&mut self, participant: &P) -> bool {
        let removed = self.pairs.remove(participant).is_some();
        debug!(?participant, removed, "leave");
        return removed;
    }

    /// Integrate a message from `from` and return what must be forwarded to
    /// everyone else.
    pub fn receive(&mut self, from: &P, message: Message) -> Result<Vec<Envelope<P>>, Error> {
        let Some(pair) = self.pairs.get_mut(from) else {
            return Err(Error::UnknownParticipant);
        };
        let applied = match pair.receive(message, &mut self.document) {
            Ok(applied) => applied,
            Err(err) => {
                warn!(participant = ?from, %err, "failed to integrate operation");
                return Err(err);
            }
        };
        return Ok(self.fan_out(&applied, Some(from)));
    }

    /// Apply an edit made on the server itself and address it to every
    /// participant.
    pub fn edit(&mut self, operation: Operation) -> Result<Vec<Envelope<P>>, Error> {
        self.document.apply(&operation)?;
        return Ok(self.fan_out(&operation, None));
    }

    /// Generate `operation` on every channel except `except`'s. The document
    /// already holds it.
    fn fan_out(&mut self, operation: &Operation, except: Option<&P>) -> Vec<Envelope<P>> {
        if operation.is_noop() {
            trace!("nothing to forward");
            return Vec::new();
        }
        let mut envelopes = Vec::with_capacity(self.pairs.len());
        for (participant, pair) in self.pairs.iter_mut() {
            if except == Some(participant) {
                continue;
            }
            envelopes.push(Envelope {
                to: participant.clone(),
                message: pair.generate(operation.clone()),
            });
        }
        return envelopes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    fn ins(position: usize, content: &str) -> Operation {
        return Operation::insert(position, content).unwrap();
    }

    #[test]
    fn join_hands_out_current_snapshot() {
        let mut server: Server<u32> = Server::new(Document::new("f", "abc"), Config::default());
        server.edit(ins(3, "d")).unwrap();
        let snapshot = server.join(1).unwrap();
        assert_eq!(snapshot.text(), "abcd");
        assert_eq!(server.pair(&1).map(|p| p.generated()), Some(0));
    }

    #[test]
    fn duplicate_and_overflowing_joins_are_rejected() {
        let config = Config::new().max_participants(1);
        let mut server: Server<u32> = Server::new(Document::new("f", ""), config);
        assert_eq!(server.config().max_participants, Some(1));
        server.join(1).unwrap();
        assert_eq!(server.join(1), Err(Error::DuplicateParticipant));
        assert_eq!(server.join(2), Err(Error::SessionFull { max: 1 }));
    }

    #[test]
    fn leave_removes_only_that_channel() {
        let mut server: Server<u32> = Server::new(Document::new("f", "x"), Config::default());
        server.join(1).unwrap();
        server.join(2).unwrap();
        assert!(server.leave(&1));
        assert!(!server.leave(&1));
        let mut remaining: Vec<u32> = server.participants().copied().collect();
        remaining.sort();
        assert_eq!(remaining, vec![2]);
        assert_eq!(server.document().text(), "x");
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let mut server: Server<u32> = Server::new(Document::new("f", ""), Config::default());
        let mut client = Client::new(Document::new("f", ""));
        let message = client.edit(ins(0, "a")).unwrap();
        assert_eq!(server.receive(&7, message), Err(Error::UnknownParticipant));
    }

    #[test]
    fn receive_forwards_to_everyone_but_the_sender() {
        let mut server: Server<u32> = Server::new(Document::new("f", "abc"), Config::default());
        let mut alice = Client::new(server.join(1).unwrap());
        let mut bob = Client::new(server.join(2).unwrap());
        let mut carol = Client::new(server.join(3).unwrap());

        let message = alice.edit(ins(1, "X")).unwrap();
        let envelopes = server.receive(&1, message).unwrap();
        assert_eq!(server.document().text(), "aXbc");

        let mut recipients: Vec<u32> = envelopes.iter().map(|e| e.to).collect();
        recipients.sort();
        assert_eq!(recipients, vec![2, 3]);

        for envelope in envelopes {
            let client = if envelope.to == 2 { &mut bob } else { &mut carol };
            client.receive(envelope.message).unwrap();
        }
        assert_eq!(bob.document().text(), "aXbc");
        assert_eq!(carol.document().text(), "aXbc");
        // The sender's channel only counts the receipt.
        assert_eq!(server.pair(&1).map(|p| p.generated()), Some(0));
        assert_eq!(server.pair(&2).map(|p| p.generated()), Some(1));
    }

    #[test]
    fn noop_results_are_not_forwarded() {
        let mut server: Server<u32> = Server::new(Document::new("f", "abc"), Config::default());
        let mut alice = Client::new(server.join(1).unwrap());
        let mut bob = Client::new(server.join(2).unwrap());

        let from_alice = alice.edit(Operation::delete(1, "b").unwrap()).unwrap();
        let from_bob = bob.edit(Operation::delete(1, "b").unwrap()).unwrap();

        let to_bob = server.receive(&1, from_alice).unwrap();
        assert_eq!(to_bob.len(), 1);
        // Bob deleted the same character; nothing is left to tell alice.
        let to_alice = server.receive(&2, from_bob).unwrap();
        assert!(to_alice.is_empty());
        assert_eq!(server.document().text(), "ac");

        for envelope in to_bob {
            assert!(bob.receive(envelope.message).unwrap().is_noop());
        }
        assert_eq!(alice.document().text(), "ac");
        assert_eq!(bob.document().text(), "ac");
    }

    #[test]
    fn overlapping_deletes_forward_the_remainder() {
        let mut server: Server<u32> = Server::new(Document::new("f", "abc"), Config::default());
        let mut alice = Client::new(server.join(1).unwrap());
        let mut bob = Client::new(server.join(2).unwrap());

        let from_alice = alice.edit(Operation::delete(1, "b").unwrap()).unwrap();
        let from_bob = bob.edit(Operation::delete(0, "abc").unwrap()).unwrap();

        let to_bob = server.receive(&1, from_alice).unwrap();
        let to_alice = server.receive(&2, from_bob).unwrap();
        assert_eq!(server.document().text(), "");

        for envelope in to_bob {
            assert!(bob.receive(envelope.message).unwrap().is_noop());
        }
        for envelope in to_alice {
            alice.receive(envelope.message).unwrap();
        }
        assert_eq!(alice.document().text(), "");
        assert_eq!(bob.document().text(), "");
    }
}
