//! A server session running as a single tokio task.
//!
//! The task owns the `Server` outright and processes one command at a time,
//! so the authoritative document is only ever touched by one operation at
//! once and every channel sees its generates and receives in a single,
//! well-defined order. Callers talk to it through a cloneable
//! `SessionHandle`; forwarded messages come out of one unbounded receiver
//! per participant, in the order the server generated them.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;

use crate::config::Config;
use crate::document::Document;
use crate::error::Error;
use crate::jupiter::Message;
use crate::ot::Operation;
use crate::server::Envelope;
use crate::server::Server;

/// Everything a participant needs after joining: the snapshot to build its
/// replica from and the stream of messages the server sends it.
pub struct Joined {
    pub snapshot: Document,
    pub inbox: mpsc::UnboundedReceiver<Message>,
}

enum Command<P> {
    Join {
        participant: P,
        reply: oneshot::Sender<Result<Joined, Error>>,
    },
    Leave {
        participant: P,
        reply: oneshot::Sender<bool>,
    },
    Submit {
        from: P,
        message: Message,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Edit {
        operation: Operation,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Snapshot {
        reply: oneshot::Sender<Document>,
    },
}

/// Handle to a running session. Dropping every handle stops the task.
pub struct SessionHandle<P> {
    commands: mpsc::Sender<Command<P>>,
}

impl<P> Clone for SessionHandle<P> {
    fn clone(&self) -> Self {
        return SessionHandle {
            commands: self.commands.clone(),
        };
    }
}

/// Spawn a session task for `document` on the current tokio runtime.
pub fn spawn<P>(document: Document, config: Config) -> SessionHandle<P>
where
    P: Clone + Eq + Hash + fmt::Debug + Send + 'static,
{
    let (commands, mailbox) = mpsc::channel(config.mailbox_capacity);
    let actor = Actor {
        server: Server::new(document, config),
        outboxes: FxHashMap::default(),
    };
    tokio::spawn(actor.run(mailbox));
    return SessionHandle { commands };
}

impl<P> SessionHandle<P>
where
    P: Send + 'static,
{
    async fn request<T>(&self, command: Command<P>, response: oneshot::Receiver<T>) -> Result<T, Error> {
        if self.commands.send(command).await.is_err() {
            return Err(Error::SessionClosed);
        }
        return response.await.map_err(|_| Error::SessionClosed);
    }

    /// Join the session.
    pub async fn join(&self, participant: P) -> Result<Joined, Error> {
        let (reply, response) = oneshot::channel();
        return self.request(Command::Join { participant, reply }, response).await?;
    }

    /// Leave the session. Returns whether the participant was connected.
    pub async fn leave(&self, participant: P) -> Result<bool, Error> {
        let (reply, response) = oneshot::channel();
        return self.request(Command::Leave { participant, reply }, response).await;
    }

    /// Hand a participant's message to the server. By the time this
    /// returns, the forwarded messages are already in the other
    /// participants' inboxes.
    pub async fn submit(&self, from: P, message: Message) -> Result<(), Error> {
        let (reply, response) = oneshot::channel();
        return self.request(Command::Submit { from, message, reply }, response).await?;
    }

    /// Edit the document on the server's own behalf.
    pub async fn edit(&self, operation: Operation) -> Result<(), Error> {
        let (reply, response) = oneshot::channel();
        return self.request(Command::Edit { operation, reply }, response).await?;
    }

    /// A copy of the authoritative document.
    pub async fn snapshot(&self) -> Result<Document, Error> {
        let (reply, response) = oneshot::channel();
        return self.request(Command::Snapshot { reply }, response).await;
    }
}

struct Actor<P: Clone + Eq + Hash + fmt::Debug> {
    server: Server<P>,
    outboxes: FxHashMap<P, mpsc::UnboundedSender<Message>>,
}

impl<P: Clone + Eq + Hash + fmt::Debug> Actor<P> {
    async fn run(mut self, mut mailbox: mpsc::Receiver<Command<P>>) {
        debug!(path = self.server.document().path(), "session started");
        while let Some(command) = mailbox.recv().await {
            self.handle(command);
        }
        debug!(path = self.server.document().path(), "session stopped");
    }

    fn handle(&mut self, command: Command<P>) {
        // A caller that gave up waiting has dropped its reply receiver;
        // there is nobody left to tell.
        match command {
            Command::Join { participant, reply } => {
                let joined = self.join(participant);
                let _ = reply.send(joined);
            }
            Command::Leave { participant, reply } => {
                self.outboxes.remove(&participant);
                let _ = reply.send(self.server.leave(&participant));
            }
            Command::Submit { from, message, reply } => {
                let result = self.server.receive(&from, message).map(|envelopes| self.deliver(envelopes));
                let _ = reply.send(result);
            }
            Command::Edit { operation, reply } => {
                let result = self.server.edit(operation).map(|envelopes| self.deliver(envelopes));
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.server.document().clone());
            }
        }
    }

    fn join(&mut self, participant: P) -> Result<Joined, Error> {
        let snapshot = self.server.join(participant.clone())?;
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.outboxes.insert(participant, outbox);
        return Ok(Joined { snapshot, inbox });
    }

    fn deliver(&mut self, envelopes: Vec<Envelope<P>>) {
        for Envelope { to, message } in envelopes {
            let Some(outbox) = self.outboxes.get(&to) else {
                continue;
            };
            if outbox.send(message).is_err() {
                // The channel stays open on the server side; the
                // participant has to leave explicitly.
                warn!(participant = ?to, "participant inbox closed");
            }
        }
    }
}
