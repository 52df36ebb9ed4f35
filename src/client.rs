//! A client replica: one document and the client side of its channel.

use crate::document::Document;
use crate::error::Error;
use crate::jupiter::Jupiter;
use crate::jupiter::Message;
use crate::jupiter::Role;
use crate::ot::Operation;

/// A participant's local copy of a shared document.
#[derive(Clone, Debug)]
pub struct Client {
    document: Document,
    jupiter: Jupiter,
}

impl Client {
    /// Start from a snapshot handed out by the server on join.
    pub fn new(document: Document) -> Client {
        return Client {
            document,
            jupiter: Jupiter::new(Role::Client),
        };
    }

    pub fn document(&self) -> &Document {
        return &self.document;
    }

    pub fn jupiter(&self) -> &Jupiter {
        return &self.jupiter;
    }

    /// Apply a local edit immediately and return the message to send.
    pub fn edit(&mut self, operation: Operation) -> Result<Message, Error> {
        self.document.apply(&operation)?;
        return Ok(self.jupiter.generate(operation));
    }

    /// Integrate a message from the server, returning the operation that
    /// was applied locally.
    pub fn receive(&mut self, message: Message) -> Result<Operation, Error> {
        return self.jupiter.receive(message, &mut self.document);
    }
}
