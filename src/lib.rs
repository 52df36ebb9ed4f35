//! Concord - the consistency core of a client/server collaborative text
//! editor, built on operational transformation.
//!
//! Every participant edits its own replica immediately. Edits travel through
//! a central server as `(Operation, Timestamp)` messages; on arrival they are
//! transformed against whatever the receiver did concurrently, so that all
//! replicas end up with the same text.
//!
//! # Quick Start
//!
//! ```
//! use concord::client::Client;
//! use concord::config::Config;
//! use concord::document::Document;
//! use concord::ot::Operation;
//! use concord::server::Server;
//!
//! let mut server: Server<&str> = Server::new(Document::new("notes.txt", "abc"), Config::default());
//! let mut alice = Client::new(server.join("alice").unwrap());
//! let mut bob = Client::new(server.join("bob").unwrap());
//!
//! // Both type at the start of the document at the same time.
//! let from_alice = alice.edit(Operation::insert(0, "x").unwrap()).unwrap();
//! let from_bob = bob.edit(Operation::insert(0, "y").unwrap()).unwrap();
//!
//! let mut outgoing = server.receive(&"alice", from_alice).unwrap();
//! outgoing.extend(server.receive(&"bob", from_bob).unwrap());
//! for envelope in outgoing {
//!     let client = if envelope.to == "alice" { &mut alice } else { &mut bob };
//!     client.receive(envelope.message).unwrap();
//! }
//!
//! assert_eq!(alice.document().text(), server.document().text());
//! assert_eq!(bob.document().text(), server.document().text());
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod jupiter;
pub mod ot;
pub mod server;
pub mod session;

pub use error::Error;
pub use error::OpError;
