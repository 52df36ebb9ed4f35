//! Runs the three-way dOPT puzzle through a session task and prints every
//! replica. Set `RUST_LOG=concord=debug` (or `trace`) to watch the
//! transformations.

use concord::client::Client;
use concord::config::Config;
use concord::document::Document;
use concord::ot::Operation;
use concord::session;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), concord::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = session::spawn(Document::new("puzzle.txt", "abcd"), Config::default());

    let names = ["alice", "bob", "carol"];
    let mut clients = Vec::new();
    for name in names {
        let joined = session.join(name).await?;
        clients.push((name, Client::new(joined.snapshot), joined.inbox));
    }

    // Everyone types at position 0 before hearing from anyone else.
    let mut sent = Vec::new();
    for (i, (name, client, _)) in clients.iter_mut().enumerate() {
        let text = ["1", "2", "3"][i];
        sent.push((*name, client.edit(Operation::insert(0, text)?)?));
    }
    for (name, message) in sent {
        session.submit(name, message).await?;
    }

    for (_, client, inbox) in clients.iter_mut() {
        while let Ok(message) = inbox.try_recv() {
            client.receive(message)?;
        }
    }

    let server = session.snapshot().await?;
    println!("server: {}  {:02x?}", server, &server.checksum().0[..4]);
    for (name, client, _) in &clients {
        let doc = client.document();
        println!("{:>6}: {}  {:02x?}", name, doc, &doc.checksum().0[..4]);
    }
    return Ok(());
}
