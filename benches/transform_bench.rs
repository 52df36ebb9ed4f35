// Transformation and session throughput.

use criterion::BatchSize;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use concord::client::Client;
use concord::config::Config;
use concord::document::Document;
use concord::ot::Operation;
use concord::ot::transform;
use concord::server::Server;

fn bench_transform(c: &mut Criterion) {
    let delete = Operation::delete(10, "a".repeat(40)).unwrap();
    let insert = Operation::insert(30, "hello").unwrap();
    let nested = Operation::split(
        Operation::delete(5, "bbbb").unwrap(),
        Operation::split(Operation::insert(20, "xyz").unwrap(), Operation::delete(40, "cc").unwrap()).unwrap(),
    )
    .unwrap();

    c.bench_function("transform delete/insert split", |b| {
        b.iter(|| transform(black_box(&delete), black_box(&insert), false))
    });
    c.bench_function("transform nested split/delete", |b| {
        b.iter(|| transform(black_box(&nested), black_box(&delete), true))
    });
}

fn bench_session(c: &mut Criterion) {
    let text = "lorem ipsum dolor sit amet ".repeat(40);

    c.bench_function("two clients, 100 concurrent edits each", |b| {
        b.iter_batched(
            || {
                let mut server: Server<u8> = Server::new(Document::new("bench.txt", &text), Config::default());
                let alice = Client::new(server.join(0).unwrap());
                let bob = Client::new(server.join(1).unwrap());
                (server, alice, bob)
            },
            |(mut server, mut alice, mut bob)| {
                let mut up = Vec::new();
                for i in 0..100 {
                    up.push((0, alice.edit(Operation::insert(i * 3, "a").unwrap()).unwrap()));
                    up.push((1, bob.edit(Operation::insert(i * 5, "b").unwrap()).unwrap()));
                }
                let mut down = Vec::new();
                for (from, message) in up {
                    down.extend(server.receive(&from, message).unwrap());
                }
                for envelope in down {
                    let client = if envelope.to == 0 { &mut alice } else { &mut bob };
                    client.receive(envelope.message).unwrap();
                }
                black_box(server.document().len())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_transform, bench_session);
criterion_main!(benches);
