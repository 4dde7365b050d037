//! Benchmarks for the transaction runner

use criterion::{criterion_group, criterion_main, Criterion};
use doctxn::txn::{Op, Runner};
use doctxn::{DocumentId, MemoryStore, Session, User};

fn txn_benchmarks(c: &mut Criterion) {
    let store = MemoryStore::new();
    let session = Session::new(Box::new(store.share()));
    let db = session.db("bench");
    let runner = Runner::new(db.collection("txns"));
    let alice = User::new("alice@gmail.com");
    let bob = User::new("bob@gmail.com");

    c.bench_function("two_insert_txn", |b| {
        b.iter(|| {
            let ops = vec![
                Op::insert("users", DocumentId::new(), &alice).unwrap(),
                Op::insert("users", DocumentId::new(), &bob).unwrap(),
            ];
            runner.run(ops, None, None).unwrap()
        })
    });

    c.bench_function("read_all_users", |b| {
        let users = db.collection("users");
        b.iter(|| users.find_all::<User>().unwrap().len())
    });
}

criterion_group!(benches, txn_benchmarks);
criterion_main!(benches);
