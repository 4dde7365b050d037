//! Tests for the write-then-read workflow
//!
//! These tests verify:
//! - Inserting alice and bob yields exactly those two records
//! - The bootstrap session survives the derived session's release
//! - The full cycle over TCP against the loopback server

use std::thread;
use std::time::Duration;

use doctxn::bootstrap::MemoryConnector;
use doctxn::network::Server;
use doctxn::workflow::{demo_users, insert_and_list};
use doctxn::txn::{Op, Runner};
use doctxn::{connect, Config, DocError, DocumentId, MemoryStore, TcpConnector, User};

// =============================================================================
// Helper Functions
// =============================================================================

fn sorted_emails(users: &[User]) -> Vec<String> {
    let mut emails: Vec<String> = users.iter().map(|u| u.email.clone()).collect();
    emails.sort();
    emails
}

// =============================================================================
// In-Memory Tests
// =============================================================================

#[test]
fn test_insert_and_list_on_empty_collection() {
    let store = MemoryStore::new();
    let config = Config::default();
    let session = connect(&MemoryConnector::new(&store), &config).session;

    let users = insert_and_list(&session, &config, &demo_users()).unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(sorted_emails(&users), vec!["alice@gmail.com", "bob@gmail.com"]);
    assert_eq!(store.document_count("test.users"), 2);
    assert_eq!(store.document_count("test.txns"), 1);
}

#[test]
fn test_bootstrap_session_survives_derived_release() {
    let store = MemoryStore::new();
    let config = Config::default();
    let session = connect(&MemoryConnector::new(&store), &config).session;

    insert_and_list(&session, &config, &demo_users()).unwrap();

    assert!(!session.is_closed());
    session.ping().unwrap();

    // A second cycle on the same bootstrap session still works
    let users = insert_and_list(&session, &config, &demo_users()).unwrap();
    assert_eq!(users.len(), 4);
}

#[test]
fn test_emails_are_not_validated() {
    let store = MemoryStore::new();
    let config = Config::default();
    let session = connect(&MemoryConnector::new(&store), &config).session;

    let users = insert_and_list(&session, &config, &[User::new(""), User::new("not-an-email")]).unwrap();

    assert_eq!(sorted_emails(&users), vec!["", "not-an-email"]);
}

#[test]
fn test_duplicate_id_cycle_leaves_collection_unchanged() {
    let store = MemoryStore::new();
    let config = Config::default();
    let session = connect(&MemoryConnector::new(&store), &config).session;
    let users = session.db("test").collection("users");
    let taken = DocumentId::new();
    users.insert(taken, &User::new("outside@gmail.com")).unwrap();

    let runner = Runner::new(session.db("test").collection("txns"));
    let ops = vec![
        Op::insert("users", DocumentId::new(), &User::new("alice@gmail.com")).unwrap(),
        Op::insert("users", taken, &User::new("bob@gmail.com")).unwrap(),
    ];
    assert!(matches!(runner.run(ops, None, None), Err(DocError::TxnAborted { .. })));

    let remaining: Vec<User> = users.find_all().unwrap();
    assert_eq!(remaining, vec![User::new("outside@gmail.com")]);
}

#[test]
fn test_custom_collections() {
    let store = MemoryStore::new();
    let config = Config::builder()
        .db_name("app")
        .collection("members")
        .txn_collection("members.log")
        .build();
    let session = connect(&MemoryConnector::new(&store), &config).session;

    insert_and_list(&session, &config, &demo_users()).unwrap();

    assert_eq!(store.document_count("app.members"), 2);
    assert_eq!(store.document_count("app.members.log"), 1);
    assert_eq!(store.document_count("test.users"), 0);
}

// =============================================================================
// TCP Tests
// =============================================================================

#[test]
fn test_insert_and_list_over_tcp() {
    let store = MemoryStore::new();
    let server_config = Config::builder().listen_addr("127.0.0.1:0").build();
    let mut server = Server::new(server_config, Box::new(store.share()));
    let addr = server.bind().unwrap();
    let shutdown = server.shutdown_handle();
    let join = thread::spawn(move || server.run().unwrap());

    let config = Config::builder()
        .address(addr.to_string())
        .retry_delay(Duration::from_millis(20))
        .build();
    let session = connect(&TcpConnector, &config).session;

    let users = insert_and_list(&session, &config, &demo_users()).unwrap();
    assert_eq!(sorted_emails(&users), vec!["alice@gmail.com", "bob@gmail.com"]);

    // Bootstrap session still usable after the derived one closed
    session.ping().unwrap();
    let again: Vec<User> = session.db("test").collection("users").find_all().unwrap();
    assert_eq!(again.len(), 2);

    session.close();
    shutdown.shutdown();
    join.join().unwrap();
}
