//! Tests for Session and Collection handles
//!
//! These tests verify:
//! - Derived sessions are independently closable
//! - Closed handles reject every operation
//! - Collection reads and writes over the in-memory store

use doctxn::{DocError, DocumentId, MemoryStore, Session, Store, User};

// =============================================================================
// Helper Functions
// =============================================================================

fn memory_session(store: &MemoryStore) -> Session {
    Session::new(Box::new(store.share()))
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_closing_copy_keeps_original_open() {
    let store = MemoryStore::new();
    let session = memory_session(&store);

    let copy = session.copy();
    copy.ping().unwrap();
    copy.close();

    assert!(!session.is_closed());
    session.ping().unwrap();
    session
        .db("test")
        .collection("users")
        .insert(DocumentId::new(), &User::new("carol@gmail.com"))
        .unwrap();
}

#[test]
fn test_copy_dropped_at_scope_end_keeps_original_open() {
    let store = MemoryStore::new();
    let session = memory_session(&store);

    {
        let copy = session.copy();
        copy.db("test")
            .collection("users")
            .insert(DocumentId::new(), &User::new("dave@gmail.com"))
            .unwrap();
    }

    assert_eq!(session.db("test").collection("users").count().unwrap(), 1);
}

#[test]
fn test_closed_store_handle_rejects_operations() {
    let store = MemoryStore::new();
    let handle = store.share();
    handle.close();

    assert!(handle.is_closed());
    assert!(matches!(handle.ping(), Err(DocError::SessionClosed)));
    assert!(matches!(
        handle.get("test.users", DocumentId::new()),
        Err(DocError::SessionClosed)
    ));

    // Other handles on the same data are unaffected
    store.ping().unwrap();
}

#[test]
fn test_copies_share_data() {
    let store = MemoryStore::new();
    let session = memory_session(&store);
    let copy = session.copy();
    let id = DocumentId::new();

    copy.db("test")
        .collection("users")
        .insert(id, &User::new("erin@gmail.com"))
        .unwrap();

    let found: Option<User> = session.db("test").collection("users").find_one(id).unwrap();
    assert_eq!(found, Some(User::new("erin@gmail.com")));
}

// =============================================================================
// Collection Tests
// =============================================================================

#[test]
fn test_collection_names() {
    let store = MemoryStore::new();
    let session = memory_session(&store);
    let db = session.db("test");
    let users = db.collection("users");

    assert_eq!(db.name(), "test");
    assert_eq!(users.name(), "users");
    assert_eq!(users.db_name(), "test");
    assert_eq!(users.full_name(), "test.users");
}

#[test]
fn test_insert_duplicate_id_fails() {
    let store = MemoryStore::new();
    let session = memory_session(&store);
    let users = session.db("test").collection("users");
    let id = DocumentId::new();

    users.insert(id, &User::new("a@example.com")).unwrap();
    let err = users.insert(id, &User::new("b@example.com")).unwrap_err();

    assert!(matches!(err, DocError::DuplicateKey { .. }));
    let kept: User = users.find_one(id).unwrap().unwrap();
    assert_eq!(kept.email, "a@example.com");
}

#[test]
fn test_find_all_and_remove() {
    let store = MemoryStore::new();
    let session = memory_session(&store);
    let users = session.db("test").collection("users");
    let first = DocumentId::new();
    let second = DocumentId::new();

    users.insert(first, &User::new("one@example.com")).unwrap();
    users.insert(second, &User::new("two@example.com")).unwrap();

    let mut emails: Vec<String> = users
        .find_all::<User>()
        .unwrap()
        .into_iter()
        .map(|u| u.email)
        .collect();
    emails.sort();
    assert_eq!(emails, vec!["one@example.com", "two@example.com"]);

    assert!(users.remove(first).unwrap());
    assert!(!users.remove(first).unwrap());

    let remaining = users.find_all_with_ids::<User>().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].0, second);
}

#[test]
fn test_collections_are_isolated() {
    let store = MemoryStore::new();
    let session = memory_session(&store);

    session
        .db("test")
        .collection("users")
        .insert(DocumentId::new(), &User::new("x@example.com"))
        .unwrap();

    assert_eq!(session.db("test").collection("admins").count().unwrap(), 0);
    assert_eq!(session.db("other").collection("users").count().unwrap(), 0);
    assert_eq!(store.document_count("test.users"), 1);
}

#[test]
fn test_user_display() {
    assert_eq!(User::new("alice@gmail.com").to_string(), "{email: alice@gmail.com}");
}
