mod helpers;

use helpers::{manager, owner, seed_contacts, sqlite_edges, stored_edges, test_db};
use kith::graph::edge_store::EdgeStore;
use kith::graph::error::RelationshipError;
use kith::graph::types::{Direction, Edge, Identity};

#[tokio::test]
async fn mutual_create_writes_both_edges() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let edges = sqlite_edges(&db);
    let manager = manager(&db, edges.clone());

    let rel = manager
        .create_relationship(&owner(), "alice", "bob", "friend", true)
        .await
        .unwrap();
    assert!(rel.is_mutual);
    assert_eq!(rel.contact_a, "alice");
    assert_eq!(rel.contact_b, "bob");

    let forward = edges.find("alice", "bob", "friend").await.unwrap().unwrap();
    let reverse = edges.find("bob", "alice", "friend").await.unwrap().unwrap();
    assert!(forward.is_mutual && reverse.is_mutual);
    assert_eq!(stored_edges(&db).len(), 2);
}

#[tokio::test]
async fn mutual_pair_is_listed_once_from_each_side() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let manager = manager(&db, sqlite_edges(&db));

    manager
        .create_relationship(&owner(), "alice", "bob", "friend", true)
        .await
        .unwrap();

    let for_alice = manager
        .list_relationships_for_contact(&owner(), "alice")
        .await
        .unwrap();
    assert_eq!(for_alice.len(), 1);
    assert_eq!(for_alice[0].other_id, "bob");
    assert_eq!(for_alice[0].direction, Direction::Outgoing);
    assert_eq!(
        for_alice[0].other.as_ref().map(|c| c.name.as_str()),
        Some("Contact bob")
    );

    let for_bob = manager
        .list_relationships_for_contact(&owner(), "bob")
        .await
        .unwrap();
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0].other_id, "alice");
    // Bob's own outgoing half wins the dedup.
    assert_eq!(for_bob[0].direction, Direction::Outgoing);
    assert_eq!(for_alice[0].relationship.pair_key, for_bob[0].relationship.pair_key);
}

#[tokio::test]
async fn one_way_relationship_is_visible_from_both_ends() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let manager = manager(&db, sqlite_edges(&db));

    let rel = manager
        .create_relationship(&owner(), "alice", "bob", "mentor", false)
        .await
        .unwrap();
    assert!(!rel.is_mutual);
    assert_eq!(stored_edges(&db).len(), 1);

    let for_bob = manager
        .list_relationships_for_contact(&owner(), "bob")
        .await
        .unwrap();
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0].direction, Direction::Incoming);
    assert_eq!(for_bob[0].other_id, "alice");
    assert!(!for_bob[0].relationship.is_mutual);
}

#[tokio::test]
async fn types_are_listed_separately() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob", "carol"]);
    let manager = manager(&db, sqlite_edges(&db));

    manager
        .create_relationship(&owner(), "alice", "bob", "friend", true)
        .await
        .unwrap();
    manager
        .create_relationship(&owner(), "alice", "bob", "coworker", false)
        .await
        .unwrap();
    manager
        .create_relationship(&owner(), "carol", "alice", "sibling", true)
        .await
        .unwrap();

    let mut types: Vec<String> = manager
        .list_relationships_for_contact(&owner(), "alice")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.relationship.relationship_type)
        .collect();
    types.sort();
    assert_eq!(types, vec!["coworker", "friend", "sibling"]);
}

#[tokio::test]
async fn duplicate_create_is_a_conflict_and_writes_nothing() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let manager = manager(&db, sqlite_edges(&db));

    manager
        .create_relationship(&owner(), "alice", "bob", "friend", true)
        .await
        .unwrap();

    let again = manager
        .create_relationship(&owner(), "alice", "bob", "friend", true)
        .await;
    assert!(matches!(again, Err(RelationshipError::Conflict(_))));

    // The reverse direction is taken by the reciprocal too.
    let reverse = manager
        .create_relationship(&owner(), "bob", "alice", "friend", true)
        .await;
    assert!(matches!(reverse, Err(RelationshipError::Conflict(_))));

    assert_eq!(stored_edges(&db).len(), 2);
    assert_eq!(
        manager
            .list_relationships_for_contact(&owner(), "alice")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn type_is_trimmed_before_storing() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let edges = sqlite_edges(&db);
    let manager = manager(&db, edges.clone());

    manager
        .create_relationship(&owner(), "alice", "bob", "  friend ", false)
        .await
        .unwrap();
    assert!(edges.find("alice", "bob", "friend").await.unwrap().is_some());

    let dup = manager
        .create_relationship(&owner(), "alice", "bob", "friend", false)
        .await;
    assert!(matches!(dup, Err(RelationshipError::Conflict(_))));
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let manager = manager(&db, sqlite_edges(&db));

    let self_rel = manager
        .create_relationship(&owner(), "alice", "alice", "friend", true)
        .await;
    assert!(matches!(self_rel, Err(RelationshipError::Validation(_))));

    let empty_type = manager
        .create_relationship(&owner(), "alice", "bob", "   ", true)
        .await;
    assert!(matches!(empty_type, Err(RelationshipError::Validation(_))));

    assert!(stored_edges(&db).is_empty());
}

#[tokio::test]
async fn unknown_contact_is_not_found() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice"]);
    let manager = manager(&db, sqlite_edges(&db));

    let result = manager
        .create_relationship(&owner(), "alice", "ghost", "friend", true)
        .await;
    assert!(matches!(result, Err(RelationshipError::NotFound(_))));
    assert!(stored_edges(&db).is_empty());
}

#[tokio::test]
async fn contacts_of_another_owner_are_invisible() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice"]);
    seed_contacts(&db, "someone-else", &["mallory"]);
    let manager = manager(&db, sqlite_edges(&db));

    let result = manager
        .create_relationship(&owner(), "alice", "mallory", "friend", false)
        .await;
    assert!(matches!(result, Err(RelationshipError::NotFound(_))));

    let theirs = Identity::new("someone-else");
    let result = manager
        .create_relationship(&theirs, "mallory", "alice", "friend", false)
        .await;
    assert!(matches!(result, Err(RelationshipError::NotFound(_))));
}

#[tokio::test]
async fn list_keeps_entries_whose_other_contact_is_gone() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let manager = manager(&db, sqlite_edges(&db));

    manager
        .create_relationship(&owner(), "alice", "bob", "friend", true)
        .await
        .unwrap();
    db.lock()
        .unwrap()
        .execute("DELETE FROM contacts WHERE id = 'bob'", [])
        .unwrap();

    let listed = manager
        .list_relationships_for_contact(&owner(), "alice")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].other_id, "bob");
    assert!(listed[0].other.is_none());
}

#[tokio::test]
async fn listing_an_isolated_contact_is_empty() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice"]);
    let manager = manager(&db, sqlite_edges(&db));

    let listed = manager
        .list_relationships_for_contact(&owner(), "alice")
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn create_list_delete_round_trip() {
    let db = test_db();
    seed_contacts(&db, "default", &["A", "B"]);
    let manager = manager(&db, sqlite_edges(&db));

    manager
        .create_relationship(&owner(), "A", "B", "friend", true)
        .await
        .unwrap();

    for (me, other) in [("A", "B"), ("B", "A")] {
        let listed = manager
            .list_relationships_for_contact(&owner(), me)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].other_id, other);
        assert_eq!(listed[0].relationship.relationship_type, "friend");
        assert!(listed[0].relationship.is_mutual);
    }

    manager
        .delete_relationship(&owner(), "A", "B", "friend")
        .await
        .unwrap();

    for me in ["A", "B"] {
        assert!(manager
            .list_relationships_for_contact(&owner(), me)
            .await
            .unwrap()
            .is_empty());
    }
}

#[tokio::test]
async fn reverse_edge_under_same_pair_key_is_a_conflict() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let manager = manager(&db, sqlite_edges(&db));

    manager
        .create_relationship(&owner(), "alice", "bob", "follows", false)
        .await
        .unwrap();

    let reverse = manager
        .create_relationship(&owner(), "bob", "alice", "follows", false)
        .await;
    assert!(matches!(reverse, Err(RelationshipError::Conflict(_))));
    assert_eq!(stored_edges(&db).len(), 1);

    // Both sides still see the same single relationship.
    for contact in ["alice", "bob"] {
        let listed = manager
            .list_relationships_for_contact(&owner(), contact)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].relationship.contact_a, "alice");
    }
}

#[tokio::test]
async fn one_way_over_mutual_reverse_is_a_conflict() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let edges = sqlite_edges(&db);
    let manager = manager(&db, edges.clone());

    // Only the reverse half of a mutual pair is stored.
    edges.create(Edge::new("bob", "alice", "friend", true)).await.unwrap();

    for mutual in [false, true] {
        let result = manager
            .create_relationship(&owner(), "alice", "bob", "friend", mutual)
            .await;
        assert!(matches!(result, Err(RelationshipError::Conflict(_))));
    }
    assert_eq!(stored_edges(&db).len(), 1);
}

#[tokio::test]
async fn mutual_request_joins_one_way_reverse_edge() {
    let db = test_db();
    seed_contacts(&db, "default", &["alice", "bob"]);
    let edges = sqlite_edges(&db);
    let manager = manager(&db, edges.clone());

    manager
        .create_relationship(&owner(), "alice", "bob", "follows", false)
        .await
        .unwrap();
    let rel = manager
        .create_relationship(&owner(), "bob", "alice", "follows", true)
        .await
        .unwrap();
    assert!(rel.is_mutual);

    let stored = stored_edges(&db);
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|e| e.is_mutual));

    let listed = manager
        .list_relationships_for_contact(&owner(), "alice")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].relationship.is_mutual);
}
