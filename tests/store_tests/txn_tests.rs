//! Tests for Store transactions
//!
//! These tests verify:
//! - update commits on Ok and aborts on Err
//! - view sees only committed state
//! - Bucket create/delete inside a transaction
//! - Missing buckets are reported, never created implicitly
//! - Ordered iteration and counts
//! - Concurrent readers alongside a writer

use std::sync::Arc;
use std::thread;

use bucketkv::config::{StoreConfig, DEFAULT_BUCKET};
use bucketkv::{Client, StoreError, TransactionRunner};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_client() -> (TempDir, Client) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::builder()
        .path(temp_dir.path().join("txn.redb"))
        .buckets([DEFAULT_BUCKET, "users"])
        .no_sync(true)
        .build();
    let mut client = Client::new(config);
    client.open().unwrap();
    (temp_dir, client)
}

// =============================================================================
// Update / View Tests
// =============================================================================

#[test]
fn test_update_then_view() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    store
        .update(|tx| {
            tx.put("users", b"alice", b"1")?;
            tx.put("users", b"bob", b"2")
        })
        .unwrap();

    let (alice, bob) = store
        .view(|tx| Ok((tx.get("users", b"alice")?, tx.get("users", b"bob")?)))
        .unwrap();
    assert_eq!(alice, Some(b"1".to_vec()));
    assert_eq!(bob, Some(b"2".to_vec()));
}

#[test]
fn test_update_returns_closure_value() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    let created = store
        .update(|tx| tx.create_bucket_if_not_exists("events"))
        .unwrap();

    assert!(created);
}

#[test]
fn test_update_error_aborts_all_changes() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    let result: bucketkv::Result<()> = store.update(|tx| {
        tx.put("users", b"carol", b"3")?;
        tx.create_bucket_if_not_exists("events")?;
        Err(StoreError::Transaction("rejected".to_string()))
    });

    assert!(matches!(result, Err(StoreError::Transaction(ref m)) if m == "rejected"));
    store
        .view(|tx| {
            assert_eq!(tx.get("users", b"carol")?, None);
            assert!(!tx.bucket_exists("events")?);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_write_tx_reads_its_own_writes() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    let seen = store
        .update(|tx| {
            tx.put("users", b"dave", b"4")?;
            tx.get("users", b"dave")
        })
        .unwrap();

    assert_eq!(seen, Some(b"4".to_vec()));
}

#[test]
fn test_overwrite_and_delete() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    store.update(|tx| tx.put("users", b"k", b"old")).unwrap();
    store.update(|tx| tx.put("users", b"k", b"new")).unwrap();
    assert_eq!(
        store.view(|tx| tx.get("users", b"k")).unwrap(),
        Some(b"new".to_vec())
    );

    assert!(store.update(|tx| tx.delete("users", b"k")).unwrap());
    assert!(!store.update(|tx| tx.delete("users", b"k")).unwrap());
    assert_eq!(store.view(|tx| tx.get("users", b"k")).unwrap(), None);
}

// =============================================================================
// Bucket Tests
// =============================================================================

#[test]
fn test_put_into_missing_bucket_fails() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    let err = store
        .update(|tx| tx.put("missing", b"k", b"v"))
        .unwrap_err();

    assert!(matches!(err, StoreError::BucketNotFound(ref name) if name == "missing"));
    assert!(!store.view(|tx| tx.bucket_exists("missing")).unwrap());
}

#[test]
fn test_read_from_missing_bucket_fails() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    let err = store.view(|tx| tx.get("missing", b"k")).unwrap_err();
    assert!(matches!(err, StoreError::BucketNotFound(_)));

    let err = store.update(|tx| tx.len("missing")).unwrap_err();
    assert!(matches!(err, StoreError::BucketNotFound(_)));
}

#[test]
fn test_create_bucket_is_idempotent() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    assert!(store
        .update(|tx| tx.create_bucket_if_not_exists("events"))
        .unwrap());
    store.update(|tx| tx.put("events", b"e1", b"x")).unwrap();
    assert!(!store
        .update(|tx| tx.create_bucket_if_not_exists("events"))
        .unwrap());

    assert_eq!(store.view(|tx| tx.len("events")).unwrap(), 1);
}

#[test]
fn test_delete_bucket() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();
    store.update(|tx| tx.put("users", b"k", b"v")).unwrap();

    assert!(store.update(|tx| tx.delete_bucket("users")).unwrap());
    assert!(!store.update(|tx| tx.delete_bucket("users")).unwrap());

    let mut names = store.view(|tx| tx.bucket_names()).unwrap();
    names.sort();
    assert_eq!(names, vec![DEFAULT_BUCKET]);
}

#[test]
fn test_empty_bucket_name_is_rejected() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    let err = store.view(|tx| tx.get("", b"k")).unwrap_err();
    assert!(matches!(err, StoreError::BucketNameRequired));
    assert!(matches!(
        store.view(|tx| tx.len("")),
        Err(StoreError::BucketNameRequired)
    ));
    assert!(matches!(
        store.view(|tx| tx.for_each("", |_, _| Ok(()))),
        Err(StoreError::BucketNameRequired)
    ));

    assert!(matches!(
        store.update(|tx| tx.create_bucket_if_not_exists("")),
        Err(StoreError::BucketNameRequired)
    ));
    assert!(matches!(
        store.update(|tx| tx.put("", b"k", b"v")),
        Err(StoreError::BucketNameRequired)
    ));
    assert!(matches!(
        store.update(|tx| tx.delete_bucket("")),
        Err(StoreError::BucketNameRequired)
    ));
    assert!(!store.view(|tx| tx.bucket_exists("")).unwrap());
}

#[test]
fn test_bucket_created_and_deleted_within_one_update() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    store
        .update(|tx| {
            assert!(tx.create_bucket_if_not_exists("events")?);
            tx.put("events", b"e1", b"x")?;
            assert_eq!(tx.len("events")?, 1);
            assert!(tx.bucket_names()?.contains(&"events".to_string()));

            assert!(tx.delete_bucket("users")?);
            assert!(!tx.bucket_exists("users")?);
            assert!(matches!(
                tx.get("users", b"k"),
                Err(StoreError::BucketNotFound(_))
            ));
            Ok(())
        })
        .unwrap();

    let mut names = store.view(|tx| tx.bucket_names()).unwrap();
    names.sort();
    assert_eq!(names, vec![DEFAULT_BUCKET, "events"]);
    assert_eq!(
        store.view(|tx| tx.get("events", b"e1")).unwrap(),
        Some(b"x".to_vec())
    );
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_for_each_in_key_order() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();

    store
        .update(|tx| {
            for key in ["cherry", "apple", "banana"] {
                tx.put("users", key.as_bytes(), b"fruit")?;
            }
            Ok(())
        })
        .unwrap();

    let mut keys = Vec::new();
    store
        .view(|tx| {
            tx.for_each("users", |key, value| {
                assert_eq!(value, b"fruit");
                keys.push(String::from_utf8_lossy(key).into_owned());
                Ok(())
            })
        })
        .unwrap();

    assert_eq!(keys, vec!["apple", "banana", "cherry"]);
    assert_eq!(store.view(|tx| tx.len("users")).unwrap(), 3);
}

#[test]
fn test_for_each_stops_on_error() {
    let (_temp, client) = setup_temp_client();
    let store = client.store().unwrap();
    store
        .update(|tx| {
            tx.put("users", b"a", b"1")?;
            tx.put("users", b"b", b"2")
        })
        .unwrap();

    let mut visited = 0;
    let result = store.view(|tx| {
        tx.for_each("users", |_, _| {
            visited += 1;
            Err(StoreError::Transaction("stop".to_string()))
        })
    });

    assert!(result.is_err());
    assert_eq!(visited, 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers_with_writer() {
    let (_temp, client) = setup_temp_client();
    let client = Arc::new(client);

    client
        .store()
        .unwrap()
        .update(|tx| tx.put("users", b"counter", &0u64.to_be_bytes()))
        .unwrap();

    let writer = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            let store = client.store().unwrap();
            for i in 1..=100u64 {
                store
                    .update(|tx| tx.put("users", b"counter", &i.to_be_bytes()))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let store = client.store().unwrap();
                let mut last = 0u64;
                for _ in 0..100 {
                    let bytes = store
                        .view(|tx| tx.get("users", b"counter"))
                        .unwrap()
                        .unwrap();
                    let value = u64::from_be_bytes(bytes.try_into().unwrap());
                    // Snapshots never go backwards
                    assert!(value >= last);
                    last = value;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let final_bytes = client
        .store()
        .unwrap()
        .view(|tx| tx.get("users", b"counter"))
        .unwrap()
        .unwrap();
    assert_eq!(u64::from_be_bytes(final_bytes.try_into().unwrap()), 100);
}
