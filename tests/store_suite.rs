//! End-to-end suite run against both the persistent and the in-memory
//! datastore.

use shale::{Datastore, Error, Key, OrderByKey, OrderByKeyDescending, Query};
use std::thread;
use tempfile::TempDir;

const TESTCASES: &[(&str, &str)] = &[
    ("/a", "a"),
    ("/a/b", "ab"),
    ("/a/b/c", "abc"),
    ("/a/b/d", "a/b/d"),
    ("/a/c", "ac"),
    ("/a/d", "ad"),
    ("/e", "e"),
    ("/f", "f"),
];

fn key(s: &str) -> Key {
    Key::new(s)
}

fn add_testcases(ds: &Datastore) {
    for (k, v) in TESTCASES {
        ds.put(&key(k), v.as_bytes()).unwrap();
    }
    for (k, v) in TESTCASES {
        assert_eq!(ds.get(&key(k)).unwrap(), v.as_bytes().to_vec());
    }
}

/// Run `check` against a persistent datastore and an in-memory one.
fn with_both(check: impl Fn(&Datastore)) {
    let dir = TempDir::new().unwrap();
    let persistent = Datastore::open(dir.path()).unwrap();
    check(&persistent);
    persistent.close().unwrap();

    let in_memory = Datastore::in_memory().unwrap();
    check(&in_memory);
}

fn expect_keys(ds: &Datastore, query: Query, expect: &[&str]) {
    let entries = ds.query(query).unwrap().rest().unwrap();
    let got: Vec<String> = entries.into_iter().map(|e| e.key.to_string()).collect();
    assert_eq!(got, expect);
}

#[test]
fn query_prefix_offset_limit_and_order() {
    with_both(|ds| {
        add_testcases(ds);

        expect_keys(
            ds,
            Query::new().with_prefix("/a/"),
            &["/a/b", "/a/b/c", "/a/b/d", "/a/c", "/a/d"],
        );

        expect_keys(
            ds,
            Query::new().with_prefix("/a/").offset(2).limit(2),
            &["/a/b/d", "/a/c"],
        );

        let mut sorted: Vec<&str> = TESTCASES.iter().map(|(k, _)| *k).collect();
        sorted.sort_unstable();
        expect_keys(ds, Query::new().order(OrderByKey), &sorted);

        sorted.reverse();
        expect_keys(ds, Query::new().order(OrderByKeyDescending), &sorted);
    });
}

#[test]
fn batching_roundtrip() {
    with_both(|ds| {
        let mut batch = ds.batch().unwrap();
        for (k, v) in TESTCASES {
            batch.put(&key(k), v.as_bytes()).unwrap();
        }
        batch.commit().unwrap();

        for (k, v) in TESTCASES {
            assert_eq!(ds.get(&key(k)).unwrap(), v.as_bytes().to_vec());
        }
    });
}

#[test]
fn transaction_commit_publishes_writes() {
    with_both(|ds| {
        let k = key("/test/key1");
        let mut txn = ds.new_transaction(false).unwrap();

        txn.put(&k, b"hello").unwrap();
        assert!(ds.get(&k).unwrap_err().is_not_found());

        txn.commit().unwrap();
        assert_eq!(ds.get(&k).unwrap(), b"hello".to_vec());
        txn.discard();
    });
}

#[test]
fn transaction_discard_drops_writes() {
    with_both(|ds| {
        let k = key("/test/key1");
        let mut txn = ds.new_transaction(false).unwrap();

        txn.put(&k, b"hello").unwrap();
        assert!(ds.get(&k).unwrap_err().is_not_found());

        txn.discard();
        assert!(ds.get(&k).unwrap_err().is_not_found());
    });
}

#[test]
fn transaction_many_operations() {
    with_both(|ds| {
        let mut txn = ds.new_transaction(false).unwrap();

        for i in 0..5 {
            txn.put(&key(&format!("/test/key{i}")), format!("hello{i}").as_bytes())
                .unwrap();
        }
        txn.delete(&key("/test/key2")).unwrap();

        assert!(txn.has(&key("/test/key1")).unwrap());
        assert!(!txn.has(&key("/test/key2")).unwrap());

        let entries = txn
            .query(Query::new().with_prefix("/test"))
            .unwrap()
            .rest()
            .unwrap();
        assert_eq!(entries.len(), 4);

        txn.discard();
    });
}

#[test]
fn disk_usage_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_path_buf();
    let ds = Datastore::open(&path).unwrap();
    add_testcases(&ds);

    let before = ds.disk_usage().unwrap();
    assert!(before > 0, "expected some disk usage");

    // Enough data to force the backing file to grow.
    let chunk = vec![0xabu8; 4096];
    for i in 0..2048 {
        ds.put(&key(&format!("/bulk/{i:05}")), &chunk).unwrap();
    }
    let after = ds.disk_usage().unwrap();
    assert!(after > before, "size should have increased");

    ds.close().unwrap();
    drop(dir);

    // The storage directory is gone; accounting must fail.
    assert!(ds.disk_usage().is_err());
}

#[test]
fn disk_usage_in_memory_is_zero() {
    let ds = Datastore::in_memory().unwrap();
    add_testcases(&ds);
    assert_eq!(ds.disk_usage().unwrap(), 0);
}

#[test]
fn close_races_in_flight_commit() {
    let dir = TempDir::new().unwrap();
    let ds = Datastore::open(dir.path()).unwrap();
    for n in 0..100 {
        ds.put(&key(&n.to_string()), format!("test{n}").as_bytes())
            .unwrap();
    }

    let mut txn = ds.new_transaction(false).unwrap();
    txn.put(&key("/txnversion"), b"bump").unwrap();

    let closer = {
        let ds = ds.clone();
        thread::spawn(move || {
            ds.close().unwrap();
        })
    };

    for (k, _) in TESTCASES {
        let _ = txn.get(&key(k));
    }
    let _ = txn.commit();
    closer.join().unwrap();
}

#[test]
fn commit_after_close_fails() {
    let dir = TempDir::new().unwrap();
    let ds = Datastore::open(dir.path()).unwrap();
    add_testcases(&ds);

    let mut txn = ds.new_transaction(false).unwrap();
    txn.put(&key("/test"), b"test").unwrap();

    ds.close().unwrap();
    assert!(matches!(txn.commit(), Err(Error::Closed)));
}

#[test]
fn put_then_get_returns_value() {
    with_both(|ds| {
        let cases: &[(&str, &[u8])] = &[
            ("/plain", b"plain value"),
            ("/empty", b""),
            ("/binary", &[0x00, 0xff, 0x7f]),
        ];
        for (k, v) in cases {
            ds.put(&key(k), v).unwrap();
            assert_eq!(ds.get(&key(k)).unwrap(), v.to_vec());
            assert_eq!(ds.size(&key(k)).unwrap(), v.len());
        }
    });
}

#[test]
fn ordered_query_is_independent_of_insertion_order() {
    use rand::seq::SliceRandom;

    let mut shuffled: Vec<&(&str, &str)> = TESTCASES.iter().collect();
    shuffled.shuffle(&mut rand::thread_rng());

    let ds = Datastore::in_memory().unwrap();
    for (k, v) in &shuffled {
        ds.put(&key(k), v.as_bytes()).unwrap();
    }

    let mut sorted: Vec<&str> = TESTCASES.iter().map(|(k, _)| *k).collect();
    sorted.sort_unstable();
    expect_keys(&ds, Query::new().order(OrderByKey), &sorted);
    // Natural order with no explicit order is also byte order.
    expect_keys(&ds, Query::new(), &sorted);
}

#[test]
fn reopen_preserves_data() {
    let dir = TempDir::new().unwrap();
    {
        let ds = Datastore::open(dir.path()).unwrap();
        add_testcases(&ds);
        ds.close().unwrap();
    }
    let ds = Datastore::open(dir.path()).unwrap();
    for (k, v) in TESTCASES {
        assert_eq!(ds.get(&key(k)).unwrap(), v.as_bytes().to_vec());
    }
}
