//! Isolation and shutdown behavior across concurrently held handles.

use shale_core::error::Error;
use shale_core::key::Key;
use shale_core::query::Query;
use shale_store::{Datastore, TxnStatus};
use std::thread;

fn key(s: &str) -> Key {
    Key::new(s)
}

#[test]
fn transactions_never_observe_each_other_before_commit() {
    let ds = Datastore::in_memory().unwrap();

    let mut a = ds.new_transaction(false).unwrap();
    let b = ds.new_transaction(false).unwrap();

    a.put(&key("/k"), b"from-a").unwrap();
    assert!(b.get(&key("/k")).unwrap_err().is_not_found());
    assert_eq!(b.query(Query::new()).unwrap().rest().unwrap().len(), 0);

    a.commit().unwrap();

    // b's snapshot predates the commit; a fresh transaction sees it.
    assert!(b.get(&key("/k")).unwrap_err().is_not_found());
    let fresh = ds.new_transaction(false).unwrap();
    assert_eq!(fresh.get(&key("/k")).unwrap(), b"from-a".to_vec());
}

#[test]
fn commit_observed_only_if_before_snapshot() {
    let ds = Datastore::in_memory().unwrap();

    let mut writer = ds.new_transaction(false).unwrap();
    writer.put(&key("/k"), b"v").unwrap();
    writer.commit().unwrap();

    let reader = ds.new_transaction(false).unwrap();
    assert_eq!(reader.get(&key("/k")).unwrap(), b"v".to_vec());
}

#[test]
fn last_committed_write_wins_per_key() {
    let ds = Datastore::in_memory().unwrap();

    let mut a = ds.new_transaction(false).unwrap();
    let mut b = ds.new_transaction(false).unwrap();
    a.put(&key("/k"), b"from-a").unwrap();
    b.put(&key("/k"), b"from-b").unwrap();

    a.commit().unwrap();
    b.commit().unwrap();

    assert_eq!(ds.get(&key("/k")).unwrap(), b"from-b".to_vec());
}

#[test]
fn concurrent_transactions_from_threads() {
    let ds = Datastore::in_memory().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ds = ds.clone();
            thread::spawn(move || {
                let mut txn = ds.new_transaction(false).unwrap();
                for j in 0..16 {
                    txn.put(&key(&format!("/t{i}/k{j}")), b"v").unwrap();
                }
                txn.commit().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let all = ds.query(Query::new()).unwrap().rest().unwrap();
    assert_eq!(all.len(), 8 * 16);
}

#[test]
fn close_racing_commit_never_deadlocks() {
    let ds = Datastore::in_memory().unwrap();
    for i in 0..100 {
        ds.put(&key(&format!("/{i}")), format!("test{i}").as_bytes())
            .unwrap();
    }

    let mut txn = ds.new_transaction(false).unwrap();
    txn.put(&key("/txnversion"), b"bump").unwrap();

    let closer = {
        let ds = ds.clone();
        thread::spawn(move || ds.close().unwrap())
    };

    for i in 0..100 {
        // Reads go through the transaction's own snapshot and stay valid.
        let _ = txn.get(&key(&format!("/{i}")));
    }
    // The commit either lands before the engine goes away or fails with
    // Closed; both are acceptable, hanging or panicking is not.
    let _ = txn.commit();
    closer.join().unwrap();
    assert!(ds.is_closed());
}

#[test]
fn commit_after_close_fails_cleanly() {
    let ds = Datastore::in_memory().unwrap();
    let mut txn = ds.new_transaction(false).unwrap();
    txn.put(&key("/test"), b"test").unwrap();

    ds.close().unwrap();

    assert!(matches!(txn.commit(), Err(Error::Closed)));
    assert_eq!(txn.status(), TxnStatus::Active);
    txn.discard();
    assert_eq!(txn.status(), TxnStatus::Discarded);
}

#[test]
fn snapshot_reads_survive_close() {
    let ds = Datastore::in_memory().unwrap();
    ds.put(&key("/k"), b"v").unwrap();

    let txn = ds.new_transaction(true).unwrap();
    ds.close().unwrap();

    // The snapshot holds its own reference to the engine's state.
    assert_eq!(txn.get(&key("/k")).unwrap(), b"v".to_vec());
}
