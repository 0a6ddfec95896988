use std::thread;

use log::info;

use tiny_db::{
    transaction::ConcurrentStatus, Database, HeapPageID, Permission,
    Transaction,
};

use crate::test_utils::{new_random_heap_table, setup};

/// The classic two-transaction cycle: each holds a read lock the other
/// needs to upgrade past. Exactly one is aborted by the arbiter, the
/// other commits.
#[test]
fn test_deadlock_is_resolved() {
    let _guard = setup();

    // small wait budget so the arbiter kicks in quickly
    ConcurrentStatus::set_base_timeout_ms(50);

    let mut cells = Vec::new();
    // single int column: 992 tuples per page, 2 pages in total
    let table = new_random_heap_table("deadlock", 1, 992 * 2, &mut cells);
    assert!(table.num_pages() >= 2);

    let pid1 = HeapPageID::new(table.get_id(), 0);
    let pid2 = HeapPageID::new(table.get_id(), 1);

    let t1 = Transaction::new();
    let t2 = Transaction::new();
    Database::buffer_pool()
        .get_page(&t1, Permission::ReadOnly, &pid1)
        .unwrap();
    Database::buffer_pool()
        .get_page(&t2, Permission::ReadOnly, &pid2)
        .unwrap();

    let (sender, receiver) = crossbeam::channel::unbounded();

    let s1 = sender.clone();
    let handle1 = thread::spawn(move || {
        match Database::buffer_pool().get_page(&t1, Permission::ReadWrite, &pid2)
        {
            Ok(_) => {
                t1.commit().unwrap();
                s1.send(("t1", true)).unwrap();
            }
            Err(e) => {
                if !e.is_aborted() {
                    e.show_backtrace();
                    panic!("unexpected failure: {}", e);
                }
                t1.abort().unwrap();
                s1.send(("t1", false)).unwrap();
            }
        }
    });

    let s2 = sender;
    let handle2 = thread::spawn(move || {
        match Database::buffer_pool().get_page(&t2, Permission::ReadWrite, &pid1)
        {
            Ok(_) => {
                t2.commit().unwrap();
                s2.send(("t2", true)).unwrap();
            }
            Err(e) => {
                if !e.is_aborted() {
                    e.show_backtrace();
                    panic!("unexpected failure: {}", e);
                }
                t2.abort().unwrap();
                s2.send(("t2", false)).unwrap();
            }
        }
    });

    handle1.join().unwrap();
    handle2.join().unwrap();

    let outcomes: Vec<(&str, bool)> = receiver.try_iter().collect();
    assert_eq!(outcomes.len(), 2);

    let committed = outcomes.iter().filter(|(_, ok)| *ok).count();
    let aborted = outcomes.iter().filter(|(_, ok)| !*ok).count();
    info!("deadlock outcomes: {:?}", outcomes);
    assert_eq!(committed, 1, "exactly one transaction must commit");
    assert_eq!(aborted, 1, "exactly one transaction must be aborted");
}

/// Two transactions reading the same page and both asking for the upgrade
/// is a deadlock as well; the arbiter picks one.
#[test]
fn test_upgrade_deadlock_is_resolved() {
    let _guard = setup();

    ConcurrentStatus::set_base_timeout_ms(50);

    let mut cells = Vec::new();
    let table = new_random_heap_table("upgrade_deadlock", 1, 1, &mut cells);
    let pid = HeapPageID::new(table.get_id(), 0);

    let t1 = Transaction::new();
    let t2 = Transaction::new();
    Database::buffer_pool()
        .get_page(&t1, Permission::ReadOnly, &pid)
        .unwrap();
    Database::buffer_pool()
        .get_page(&t2, Permission::ReadOnly, &pid)
        .unwrap();

    let upgrader = |tx: Transaction| {
        move || match Database::buffer_pool().get_page(
            &tx,
            Permission::ReadWrite,
            &pid,
        ) {
            Ok(_) => {
                tx.commit().unwrap();
                true
            }
            Err(e) => {
                assert!(e.is_aborted(), "unexpected failure: {}", e);
                tx.abort().unwrap();
                false
            }
        }
    };

    let handle1 = thread::spawn(upgrader(t1));
    let handle2 = thread::spawn(upgrader(t2));

    let r1 = handle1.join().unwrap();
    let r2 = handle2.join().unwrap();
    assert!(
        r1 != r2,
        "one upgrader must win and one must be aborted, got {} / {}",
        r1,
        r2
    );
}

/// A transaction marked as victim fails every further page request
/// immediately.
#[test]
fn test_aborted_transaction_cannot_lock() {
    let _guard = setup();

    use tiny_db::transaction::TransactionStatus;

    let mut cells = Vec::new();
    let table = new_random_heap_table("aborted_tx", 1, 1, &mut cells);
    let pid = HeapPageID::new(table.get_id(), 0);

    let tx = Transaction::new();
    Database::concurrent_status()
        .set_transaction_status(tx.get_id(), TransactionStatus::Aborted);

    let err = Database::buffer_pool()
        .get_page(&tx, Permission::ReadOnly, &pid)
        .unwrap_err();
    assert!(err.is_aborted());

    tx.abort().unwrap();
}
