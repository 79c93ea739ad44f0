//! Blocking behaviour of the bounded worker group across threads

mod common;

use common::Watchdog;
use rstest::rstest;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use workergroup::{Capacity, WorkerGroup};

static SHARED: WorkerGroup = WorkerGroup::new();

#[test]
fn test_max_workers_default_is_stable() {
    let group = WorkerGroup::new();
    let resolved = group.max_workers(0);
    assert_eq!(resolved, worker_sync::default_parallelism());
    for _ in 0..3 {
        assert_eq!(group.max_workers(0), resolved);
    }
}

#[test]
fn test_fourth_add_blocks_until_done() {
    let _watchdog = Watchdog::arm("test_fourth_add_blocks_until_done", Duration::from_secs(30));
    let group = Arc::new(WorkerGroup::new());
    group.max_workers(3);
    group.add(1);
    group.add(1);
    group.add(1);

    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    let handle = {
        let group = Arc::clone(&group);
        thread::spawn(move || {
            group.add(1);
            tx.send(Instant::now()).unwrap();
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err());

    group.done();
    let admitted_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let blocked_for = admitted_at.saturating_duration_since(start);

    assert!(blocked_for >= Duration::from_millis(50));
    handle.join().unwrap();
}

#[rstest]
#[case::single(1, 3)]
#[case::pairs(2, 4)]
#[case::whole_group(3, 3)]
fn test_drain_after_churn(#[case] batch: u32, #[case] max_workers: u32) {
    let _watchdog = Watchdog::arm("test_drain_after_churn", Duration::from_secs(30));
    let group = Arc::new(WorkerGroup::with_max_workers(max_workers));
    let peak = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let group = Arc::clone(&group);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                let _workers = group.guard(batch);
                peak.fetch_max(group.workers(), Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    group.wait();

    assert_eq!(group.workers(), 0);
    assert!(peak.load(Ordering::SeqCst) <= max_workers);
}

#[test]
fn test_wait_tracks_spawner_admissions() {
    let _watchdog = Watchdog::arm("test_wait_tracks_spawner_admissions", Duration::from_secs(30));
    let group = Arc::new(WorkerGroup::with_max_workers(3));
    let finished = Arc::new(AtomicU32::new(0));

    for _ in 0..32 {
        group.add(1);
        let group = Arc::clone(&group);
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(1));
            finished.fetch_add(1, Ordering::SeqCst);
            group.done();
        });
    }

    group.wait();
    assert_eq!(finished.load(Ordering::SeqCst), 32);
    assert_eq!(group.workers(), 0);
}

#[test]
fn test_static_group() {
    let _watchdog = Watchdog::arm("test_static_group", Duration::from_secs(30));
    assert_eq!(SHARED.capacity(), Capacity::Unresolved);
    SHARED.max_workers(2);

    for _ in 0..8 {
        SHARED.add(1);
        thread::spawn(|| {
            thread::sleep(Duration::from_millis(2));
            SHARED.done();
        });
    }

    SHARED.wait();
    assert_eq!(SHARED.workers(), 0);
}

#[test]
fn test_group_reusable_across_cycles() {
    let _watchdog = Watchdog::arm("test_group_reusable_across_cycles", Duration::from_secs(30));
    let group = WorkerGroup::with_max_workers(2);

    for _ in 0..3 {
        thread::scope(|scope| {
            for _ in 0..6 {
                group.add(1);
                scope.spawn(|| group.done());
            }
            group.wait();
        });
        assert_eq!(group.workers(), 0);
    }
}
