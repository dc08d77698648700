// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Deadlock detection tests.
//!
//! Drives the service from many threads while parking_lot's deadlock detector
//! watches the drain guard, the history table lock and the worker mutex.

use parking_lot::deadlock;
use point_ledger::{InMemoryLedgerStore, PipelineConfig, PointError, PointService, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

struct Detector {
    running: Arc<AtomicBool>,
    found: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Starts a background thread that checks for deadlocks.
fn start_deadlock_detector() -> Detector {
    let running = Arc::new(AtomicBool::new(true));
    let found = Arc::new(AtomicBool::new(false));
    let (running_clone, found_clone) = (running.clone(), found.clone());

    let handle = thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(50));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                found_clone.store(true, Ordering::SeqCst);
                return;
            }
        }
    });

    Detector {
        running,
        found,
        handle,
    }
}

/// Stops the detector and fails the test if it saw a deadlock.
fn stop_deadlock_detector(detector: Detector) {
    detector.running.store(false, Ordering::SeqCst);
    detector.handle.join().expect("detector panicked");
    assert!(
        !detector.found.load(Ordering::SeqCst),
        "Deadlock detected! See output above for details."
    );
}

fn service(threshold: usize) -> Arc<PointService> {
    let config = PipelineConfig::default()
        .with_drain_interval(Duration::from_millis(2))
        .with_drain_threshold(threshold)
        .with_request_timeout(Duration::from_secs(30));
    Arc::new(PointService::new(Arc::new(InMemoryLedgerStore::new()), config).unwrap())
}

// === Tests ===

/// High contention on a single user with mixed charges, uses and reads.
#[test]
fn no_deadlock_high_contention_single_user() {
    let detector = start_deadlock_detector();
    let service = service(10);

    const NUM_THREADS: usize = 32;
    const OPS_PER_THREAD: usize = 30;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let service = service.clone();
            thread::spawn(move || {
                let mut net = 0i64;
                for i in 0..OPS_PER_THREAD {
                    match i % 3 {
                        0 => {
                            service.charge(UserId(1), 10).unwrap();
                            net += 10;
                        }
                        1 => match service.use_point(UserId(1), 1) {
                            Ok(_) => net -= 1,
                            Err(PointError::InsufficientBalance) => {}
                            Err(e) => panic!("unexpected error: {e}"),
                        },
                        _ => {
                            let _ = service.point(UserId(1)).unwrap();
                            let _ = service.history(UserId(1)).unwrap();
                        }
                    }
                }
                net
            })
        })
        .collect();

    let expected: i64 = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .sum();

    stop_deadlock_detector(detector);

    assert_eq!(service.point(UserId(1)).unwrap().point, expected);
}

/// Callers draining on their own thread while the worker drains too.
#[test]
fn no_deadlock_caller_drains_race_worker() {
    let detector = start_deadlock_detector();
    let service = service(1);

    const NUM_THREADS: usize = 16;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let service = service.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    let drainer = {
                        let service = service.clone();
                        thread::spawn(move || service.drain())
                    };
                    service.charge(UserId(t as i64), 5).unwrap();
                    drainer.join().expect("drainer panicked");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    for t in 0..NUM_THREADS {
        assert_eq!(service.point(UserId(t as i64)).unwrap().point, 100);
    }
}

/// Shutting down while requests are still being submitted.
#[test]
fn no_deadlock_shutdown_under_load() {
    let detector = start_deadlock_detector();
    let service = service(4);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    match service.charge(UserId(1), 1) {
                        Ok(_) | Err(PointError::Closed) | Err(PointError::Timeout) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    service.shutdown();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let point = service.point(UserId(1)).unwrap().point;
    let history = service.history(UserId(1)).unwrap().len() as i64;
    assert_eq!(point, history);
}
