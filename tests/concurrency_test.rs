// Parallel access to the session store: racing starts, logins and cache writes
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::Duration;
use sessionvault::session::{Session, SessionCache, SessionStore, StartOutcome, TokenDirective};
use sessionvault::testing::constants::TEST_USER;
use sessionvault::testing::{TestFixtures, TestManagerBuilder};

const THREADS: usize = 8;

#[test]
fn test_parallel_starts_on_stale_token_rotate_once() {
    let harness = TestManagerBuilder::new().build();
    let session = harness.manager.start(None, true).unwrap().session.unwrap();
    let original = session.id();
    harness.clock.advance(Duration::hours(2));

    let barrier = Barrier::new(THREADS);
    let outcomes: Vec<StartOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    harness.manager.start(Some(&original), false).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    // One id for the creation, one for the single rotation
    assert_eq!(harness.ids.issued(), 2);
    let rotated = session.id();
    assert_ne!(rotated, original);
    for outcome in &outcomes {
        assert!(Arc::ptr_eq(outcome.session.as_ref().unwrap(), &session));
        assert_eq!(outcome.token, TokenDirective::Set(rotated.clone()));
    }
    assert_eq!(harness.manager.session_count(), 2);
}

#[test]
fn test_login_racing_start_keeps_references_one_hop() {
    for _ in 0..16 {
        let harness = TestManagerBuilder::new().build();
        let session = harness.manager.start(None, true).unwrap().session.unwrap();
        let original = session.id();
        harness.clock.advance(Duration::hours(2));

        let barrier = Barrier::new(2);
        thread::scope(|scope| {
            let login = scope.spawn(|| {
                barrier.wait();
                harness.manager.log_in(&session, TEST_USER, false).unwrap()
            });
            let start = scope.spawn(|| {
                barrier.wait();
                harness.manager.start(Some(&original), false).unwrap()
            });
            login.join().unwrap();
            start.join().unwrap();
        });

        let current = session.id();
        assert_eq!(session.user(), Some(TEST_USER));

        let outcome = harness.manager.start(Some(&original), false).unwrap();
        assert!(Arc::ptr_eq(&outcome.session.unwrap(), &session));
        assert_eq!(outcome.token, TokenDirective::Set(current.clone()));

        for stored in harness.store.sessions() {
            if let Some(target) = stored.reference_target() {
                assert_eq!(target, current);
            }
        }
    }
}

#[test]
fn test_parallel_creation_respects_capacity() {
    let harness = TestManagerBuilder::new().with_max_cache_size(32).build();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..50 {
                    harness.manager.start(None, true).unwrap();
                    assert!(harness.manager.session_count() <= 32);
                }
            });
        }
    });

    assert_eq!(harness.ids.issued(), 400);
    assert_eq!(harness.manager.session_count(), 32);
}

#[test]
fn test_parallel_writes_and_compaction_respect_capacity() {
    let cache = SessionCache::new(16);
    let epoch = TestFixtures::epoch();

    thread::scope(|scope| {
        for worker in 0..THREADS {
            let cache = &cache;
            scope.spawn(move || {
                for i in 0..200_i64 {
                    let accessed = epoch + Duration::seconds(i);
                    let id = format!("{worker:02}-{i:04}");
                    cache
                        .set(Arc::new(Session::with_timestamps(id, accessed, accessed)))
                        .unwrap();
                    if i % 25 == 0 {
                        cache.compact(4);
                    }
                    assert!(cache.len() <= 16);
                }
            });
        }
    });

    assert!(cache.len() <= 16);
    assert!(!cache.is_empty());
}
