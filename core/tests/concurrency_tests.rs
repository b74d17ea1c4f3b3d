use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use pledge::{Engine, Failure, FailureKind, Snapshot};

#[test]
fn concurrent_settlement_has_exactly_one_winner() {
    for _ in 0..20 {
        let engine = Engine::synchronous();
        let d = engine.defer::<usize>();
        let barrier = Barrier::new(16);

        let winners: Vec<Option<Snapshot<usize>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let d = &d;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        let won = if i % 2 == 0 {
                            d.resolve(i)
                        } else {
                            d.reject(Failure::new(i.to_string()))
                        };
                        won.then(|| {
                            if i % 2 == 0 {
                                Snapshot::Fulfilled(i)
                            } else {
                                Snapshot::Rejected(Failure::new(i.to_string()))
                            }
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("settling thread should not panic"))
                .collect()
        });

        let won: Vec<_> = winners.into_iter().flatten().collect();
        assert_eq!(won.len(), 1, "exactly one settlement attempt should win");
        assert_eq!(d.promise().inspect(), won[0]);
        assert_eq!(d.promise().inspect(), won[0]);
    }
}

#[test]
fn reactions_registered_during_settlement_fire_exactly_once() {
    let engine = Engine::synchronous();
    let d = engine.defer::<u32>();
    let fired = Arc::new(AtomicUsize::new(0));
    let barrier = Barrier::new(9);

    thread::scope(|scope| {
        for _ in 0..8 {
            let promise = d.promise();
            let fired = Arc::clone(&fired);
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    let fired = Arc::clone(&fired);
                    promise.then(move |_| {
                        fired.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                }
            });
        }
        let d = &d;
        let barrier = &barrier;
        scope.spawn(move || {
            barrier.wait();
            d.resolve(1);
        });
    });

    assert_eq!(fired.load(Ordering::SeqCst), 800);
}

#[test]
fn promises_settle_across_threads() {
    let engine = Engine::synchronous();
    let d = engine.defer::<String>();
    let p = d.promise().then(|s| Ok(s.to_uppercase()));

    thread::spawn(move || {
        d.resolve("from worker".to_string());
    })
    .join()
    .expect("worker should not panic");

    assert_eq!(p.inspect(), Snapshot::Fulfilled("FROM WORKER".to_string()));
}

#[test]
fn microtask_queue_can_be_drained_from_another_thread() {
    let engine = Engine::default();
    let d = engine.defer::<i32>();
    let p = d.promise().then(|v| Ok(v - 1));
    d.resolve(1);

    let drainer = engine.clone();
    let ran = thread::spawn(move || drainer.run_microtasks())
        .join()
        .expect("drain thread should not panic");

    assert_eq!(ran, 1);
    assert_eq!(p.inspect(), Snapshot::Fulfilled(0));
}

#[test]
fn concurrent_mutual_adoption_never_leaves_both_pending() {
    for _ in 0..2_000 {
        let engine = Engine::synchronous();
        let a = engine.defer::<i32>();
        let b = engine.defer::<i32>();
        let barrier = Barrier::new(2);

        thread::scope(|scope| {
            let (a, b, barrier) = (&a, &b, &barrier);
            scope.spawn(move || {
                barrier.wait();
                a.adopt(b.promise());
            });
            scope.spawn(move || {
                barrier.wait();
                b.adopt(a.promise());
            });
        });

        for side in [&a, &b] {
            match side.promise().inspect() {
                Snapshot::Rejected(failure) => assert_eq!(failure.kind(), FailureKind::Cycle),
                other => panic!("mutual adoption should reject as a cycle, got {other:?}"),
            }
        }
    }
}
