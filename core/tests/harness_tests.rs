use std::sync::Arc;

use pledge::errors::HarnessError;
use pledge::harness::SettlementQueue;
use pledge::{Failure, Outcome, Promise, Snapshot};

#[test]
fn settles_outstanding_requests_in_fifo_order() {
    let queue = SettlementQueue::<u32>::synchronous();
    let first = queue.request().then(|v| Ok(v + 1));
    let second = queue.request().then(|v| Ok(v * 2));
    assert_eq!(queue.pending(), 2);

    queue.resolve_next(10).expect("first request should be outstanding");
    assert_eq!(first.inspect(), Snapshot::Fulfilled(11));
    assert!(second.is_pending());

    queue.reject_next("timeout").expect("second request should be outstanding");
    assert_eq!(second.inspect(), Snapshot::Rejected(Failure::new("timeout")));
    assert_eq!(queue.pending(), 0);
}

#[test]
fn settling_an_empty_queue_is_an_error() {
    let queue = SettlementQueue::<u32>::synchronous();
    assert!(matches!(queue.resolve_next(1), Err(HarnessError::Empty)));
    assert!(matches!(queue.reject_next("x"), Err(HarnessError::Empty)));
}

#[test]
fn chained_requests_are_driven_one_at_a_time() {
    let queue = Arc::new(SettlementQueue::<String>::synchronous());
    let producer = Arc::clone(&queue);

    let greeting: Promise<String> = queue
        .request()
        .and_then(move |user| {
            let profile = producer.request();
            Ok(Outcome::from(profile.then(move |name| Ok(format!("{user}:{name}")))))
        })
        .otherwise(|e| Ok(format!("failed: {e}")));

    queue.resolve_next("u1".to_string()).expect("user lookup outstanding");
    assert_eq!(queue.pending(), 1, "profile lookup should now be outstanding");
    assert!(greeting.is_pending());

    queue.resolve_next("Ada".to_string()).expect("profile lookup outstanding");
    assert_eq!(greeting.inspect(), Snapshot::Fulfilled("u1:Ada".to_string()));
}

#[test]
fn rejection_midway_is_caught_at_the_end() {
    let queue = Arc::new(SettlementQueue::<i32>::synchronous());
    let producer = Arc::clone(&queue);

    let result: Promise<i32> = queue
        .request()
        .and_then(move |_| Ok(Outcome::from(producer.request())))
        .then(|v| Ok(v + 100))
        .otherwise(|e| Ok(-(e.message().len() as i32)));

    queue.resolve_next(1).expect("first request outstanding");
    queue.reject_next("gone").expect("second request outstanding");
    assert_eq!(result.inspect(), Snapshot::Fulfilled(-4));
}

#[test]
fn resolve_all_includes_requests_made_while_draining() {
    let queue = Arc::new(SettlementQueue::<u8>::synchronous());
    let producer = Arc::clone(&queue);
    let chained: Promise<u8> = queue
        .request()
        .and_then(move |_| Ok(Outcome::from(producer.request())));

    assert_eq!(queue.resolve_all(7), 2);
    assert_eq!(chained.inspect(), Snapshot::Fulfilled(7));
}

#[test]
fn resolve_next_with_adopts() {
    let queue = SettlementQueue::<i32>::synchronous();
    let fallback = queue.engine().resolved(5);
    let p = queue.request();

    queue
        .resolve_next_with(Outcome::from(fallback))
        .expect("request outstanding");
    assert_eq!(p.inspect(), Snapshot::Fulfilled(5));
}
