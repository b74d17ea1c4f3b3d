use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use pledge::dispatch::Job;
use pledge::errors::ConfigError;
use pledge::{
    DispatchKind, Engine, EngineConfig, Executor, Failure, Promise, Settlement, Snapshot,
};

#[test]
fn synchronous_dispatch_fires_inline() {
    let engine = Engine::synchronous();
    assert!(engine.dispatch().is_synchronous());
    let d = engine.defer::<i32>();
    let p = d.promise().then(|v| Ok(v * 10));

    d.resolve(4);
    assert_eq!(p.inspect(), Snapshot::Fulfilled(40));
}

#[test]
fn microtask_dispatch_defers_callbacks_until_drained() {
    let engine = Engine::default();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let d = engine.defer::<i32>();
    let p = d.promise().then(move |v| {
        flag.store(true, Ordering::SeqCst);
        Ok(v + 1)
    });

    d.resolve(1);
    assert_eq!(d.promise().inspect(), Snapshot::Fulfilled(1));
    assert!(p.is_pending());
    assert!(!ran.load(Ordering::SeqCst));

    assert_eq!(engine.run_microtasks(), 1);
    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(p.inspect(), Snapshot::Fulfilled(2));
}

#[test]
fn then_on_settled_promise_is_still_deferred() {
    let engine = Engine::with_microtasks();
    let p = engine.resolved("done").then(|s| Ok(s.len()));

    assert!(p.is_pending());
    let queue = engine.microtasks().expect("engine should own a queue");
    assert_eq!(queue.len(), 1);
    engine.run_microtasks();
    assert_eq!(p.inspect(), Snapshot::Fulfilled(4));
    assert!(queue.is_empty());
}

#[test]
fn long_chains_drain_without_recursion() {
    let engine = Engine::default();
    let d = engine.defer::<u64>();
    let mut tail = d.promise();
    for _ in 0..10_000 {
        tail = tail.then(|v| Ok(v + 1));
    }

    d.resolve(0);
    engine.run_microtasks();
    assert_eq!(tail.inspect(), Snapshot::Fulfilled(10_000));
}

#[test]
fn synchronous_long_chains_settle_in_place() {
    let engine = Engine::synchronous();
    let d = engine.defer::<u64>();
    let mut tail = d.promise();
    for _ in 0..100_000 {
        tail = tail.then(|v| Ok(v + 1));
    }

    d.resolve(0);
    assert_eq!(tail.inspect(), Snapshot::Fulfilled(100_000));
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[test]
fn dropping_a_long_pending_chain_releases_every_link() {
    let engine = Engine::default();
    let d = engine.defer::<u64>();
    let mut tail = d.promise();
    for _ in 0..100_000 {
        tail = tail.then(|v| Ok(v + 1));
    }
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = DropFlag(Arc::clone(&dropped));
    let last = tail.then(move |v| {
        let _flag = &flag;
        Ok(v)
    });

    drop(last);
    drop(tail);
    assert!(!dropped.load(Ordering::SeqCst), "the head still owns the chain");
    drop(d);
    assert!(dropped.load(Ordering::SeqCst), "the last reaction should be dropped");
    assert_eq!(engine.stats().pending(), 100_002);
}

#[test]
fn reactions_added_while_draining_keep_order() {
    let engine = Engine::synchronous();
    let d = engine.defer::<u8>();
    let source = d.promise();
    let order = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&order);
    let nested_source = source.clone();
    source.then(move |_| {
        log.lock().expect("order lock").push("a");
        let log = Arc::clone(&log);
        nested_source.then(move |_| {
            log.lock().expect("order lock").push("c");
            Ok(())
        });
        Ok(())
    });
    let log = Arc::clone(&order);
    source.then(move |_| {
        log.lock().expect("order lock").push("b");
        Ok(())
    });

    d.resolve(0);
    assert_eq!(*order.lock().expect("order lock"), vec!["a", "b", "c"]);
}

#[derive(Default)]
struct ManualExecutor {
    jobs: Mutex<Vec<Job>>,
}

impl ManualExecutor {
    fn pending(&self) -> usize {
        self.jobs.lock().expect("jobs lock").len()
    }

    fn run_all(&self) {
        loop {
            let batch: Vec<Job> = self.jobs.lock().expect("jobs lock").drain(..).collect();
            if batch.is_empty() {
                break;
            }
            for job in batch {
                job();
            }
        }
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        self.jobs.lock().expect("jobs lock").push(job);
    }
}

#[test]
fn one_job_fires_every_reaction_of_a_settled_promise() {
    let executor = Arc::new(ManualExecutor::default());
    let engine = Engine::with_executor(executor.clone());
    let d = engine.defer::<i32>();
    let results: Vec<Promise<i32>> = (1..=3).map(|k| d.promise().then(move |v| Ok(v * k))).collect();

    assert_eq!(executor.pending(), 0);
    d.resolve(2);
    assert_eq!(executor.pending(), 1);

    executor.run_all();
    let values: Vec<_> = results.iter().map(Promise::inspect).collect();
    assert_eq!(
        values,
        vec![Snapshot::Fulfilled(2), Snapshot::Fulfilled(4), Snapshot::Fulfilled(6)]
    );
}

#[test]
fn tokio_dispatch_requires_a_runtime() {
    let config = EngineConfig::new().with_dispatch(DispatchKind::Tokio);
    assert!(matches!(
        Engine::from_config(&config),
        Err(ConfigError::NoRuntime(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tokio_dispatch_settles_chains() {
    let config = EngineConfig::new().with_dispatch(DispatchKind::Tokio);
    let engine = Engine::from_config(&config).expect("runtime is available");
    let d = engine.defer::<i32>();
    let order = Arc::new(Mutex::new(Vec::new()));

    let branches: Vec<Promise<i32>> = (0..5)
        .map(|i| {
            let order = Arc::clone(&order);
            d.promise().then(move |v| {
                order.lock().expect("order lock").push(i);
                Ok(v + i)
            })
        })
        .collect();
    let tail = branches[4].then(|v| -> Result<i32, Failure> { Err(Failure::new(v.to_string())) });

    d.resolve(20);
    for (i, branch) in branches.iter().enumerate() {
        assert_eq!(branch.settled().await, Settlement::Fulfilled(20 + i as i32));
    }
    assert_eq!(tail.settled().await, Settlement::Rejected(Failure::new("24")));
    assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn settled_reports_abandoned_promises() {
    let engine = Engine::synchronous();
    let d = engine.defer::<i32>();
    let waiting = d.promise().settled();
    drop(d);

    let Settlement::Rejected(failure) = waiting.await else {
        panic!("dropped deferred should not fulfil");
    };
    assert_eq!(failure.kind(), pledge::FailureKind::Abandoned);
}
