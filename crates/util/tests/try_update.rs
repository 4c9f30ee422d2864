mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{fast, init_tracing, meta, members, set_members, Hooked, Req};
use modreq_client::{MemoryStore, Op, StoreError};
use modreq_core::StatusResource;
use modreq_util::{Cause, MutateError, Mutator, RetryPolicy};

#[tokio::test]
async fn updates_from_a_fresh_read() -> anyhow::Result<()> {
    init_tracing();
    let store = Arc::new(MemoryStore::<Req>::new());
    store.seed(&Req::blank(meta("r")))?;
    let m = Mutator::new(store.clone()).with_policy(fast());

    let out = m.try_update(&meta("r"), set_members(3)).await?;
    assert_eq!(members(&out), Some(3));
    assert_eq!(out.metadata.generation, Some(2));
    assert_eq!(store.calls(Op::Get), 1);
    assert_eq!(store.calls(Op::Update), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_writer_is_absorbed_by_refetch() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::<Req>::new());
    store.seed(&Req::blank(meta("r")))?;
    // someone else writes between our first read and our first update
    let client = Hooked::new(store.clone(), |op, nth, store| {
        if op == Op::Update && nth == 1 {
            store.edit("r", |o| o.spec.cur_sts_suffix = Some(1)).unwrap();
        }
    });
    let m = Mutator::new(client).with_policy(fast());

    let out = m.try_update(&meta("r"), set_members(2)).await?;
    assert_eq!(members(&out), Some(2));
    assert_eq!(out.spec.cur_sts_suffix, Some(1));
    assert_eq!(store.calls(Op::Update), 2);
    assert_eq!(store.calls(Op::Get), 2);
    Ok(())
}

// Documented leniency: update failures are retried whatever their class,
// a rejection that can never succeed only ends when the budget does.
#[tokio::test]
async fn retries_even_non_retryable_update_errors() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::<Req>::new());
    store.seed(&Req::blank(meta("r")))?;
    store.inject(Op::Update, StoreError::Fatal("admission webhook denied the request".into()));
    store.inject(Op::Update, StoreError::Fatal("admission webhook denied the request".into()));
    let m = Mutator::new(store.clone()).with_policy(fast());

    m.try_update(&meta("r"), set_members(1)).await?;
    assert_eq!(store.calls(Op::Update), 3);
    assert_eq!(store.calls(Op::Get), 3);
    Ok(())
}

#[tokio::test]
async fn read_errors_other_than_not_found_are_retried() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::<Req>::new());
    store.seed(&Req::blank(meta("r")))?;
    store.inject(Op::Get, StoreError::Retryable("too many requests".into()));
    let m = Mutator::new(store.clone()).with_policy(fast());

    m.try_update(&meta("r"), set_members(1)).await?;
    assert_eq!(store.calls(Op::Get), 2);
    assert_eq!(store.calls(Op::Update), 1);
    Ok(())
}

#[tokio::test]
async fn deleted_mid_loop_aborts_without_waiting_out_the_budget() {
    let store = Arc::new(MemoryStore::<Req>::new());
    store.seed(&Req::blank(meta("r"))).unwrap();
    store.inject(Op::Update, StoreError::Conflict("stale".into()));
    let client = Hooked::new(store.clone(), |op, nth, store| {
        if op == Op::Get && nth == 2 {
            store.delete("r");
        }
    });
    let m = Mutator::new(client).with_policy(RetryPolicy::new(Duration::from_millis(10), Duration::from_secs(30)));

    let started = Instant::now();
    let err = m.try_update(&meta("r"), set_members(1)).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(err.is_not_found());
    assert_eq!(err.attempts(), Some(2));
    assert!(matches!(err, MutateError::Exhausted { cause: Cause::Aborted(StoreError::NotFound(_)), .. }));
}

#[tokio::test]
async fn absent_object_is_not_waited_for() {
    let store = Arc::new(MemoryStore::<Req>::new());
    let m = Mutator::new(store.clone()).with_policy(RetryPolicy::new(Duration::from_millis(10), Duration::from_secs(30)));

    let err = m.try_update(&meta("ghost"), set_members(1)).await.unwrap_err();
    assert_eq!(err.attempts(), Some(1));
    assert!(err.to_string().starts_with("failed to update MySQLModificationRequest demo/ghost after 1 attempts due to not found"));
    assert_eq!(store.calls(Op::Update), 0);
}

#[tokio::test]
async fn persistent_failures_time_out_with_last_error() {
    let store = Arc::new(MemoryStore::<Req>::new());
    store.seed(&Req::blank(meta("r"))).unwrap();
    for _ in 0..1000 {
        store.inject(Op::Update, StoreError::Conflict("stale".into()));
    }
    let m = Mutator::new(store.clone()).with_policy(RetryPolicy::new(Duration::from_millis(5), Duration::from_millis(50)));

    let err = m.try_update(&meta("r"), set_members(1)).await.unwrap_err();
    match err {
        MutateError::Exhausted { cause: Cause::TimedOut { last: Some(StoreError::Conflict(_)) }, attempts, .. } => {
            assert!(attempts > 1);
            assert_eq!(store.calls(Op::Update), attempts as usize);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(members(&store.peek("r").unwrap()), None);
}
