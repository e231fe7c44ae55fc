//! End-to-end worker scenarios against the in-memory queue and ledger
//!
//! The run loop is driven with paused tokio time, so polling waits complete
//! instantly and deterministically.

use std::time::Duration;

use banking_event_receiver::domain::{Balance, EventRecord, FailureKind};
use banking_event_receiver::ledger::InMemoryLedgerStore;
use banking_event_receiver::queue::InMemoryQueue;
use banking_event_receiver::{DeliveryWorker, ProcessOutcome, WorkerConfig};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn worker(queue: &InMemoryQueue, ledger: &InMemoryLedgerStore) -> DeliveryWorker {
    DeliveryWorker::new(Box::new(queue.clone()), Box::new(ledger.clone()))
}

#[tokio::test(start_paused = true)]
async fn test_empty_queue_polls_every_interval() {
    let queue = InMemoryQueue::new();
    let ledger = InMemoryLedgerStore::new();
    let worker = worker(&queue, &ledger);

    // polls at t=0s, 10s and 20s, stops at 25s
    worker.run_until(tokio::time::sleep(Duration::from_secs(25))).await;

    assert_eq!(queue.peek_count(), 3);
    assert_eq!(ledger.units_started(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_drains_queue_then_idles() {
    let queue = InMemoryQueue::new();
    let ledger = InMemoryLedgerStore::new();
    let account_id = Uuid::new_v4();
    ledger.open_account(account_id, Balance::new(dec!(1000)).unwrap());

    queue.send(EventRecord::credit(account_id, dec!(100)).to_payload().unwrap());
    queue.send(EventRecord::debit(account_id, dec!(400)).to_payload().unwrap());
    queue.send(EventRecord::debit(account_id, dec!(5000)).to_payload().unwrap());
    queue.send(b"{not json".to_vec());

    let worker = worker(&queue, &ledger);
    worker.run_until(tokio::time::sleep(Duration::from_secs(1))).await;

    assert_eq!(ledger.account(account_id).unwrap().balance.value(), dec!(700));
    assert_eq!(ledger.transactions().len(), 2);
    assert_eq!(queue.completed().len(), 2);

    let mut kinds: Vec<FailureKind> = queue.dead_letters().iter().map(|d| d.failure_kind).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(kinds, vec![FailureKind::BusinessRule, FailureKind::Malformed]);
    assert!(queue.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shrunk_poll_interval() {
    let queue = InMemoryQueue::new();
    let ledger = InMemoryLedgerStore::new();
    let config = WorkerConfig::default().with_poll_interval(Duration::from_millis(100));
    let worker = DeliveryWorker::with_config(Box::new(queue.clone()), Box::new(ledger), config);

    worker.run_until(tokio::time::sleep(Duration::from_millis(450))).await;

    assert_eq!(queue.peek_count(), 5);
}

#[tokio::test]
async fn test_dead_lettered_message_never_mutates_again() {
    let queue = InMemoryQueue::new();
    let ledger = InMemoryLedgerStore::new();
    let account_id = Uuid::new_v4();
    ledger.open_account(account_id, Balance::new(dec!(20)).unwrap());
    queue.send(EventRecord::debit(account_id, dec!(30)).to_payload().unwrap());

    let worker = worker(&queue, &ledger);
    assert!(matches!(
        worker.process_next().await.unwrap(),
        ProcessOutcome::DeadLettered { .. }
    ));

    // later deposits do not revive the dead-lettered debit
    queue.send(EventRecord::credit(account_id, dec!(100)).to_payload().unwrap());
    queue.release_scheduled();
    worker.process_next().await.unwrap();
    assert!(worker.process_next().await.unwrap().is_idle());

    assert_eq!(ledger.account(account_id).unwrap().balance.value(), dec!(120));
    assert_eq!(queue.dead_letters().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refused_disposition_waits_one_poll_interval() {
    let queue = InMemoryQueue::new();
    let ledger = InMemoryLedgerStore::new();
    queue.fail_next_dead_letters(1);
    queue.send(b"{not json".to_vec());

    let worker = worker(&queue, &ledger);
    worker.run_until(tokio::time::sleep(Duration::from_secs(9))).await;

    // first attempt refused, no second peek before the interval elapses
    assert_eq!(queue.peek_count(), 1);
    assert_eq!(queue.pending().len(), 1);
    assert!(queue.dead_letters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_refused_disposition_retried_after_poll_interval() {
    let queue = InMemoryQueue::new();
    let ledger = InMemoryLedgerStore::new();
    queue.fail_next_dead_letters(1);
    queue.send(b"{not json".to_vec());

    let worker = worker(&queue, &ledger);
    // refused at t=0, dead-lettered at t=10, idle peek right after
    worker.run_until(tokio::time::sleep(Duration::from_secs(15))).await;

    assert_eq!(queue.peek_count(), 3);
    assert!(queue.pending().is_empty());
    assert_eq!(queue.dead_letters()[0].failure_kind, FailureKind::Malformed);
}
