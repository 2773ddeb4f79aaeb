//! Tests for the queued sink engine: retry accounting, failure policies,
//! FIFO delivery, and graceful drain

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use courier_protocol::Message;
use courier_queue::MessageQueue;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::common::SinkError;
use crate::engine::{Backoff, EngineConfig, FailurePolicy, QueuedSink};
use crate::sink::BatchWrite;

/// Scripted writer: fails the first `fail_first` write calls, then succeeds.
/// Records every call and every delivered routing key.
struct ScriptedWriter {
    fail_first: u64,
    calls: Arc<AtomicU64>,
    delivered: Arc<Mutex<Vec<String>>>,
}

impl ScriptedWriter {
    fn new(fail_first: u64) -> (Self, Arc<AtomicU64>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(AtomicU64::new(0));
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let writer = Self {
            fail_first,
            calls: Arc::clone(&calls),
            delivered: Arc::clone(&delivered),
        };
        (writer, calls, delivered)
    }
}

#[async_trait]
impl BatchWrite for ScriptedWriter {
    async fn open(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn write(&mut self, batch: &[Arc<Message>]) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(SinkError::write("scripted failure"));
        }
        let mut delivered = self.delivered.lock();
        for msg in batch {
            delivered.push(msg.routing_key().to_string());
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "scripted"
    }
}

fn msg(key: &str) -> Arc<Message> {
    Arc::new(Message::new(key, key.as_bytes().to_vec()))
}

fn fast_config(max_retries: u32, on_failure: FailurePolicy) -> EngineConfig {
    EngineConfig {
        batch_size: 10,
        batch_timeout: Duration::from_millis(20),
        max_retries,
        backoff: Backoff::Fixed(Duration::from_millis(1)),
        on_failure,
        grace: Duration::from_secs(5),
    }
}

/// Offer messages, run the engine until the queue drains, then shut down.
async fn run_until_drained(
    engine: QueuedSink<ScriptedWriter>,
    queue: Arc<MessageQueue>,
    keys: &[&str],
) {
    for key in keys {
        queue.offer(msg(key)).await.unwrap();
    }

    let token = CancellationToken::new();
    let task = tokio::spawn(engine.run(token.clone()));

    // Cancellation drains the remainder within the grace window
    token.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_delivers_in_offer_order() {
    let queue = Arc::new(MessageQueue::with_defaults());
    let (writer, _, delivered) = ScriptedWriter::new(0);
    let engine = QueuedSink::new("t", writer, Arc::clone(&queue), fast_config(0, FailurePolicy::Drop));
    let stats = engine.stats_handle();

    run_until_drained(engine, queue, &["a", "b", "c", "d"]).await;

    assert_eq!(*delivered.lock(), vec!["a", "b", "c", "d"]);
    let snapshot = courier_metrics::SinkStatsProvider::snapshot(&stats);
    assert_eq!(snapshot.messages_sent, 4);
    assert_eq!(snapshot.failed_attempts, 0);
    assert_eq!(snapshot.queue_depth, 0);
}

#[tokio::test]
async fn test_fails_twice_then_succeeds() {
    // max_retries = 3, writer fails twice: committed on the third attempt,
    // two failed attempts recorded, one batch sent
    let queue = Arc::new(MessageQueue::with_defaults());
    let (writer, calls, delivered) = ScriptedWriter::new(2);
    let engine = QueuedSink::new("t", writer, Arc::clone(&queue), fast_config(3, FailurePolicy::Drop));
    let stats = engine.stats_handle();

    run_until_drained(engine, queue, &["a"]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(*delivered.lock(), vec!["a"]);

    let snapshot = courier_metrics::SinkStatsProvider::snapshot(&stats);
    assert_eq!(snapshot.failed_attempts, 2);
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.batches_sent, 1);
    assert_eq!(snapshot.batches_dropped, 0);
}

#[tokio::test]
async fn test_exactly_n_retries_then_drop() {
    // Permanently failing writer with max_retries = 3: exactly 4 attempts
    // (1 + 3 retries), then the batch is dropped - not retried again
    let queue = Arc::new(MessageQueue::with_defaults());
    let (writer, calls, delivered) = ScriptedWriter::new(u64::MAX);
    let engine = QueuedSink::new("t", writer, Arc::clone(&queue), fast_config(3, FailurePolicy::Drop));
    let stats = engine.stats_handle();

    run_until_drained(engine, queue, &["a"]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(delivered.lock().is_empty());

    let snapshot = courier_metrics::SinkStatsProvider::snapshot(&stats);
    assert_eq!(snapshot.failed_attempts, 4);
    assert_eq!(snapshot.retries, 3);
    assert_eq!(snapshot.batches_dropped, 1);
    assert_eq!(snapshot.batches_sent, 0);
    // Drop policy releases the queue entries
    assert_eq!(snapshot.queue_depth, 0);
}

#[tokio::test]
async fn test_requeue_policy_redelivers_in_order() {
    // First round of attempts fails, batch requeued; second round succeeds.
    // fail_first = 2 with max_retries = 1 means round one (2 attempts)
    // exhausts, round two delivers.
    let queue = Arc::new(MessageQueue::with_defaults());
    let (writer, calls, delivered) = ScriptedWriter::new(2);
    let engine = QueuedSink::new(
        "t",
        writer,
        Arc::clone(&queue),
        fast_config(1, FailurePolicy::Requeue),
    );
    let stats = engine.stats_handle();

    run_until_drained(engine, queue, &["a", "b"]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(*delivered.lock(), vec!["a", "b"]);

    let snapshot = courier_metrics::SinkStatsProvider::snapshot(&stats);
    assert_eq!(snapshot.batches_sent, 1);
    assert_eq!(snapshot.batches_dropped, 0);
    assert_eq!(snapshot.queue_depth, 0);
}

#[tokio::test]
async fn test_drain_on_shutdown_without_poll_timeout() {
    // Messages offered while the engine is mid-poll still get delivered
    // once shutdown is requested
    let queue = Arc::new(MessageQueue::with_defaults());
    let (writer, _, delivered) = ScriptedWriter::new(0);
    let mut config = fast_config(0, FailurePolicy::Drop);
    // Long batch timeout: only the shutdown drain can flush this quickly
    config.batch_timeout = Duration::from_secs(3600);
    config.batch_size = 1000;
    let engine = QueuedSink::new("t", writer, Arc::clone(&queue), config);

    for key in ["a", "b"] {
        queue.offer(msg(key)).await.unwrap();
    }

    let token = CancellationToken::new();
    let task = tokio::spawn(engine.run(token.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    task.await.unwrap();

    assert_eq!(*delivered.lock(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_backoff_schedules() {
    let fixed = Backoff::Fixed(Duration::from_millis(100));
    assert_eq!(fixed.delay(0), Duration::from_millis(100));
    assert_eq!(fixed.delay(5), Duration::from_millis(100));

    let exp = Backoff::Exponential {
        base: Duration::from_millis(100),
        cap: Duration::from_secs(1),
    };
    assert_eq!(exp.delay(0), Duration::from_millis(100));
    assert_eq!(exp.delay(1), Duration::from_millis(200));
    assert_eq!(exp.delay(2), Duration::from_millis(400));
    // Capped
    assert_eq!(exp.delay(10), Duration::from_secs(1));
    assert_eq!(exp.delay(63), Duration::from_secs(1));
}

#[tokio::test]
async fn test_stats_handle_outlives_engine() {
    let queue = Arc::new(MessageQueue::with_defaults());
    let (writer, _, _) = ScriptedWriter::new(0);
    let engine = QueuedSink::new("t", writer, Arc::clone(&queue), fast_config(0, FailurePolicy::Drop));
    let stats = engine.stats_handle();

    run_until_drained(engine, queue, &["a"]).await;

    // The engine task is gone; the handle still reads final counters
    let snapshot = courier_metrics::SinkStatsProvider::snapshot(&stats);
    assert_eq!(snapshot.messages_sent, 1);
}
