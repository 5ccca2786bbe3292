//! Integration tests for the notification dispatcher.
//!
//! Requires a running Redis instance with `REDIS_URL` env var set (defaults
//! to localhost). Run with:
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p pulse-notifier --test integration -- --ignored --nocapture
//! ```
//!
//! Each test uses a uniquely named stream so runs do not interfere.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::watch;
use uuid::Uuid;

use pulse_common::types::{ContactMethod, Notification, NotificationStatus};
use pulse_notifier::error::SendError;
use pulse_notifier::queue::{CONSUMER_GROUP, QueueClient};
use pulse_notifier::sender::{Sender, Transport};
use pulse_notifier::worker::WorkerPool;

// ============================================================
// Helpers
// ============================================================

async fn test_redis() -> ConnectionManager {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let client = redis::Client::open(url.as_str()).unwrap();
    ConnectionManager::new(client).await.unwrap()
}

fn unique_stream() -> String {
    format!("notifications:test:{}", Uuid::new_v4())
}

fn make_notification(contact_method: &str, contact: &str) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        listing_id: Uuid::new_v4(),
        contact_method: contact_method.to_string(),
        contact: contact.to_string(),
        subject: "New listing matches your alert".to_string(),
        body: "3-bedroom duplex, Surulere, 700000/month".to_string(),
        status: NotificationStatus::Pending,
        sent_at: None,
    }
}

/// Poll `cond` until it holds or the deadline passes.
async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

/// Transport instrument: counts attempts, tracks peak concurrency, records
/// the ids it saw, and holds each attempt open briefly.
struct CountingTransport {
    channel: ContactMethod,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    seen: Arc<std::sync::Mutex<Vec<Uuid>>>,
    hold: Duration,
}

impl CountingTransport {
    fn instrumented(channel: ContactMethod, hold: Duration) -> Self {
        Self {
            channel,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(std::sync::Mutex::new(Vec::new())),
            hold,
        }
    }

    fn sharing(&self, channel: ContactMethod) -> Self {
        Self {
            channel,
            calls: self.calls.clone(),
            in_flight: self.in_flight.clone(),
            peak_in_flight: self.peak_in_flight.clone(),
            seen: self.seen.clone(),
            hold: self.hold,
        }
    }
}

#[async_trait]
impl Transport for CountingTransport {
    fn channel(&self) -> ContactMethod {
        self.channel
    }

    async fn attempt(&self, notification: &Notification) -> Result<(), SendError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;

        self.seen.lock().unwrap().push(notification.id);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sender whose three channels share one counting instrument.
fn instrumented_sender(hold: Duration) -> (Sender, CountingTransport) {
    let probe = CountingTransport::instrumented(ContactMethod::Email, hold);
    let sender = Sender::with_transports(
        Box::new(probe.sharing(ContactMethod::Email)),
        Box::new(probe.sharing(ContactMethod::Sms)),
        Box::new(probe.sharing(ContactMethod::Whatsapp)),
    );
    (sender, probe)
}

// ============================================================
// Queue client
// ============================================================

#[tokio::test]
#[ignore]
async fn test_publish_consume_roundtrip() {
    let redis = test_redis().await;
    let stream = unique_stream();
    let queue = QueueClient::new(redis, &stream, CONSUMER_GROUP, "consumer-0");
    queue.ensure_group().await.unwrap();

    let published = make_notification("email", "renter@example.com");
    queue.publish(&published).await.unwrap();

    let deliveries = queue.read_new(10, 1_000).await.unwrap();
    assert_eq!(deliveries.len(), 1);

    let consumed: Notification = serde_json::from_str(&deliveries[0].payload).unwrap();
    assert_eq!(consumed, published);

    queue.ack(&deliveries[0].stream_id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_unacked_entry_is_claimable_by_another_consumer() {
    let redis = test_redis().await;
    let stream = unique_stream();

    let first = QueueClient::new(redis.clone(), &stream, CONSUMER_GROUP, "consumer-0");
    first.ensure_group().await.unwrap();
    first
        .publish(&make_notification("email", "renter@example.com"))
        .await
        .unwrap();

    // First consumer reads but never acks — simulates a crash mid-message.
    let deliveries = first.read_new(10, 1_000).await.unwrap();
    assert_eq!(deliveries.len(), 1);
    drop(first);

    // A second consumer claims the abandoned entry once it has idled.
    let second = QueueClient::new(redis, &stream, CONSUMER_GROUP, "consumer-1");
    tokio::time::sleep(Duration::from_millis(200)).await;
    let claimed = second.claim_stale(100, 10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].payload, deliveries[0].payload);
}

// ============================================================
// Worker pool
// ============================================================

#[tokio::test]
#[ignore]
async fn test_decode_failure_does_not_block_next_message() {
    let redis = test_redis().await;
    let stream = unique_stream();

    // One malformed payload, then one valid email notification.
    let mut conn = redis.clone();
    let _: String = redis::cmd("XADD")
        .arg(&stream)
        .arg("*")
        .arg("payload")
        .arg("{not json")
        .query_async(&mut conn)
        .await
        .unwrap();

    let publisher = QueueClient::new(redis.clone(), &stream, CONSUMER_GROUP, "publisher");
    let valid = make_notification("email", "renter@example.com");
    publisher.publish(&valid).await.unwrap();

    let (sender, probe) = instrumented_sender(Duration::ZERO);
    let pool = WorkerPool::new(redis.clone(), Arc::new(sender)).with_stream(&stream);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = pool.start(1, shutdown_rx);

    let calls = probe.calls.clone();
    assert!(
        wait_until(Duration::from_secs(10), || calls.load(Ordering::SeqCst) == 1).await,
        "valid notification was never dispatched"
    );
    assert_eq!(probe.seen.lock().unwrap().as_slice(), &[valid.id]);

    // The malformed payload went to the dead-letter stream.
    let dead: i64 = redis::cmd("XLEN")
        .arg(format!("{stream}:dead"))
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(dead, 1);

    shutdown_tx.send(true).unwrap();
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        while workers.join_next().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "worker did not drain after shutdown");
}

#[tokio::test]
#[ignore]
async fn test_pool_concurrency_never_exceeds_worker_count() {
    let redis = test_redis().await;
    let stream = unique_stream();

    let publisher = QueueClient::new(redis.clone(), &stream, CONSUMER_GROUP, "publisher");
    publisher.ensure_group().await.unwrap();
    for _ in 0..10 {
        publisher
            .publish(&make_notification("email", "renter@example.com"))
            .await
            .unwrap();
    }

    // Hold each delivery open long enough for overlap to show up.
    let (sender, probe) = instrumented_sender(Duration::from_millis(200));
    let pool = WorkerPool::new(redis, Arc::new(sender)).with_stream(&stream);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = pool.start(3, shutdown_rx);

    let calls = probe.calls.clone();
    assert!(
        wait_until(Duration::from_secs(20), || {
            calls.load(Ordering::SeqCst) == 10
        })
        .await,
        "not all notifications were dispatched"
    );

    let peak = probe.peak_in_flight.load(Ordering::SeqCst);
    assert!(peak >= 1, "nothing was processed");
    assert!(peak <= 3, "more than 3 deliveries in flight: {peak}");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while workers.join_next().await.is_some() {}
    })
    .await
    .expect("workers did not drain after shutdown");
}

#[tokio::test]
#[ignore]
async fn test_exhausted_retries_dead_letter_and_ack() {
    let redis = test_redis().await;
    let stream = unique_stream();

    let publisher = QueueClient::new(redis.clone(), &stream, CONSUMER_GROUP, "publisher");
    publisher.ensure_group().await.unwrap();
    // The sms channel fails deterministically with "not implemented yet".
    publisher
        .publish(&make_notification("sms", "+2348012345678"))
        .await
        .unwrap();

    // Real stub channels so the failure path is exercised; the email slot is
    // never routed to in this test. max_attempts = 1 keeps the test free of
    // backoff sleeps.
    let sender = Sender::with_transports(
        Box::new(pulse_notifier::sender::SmsTransport),
        Box::new(pulse_notifier::sender::SmsTransport),
        Box::new(pulse_notifier::sender::WhatsappTransport),
    );
    let pool = WorkerPool::new(redis.clone(), Arc::new(sender))
        .with_stream(&stream)
        .with_max_attempts(1);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = pool.start(1, shutdown_rx);

    let mut conn = redis.clone();
    let dead_stream = format!("{stream}:dead");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut dead: i64 = 0;
    while tokio::time::Instant::now() < deadline {
        dead = redis::cmd("XLEN")
            .arg(&dead_stream)
            .query_async(&mut conn)
            .await
            .unwrap();
        if dead == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(dead, 1, "failed notification never reached the dead letter");

    // The original entry was acked: nothing left pending for the group.
    let pending: (i64, Option<String>, Option<String>, Option<Vec<(String, i64)>>) =
        redis::cmd("XPENDING")
            .arg(&stream)
            .arg(CONSUMER_GROUP)
            .query_async(&mut conn)
            .await
            .unwrap();
    assert_eq!(pending.0, 0);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while workers.join_next().await.is_some() {}
    })
    .await
    .expect("worker did not drain after shutdown");
}
