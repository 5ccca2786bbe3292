//! Fixed-size pool of queue consumer loops.
//!
//! [`WorkerPool::start`] spawns `n` independent tasks and returns without
//! blocking. Each worker owns its consumer name on the shared group, so the
//! broker hands every entry to exactly one worker and a slow worker never
//! stalls its siblings. There is no shared mutable state between workers;
//! all coordination goes through the broker.
//!
//! Failure policy per message:
//! - undecodable payload: permanent — dead-letter, ack, keep consuming
//! - delivery failed after retries: dead-letter, ack, keep consuming
//! - broker error: capped exponential backoff, keep the process alive
//!
//! Workers observe the shutdown signal between polls and while a delivery is
//! in flight; an entry interrupted by shutdown stays pending and is
//! re-claimed later (at-least-once).

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use pulse_common::error::AppError;
use pulse_common::types::Notification;

use crate::queue::{Delivery, NOTIFICATIONS_STREAM, QueueClient};
use crate::retry::with_retry;
use crate::sender::Sender;

/// Delivery attempts per notification, matching the reference policy.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Entries fetched per poll.
const READ_BATCH: usize = 10;

/// How long a read blocks waiting for new entries.
const READ_BLOCK_MS: u64 = 5_000;

/// Pending entries idle longer than this are considered abandoned by a dead
/// worker and re-claimed.
const CLAIM_MIN_IDLE_MS: u64 = 60_000;

const MAX_BROKER_BACKOFF: Duration = Duration::from_secs(30);

/// Spawns and configures the consumer loops.
pub struct WorkerPool {
    redis: ConnectionManager,
    sender: Arc<Sender>,
    stream: String,
    max_attempts: u32,
}

impl WorkerPool {
    pub fn new(redis: ConnectionManager, sender: Arc<Sender>) -> Self {
        Self {
            redis,
            sender,
            stream: NOTIFICATIONS_STREAM.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Consume from a different stream (used by tests).
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Start `workers` consumer loops. Does not block; the returned set joins
    /// the tasks for a graceful drain.
    ///
    /// Each worker gets an explicit id, its own queue client, and a clone of
    /// the shutdown receiver. A panic inside one worker kills only that task.
    pub fn start(&self, workers: usize, shutdown: watch::Receiver<bool>) -> JoinSet<()> {
        let mut tasks = JoinSet::new();

        for worker_id in 0..workers {
            let queue = QueueClient::for_worker(self.redis.clone(), self.stream.clone(), worker_id);
            let sender = Arc::clone(&self.sender);
            let shutdown = shutdown.clone();
            let max_attempts = self.max_attempts;

            tasks.spawn(run_worker(worker_id, queue, sender, max_attempts, shutdown));
        }

        info!(workers, stream = %self.stream, "Worker pool started");
        tasks
    }
}

async fn run_worker(
    worker_id: usize,
    queue: QueueClient,
    sender: Arc<Sender>,
    max_attempts: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker_id, stream = %queue.stream(), "Notification worker started");

    // Declare the consumer group before consuming; a broker outage at startup
    // is retried, not fatal.
    let mut attempts = 0u32;
    loop {
        if *shutdown.borrow() {
            return;
        }
        match queue.ensure_group().await {
            Ok(()) => break,
            Err(e) => {
                attempts += 1;
                let delay = broker_backoff(attempts);
                warn!(
                    worker_id,
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "Failed to declare consumer group, backing off"
                );
                if wait_or_shutdown(&mut shutdown, delay).await {
                    return;
                }
            }
        }
    }

    let mut consecutive_errors = 0u32;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let deliveries = match read_batch(&queue, &mut shutdown).await {
            ReadOutcome::Shutdown => break,
            ReadOutcome::Failed(e) => {
                consecutive_errors += 1;
                let delay = broker_backoff(consecutive_errors);
                warn!(
                    worker_id,
                    error = %e,
                    consecutive_errors,
                    delay_secs = delay.as_secs(),
                    "Broker error while reading, backing off"
                );
                if wait_or_shutdown(&mut shutdown, delay).await {
                    break;
                }
                continue;
            }
            ReadOutcome::Batch(deliveries) => {
                if consecutive_errors > 0 {
                    info!(worker_id, "Broker connection recovered");
                    consecutive_errors = 0;
                }
                deliveries
            }
        };

        for delivery in deliveries {
            if *shutdown.borrow() {
                break;
            }
            process_delivery(
                worker_id,
                &queue,
                sender.as_ref(),
                max_attempts,
                &mut shutdown,
                delivery,
            )
            .await;
        }
    }

    info!(worker_id, "Notification worker stopped");
}

enum ReadOutcome {
    Batch(Vec<Delivery>),
    Failed(AppError),
    Shutdown,
}

/// Recover abandoned entries first, then block for new ones.
async fn read_batch(queue: &QueueClient, shutdown: &mut watch::Receiver<bool>) -> ReadOutcome {
    let stale = match queue.claim_stale(CLAIM_MIN_IDLE_MS, READ_BATCH).await {
        Ok(stale) => stale,
        Err(e) => return ReadOutcome::Failed(e),
    };
    if !stale.is_empty() {
        return ReadOutcome::Batch(stale);
    }

    tokio::select! {
        result = queue.read_new(READ_BATCH, READ_BLOCK_MS) => match result {
            Ok(deliveries) => ReadOutcome::Batch(deliveries),
            Err(e) => ReadOutcome::Failed(e),
        },
        _ = shutdown.changed() => ReadOutcome::Shutdown,
    }
}

/// Decode and deliver one entry, then decide its acknowledgment.
async fn process_delivery(
    worker_id: usize,
    queue: &QueueClient,
    sender: &Sender,
    max_attempts: u32,
    shutdown: &mut watch::Receiver<bool>,
    delivery: Delivery,
) {
    // Malformed input cannot be retried into validity: park it and move on
    // so it never blocks the stream.
    let notification: Notification = match serde_json::from_str(&delivery.payload) {
        Ok(notification) => notification,
        Err(e) => {
            warn!(
                worker_id,
                stream_id = %delivery.stream_id,
                error = %e,
                "Discarding undecodable payload"
            );
            finish_failed(worker_id, queue, &delivery, "decode error").await;
            return;
        }
    };

    debug!(
        worker_id,
        notification_id = %notification.id,
        contact_method = %notification.contact_method,
        "Processing notification"
    );

    let outcome = tokio::select! {
        result = with_retry(|| sender.dispatch(&notification), max_attempts) => result,
        _ = shutdown.changed() => {
            // Not acked: the entry stays pending and is re-claimed after
            // restart. Duplicates are the at-least-once trade-off.
            info!(
                worker_id,
                notification_id = %notification.id,
                "Shutdown during delivery, leaving entry pending for redelivery"
            );
            return;
        }
    };

    match outcome {
        Ok(()) => {
            info!(
                worker_id,
                notification_id = %notification.id,
                user_id = %notification.user_id,
                listing_id = %notification.listing_id,
                contact_method = %notification.contact_method,
                "Notification delivered"
            );
            if let Err(e) = queue.ack(&delivery.stream_id).await {
                error!(
                    worker_id,
                    stream_id = %delivery.stream_id,
                    error = %e,
                    "Failed to ack delivered notification"
                );
            }
        }
        Err(e) => {
            error!(
                worker_id,
                notification_id = %notification.id,
                contact_method = %notification.contact_method,
                contact = %notification.contact,
                error = %e,
                "Delivery failed after retries"
            );
            finish_failed(worker_id, queue, &delivery, &e.to_string()).await;
        }
    }
}

/// Dead-letter the payload and ack the original entry so the group's pending
/// list cannot fill with poison messages.
async fn finish_failed(worker_id: usize, queue: &QueueClient, delivery: &Delivery, reason: &str) {
    if let Err(e) = queue.dead_letter(&delivery.payload, reason).await {
        error!(
            worker_id,
            stream_id = %delivery.stream_id,
            error = %e,
            "Failed to dead-letter payload"
        );
    }
    if let Err(e) = queue.ack(&delivery.stream_id).await {
        error!(
            worker_id,
            stream_id = %delivery.stream_id,
            error = %e,
            "Failed to ack failed entry"
        );
    }
}

/// Sleep for `delay`, returning `true` if shutdown fired first.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        result = shutdown.changed() => match result {
            Ok(()) => *shutdown.borrow(),
            // Sender dropped: nobody can signal shutdown anymore, stop anyway.
            Err(_) => true,
        },
    }
}

/// Capped exponential backoff for broker errors: 2s, 4s, ... 30s.
fn broker_backoff(consecutive_errors: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(consecutive_errors.min(5))).min(MAX_BROKER_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_backoff_caps_at_thirty_seconds() {
        assert_eq!(broker_backoff(1), Duration::from_secs(2));
        assert_eq!(broker_backoff(2), Duration::from_secs(4));
        assert_eq!(broker_backoff(4), Duration::from_secs(16));
        assert_eq!(broker_backoff(5), Duration::from_secs(30));
        assert_eq!(broker_backoff(50), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_wait_or_shutdown_observes_signal() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        assert!(wait_or_shutdown(&mut rx, Duration::from_secs(60)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_or_shutdown_times_out() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!wait_or_shutdown(&mut rx, Duration::from_millis(10)).await);
    }
}
