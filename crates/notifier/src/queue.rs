//! Durable queue client over a Redis Stream consumer group.
//!
//! The producer publishes JSON-encoded notifications with `XADD`; the stream
//! persists them until they are trimmed. Workers read through a consumer
//! group (`XREADGROUP`), so the broker hands each entry to exactly one
//! consumer, and acknowledge with `XACK` only after processing. Entries left
//! pending by a dead consumer are re-claimed (`XPENDING` + `XCLAIM`), which
//! is what makes delivery at-least-once rather than at-most-once.
//!
//! Every broker error is returned to the caller. Nothing in this module
//! terminates the process.

use redis::RedisResult;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

use pulse_common::error::AppError;
use pulse_common::types::Notification;

/// Fixed queue name shared between producer and dispatcher.
pub const NOTIFICATIONS_STREAM: &str = "notifications";

/// Consumer group the worker pool reads through.
pub const CONSUMER_GROUP: &str = "notifiers";

/// Entry field holding the JSON payload.
const PAYLOAD_FIELD: &str = "payload";

/// Rough cap on the dead-letter stream so poison messages cannot grow it
/// without bound.
const DEAD_LETTER_MAX_LEN: i64 = 10_000;

/// A message pulled from the queue.
///
/// `stream_id` is the broker-assigned entry id and doubles as the
/// acknowledgment handle.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub stream_id: String,
    pub payload: String,
}

/// Publish/consume client for one stream + consumer group.
///
/// Cloning shares the underlying connection manager; each worker constructs
/// its own client with a distinct consumer name so a slow worker cannot
/// stall its siblings.
#[derive(Clone)]
pub struct QueueClient {
    redis: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
}

impl QueueClient {
    pub fn new(
        redis: ConnectionManager,
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            redis,
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
        }
    }

    /// Client for a pool worker, with an explicit worker id in the consumer
    /// name so pending entries are attributable.
    pub fn for_worker(redis: ConnectionManager, stream: impl Into<String>, worker_id: usize) -> Self {
        Self::new(redis, stream, CONSUMER_GROUP, format!("worker-{worker_id}"))
    }

    /// Publish-only client used by the producer side.
    pub fn publisher(redis: ConnectionManager) -> Self {
        Self::new(redis, NOTIFICATIONS_STREAM, CONSUMER_GROUP, "publisher")
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Publish a notification as a persistent stream entry.
    ///
    /// Returns the broker-assigned entry id. The entry survives a broker
    /// restart (subject to Redis persistence); receipt by a consumer is not
    /// implied. Errors are returned so the caller can decide whether to
    /// retry the publish.
    pub async fn publish(&self, notification: &Notification) -> Result<String, AppError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| AppError::Queue(format!("failed to encode notification: {e}")))?;

        let mut conn = self.redis.clone();
        let stream_id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        debug!(
            stream = %self.stream,
            stream_id = %stream_id,
            notification_id = %notification.id,
            "Published notification"
        );

        Ok(stream_id)
    }

    /// Declare the consumer group, creating the stream if needed.
    ///
    /// Idempotent: an already-existing group is not an error.
    pub async fn ensure_group(&self) -> Result<(), AppError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => {
                info!(stream = %self.stream, group = %self.group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(AppError::Redis(e)),
        }
    }

    /// Read up to `count` new entries, blocking up to `block_ms` when the
    /// stream is empty. An empty result after the block timeout is normal.
    pub async fn read_new(&self, count: usize, block_ms: u64) -> Result<Vec<Delivery>, AppError> {
        let mut conn = self.redis.clone();

        type Entries = Vec<(String, Vec<(String, String)>)>;
        let result: Option<Vec<(String, Entries)>> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let entries = result
            .into_iter()
            .flatten()
            .flat_map(|(_stream, entries)| entries)
            .collect();

        Ok(parse_entries(entries))
    }

    /// Claim entries another consumer left pending for longer than
    /// `min_idle_ms`, transferring them to this consumer for reprocessing.
    pub async fn claim_stale(
        &self,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<Delivery>, AppError> {
        let mut conn = self.redis.clone();

        // (id, consumer, idle_ms, delivery_count) per pending entry
        let pending: Vec<(String, String, i64, i64)> = redis::cmd("XPENDING")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let stale_ids: Vec<&String> = pending
            .iter()
            .filter(|(_, _, idle_ms, _)| *idle_ms > min_idle_ms as i64)
            .map(|(id, _, _, _)| id)
            .collect();

        if stale_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.stream)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(min_idle_ms);
        for id in &stale_ids {
            cmd.arg(id.as_str());
        }

        let entries: Vec<(String, Vec<(String, String)>)> = cmd.query_async(&mut conn).await?;
        let deliveries = parse_entries(entries);

        if !deliveries.is_empty() {
            warn!(
                stream = %self.stream,
                consumer = %self.consumer,
                count = deliveries.len(),
                "Claimed stale pending entries"
            );
        }

        Ok(deliveries)
    }

    /// Acknowledge an entry, removing it from the group's pending list.
    pub async fn ack(&self, stream_id: &str) -> Result<(), AppError> {
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(stream = %self.stream, stream_id = %stream_id, "Acknowledged entry");
        Ok(())
    }

    /// Park an undeliverable payload on the dead-letter stream so it stays
    /// inspectable without blocking the consumer group.
    pub async fn dead_letter(&self, payload: &str, reason: &str) -> Result<(), AppError> {
        let mut conn = self.redis.clone();

        let _: String = redis::cmd("XADD")
            .arg(format!("{}:dead", self.stream))
            .arg("MAXLEN")
            .arg("~")
            .arg(DEAD_LETTER_MAX_LEN)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .arg("reason")
            .arg(reason)
            .query_async(&mut conn)
            .await?;

        Ok(())
    }
}

/// Turn raw stream entries into deliveries, skipping entries without a
/// payload field (nothing to decode, nothing to deliver).
fn parse_entries(entries: Vec<(String, Vec<(String, String)>)>) -> Vec<Delivery> {
    let mut deliveries = Vec::with_capacity(entries.len());

    for (stream_id, fields) in entries {
        match fields.into_iter().find(|(key, _)| key == PAYLOAD_FIELD) {
            Some((_, payload)) => deliveries.push(Delivery { stream_id, payload }),
            None => {
                warn!(stream_id = %stream_id, "Stream entry has no payload field, skipping");
            }
        }
    }

    deliveries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries_extracts_payload() {
        let entries = vec![
            (
                "1-0".to_string(),
                vec![("payload".to_string(), "{\"a\":1}".to_string())],
            ),
            (
                "2-0".to_string(),
                vec![
                    ("trace".to_string(), "abc".to_string()),
                    ("payload".to_string(), "{\"b\":2}".to_string()),
                ],
            ),
        ];

        let deliveries = parse_entries(entries);
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].stream_id, "1-0");
        assert_eq!(deliveries[0].payload, "{\"a\":1}");
        assert_eq!(deliveries[1].payload, "{\"b\":2}");
    }

    #[test]
    fn test_parse_entries_skips_payloadless_entry() {
        let entries = vec![
            ("1-0".to_string(), vec![("other".to_string(), "x".to_string())]),
            (
                "2-0".to_string(),
                vec![("payload".to_string(), "{}".to_string())],
            ),
        ];

        let deliveries = parse_entries(entries);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].stream_id, "2-0");
    }
}
