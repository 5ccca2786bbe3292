//! Asynchronous notification dispatcher.
//!
//! Consumes notification jobs from the durable queue and delivers them over
//! contact-method-specific transports:
//!
//! - [`queue`] — publish/consume client over a Redis Stream consumer group
//! - [`worker`] — fixed-size pool of consumer loops with graceful shutdown
//! - [`sender`] — routes a job to its transport (email, SMS, WhatsApp)
//! - [`retry`] — bounded exponential-backoff retry around a delivery attempt
//!
//! Delivery is at-least-once: a job is acknowledged only after it was sent or
//! judged permanently undeliverable, and unacknowledged entries are re-claimed
//! from dead consumers.

pub mod error;
pub mod queue;
pub mod retry;
pub mod sender;
pub mod worker;
