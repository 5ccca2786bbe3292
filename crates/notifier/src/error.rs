use thiserror::Error;
use uuid::Uuid;

/// Delivery errors surfaced by [`crate::sender::Sender::dispatch`].
///
/// The retry policy is deliberately oblivious to the variant (see
/// [`crate::retry`]); the taxonomy exists for logging and for the transports
/// themselves, not for retry decisions.
#[derive(Debug, Error)]
pub enum SendError {
    /// The payload named a contact method outside the recognized set.
    #[error("unknown contact method: {0}")]
    UnknownContactMethod(String),

    /// The channel exists but has no wired-up transport.
    #[error("{0} not implemented yet")]
    NotImplemented(&'static str),

    /// The destination address is missing.
    #[error("empty contact on notification {0}")]
    EmptyContact(Uuid),

    /// The destination could not be parsed into a deliverable address.
    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    /// The SMTP submission failed (connection, auth, or protocol error).
    #[error("smtp error: {0}")]
    Smtp(String),
}
