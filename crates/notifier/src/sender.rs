//! Contact-method routing.
//!
//! Each variant of the fixed channel set {email, sms, whatsapp} carries its
//! own [`Transport`] implementation; [`Sender::dispatch`] resolves the
//! transport for a job's contact method and invokes it exactly once. Adding
//! a channel means adding a variant and a transport, not growing a switch.
//!
//! Dispatch performs no retries — the worker composes it with
//! [`crate::retry::with_retry`].

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use pulse_common::config::SmtpSettings;
use pulse_common::types::{ContactMethod, Notification};

use crate::error::SendError;

/// Cap on SMTP dial + submission so a slow provider cannot pin a worker for
/// an entire retry cycle.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A single delivery attempt over one contact channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The channel this transport serves.
    fn channel(&self) -> ContactMethod;

    /// Attempt one delivery. Implementations must not retry internally.
    async fn attempt(&self, notification: &Notification) -> Result<(), SendError>;
}

/// Email delivery over authenticated SMTP submission.
pub struct EmailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Auth identity, also used as the From address.
    from: String,
}

impl EmailTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, SendError> {
        let (host, port) = match settings.server.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    SendError::Smtp(format!("invalid SMTP server '{}'", settings.server))
                })?;
                (host.to_string(), port)
            }
            // Bare hostname: standard submission port
            None => (settings.server.clone(), 587),
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .map_err(|e| SendError::Smtp(format!("failed to create SMTP relay: {e}")))?
            .port(port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from: settings.username.clone(),
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, SendError> {
        let from: Mailbox = self.from.parse().map_err(|e| SendError::Address {
            address: self.from.clone(),
            reason: format!("{e}"),
        })?;
        let to: Mailbox = notification.contact.parse().map_err(|e| SendError::Address {
            address: notification.contact.clone(),
            reason: format!("{e}"),
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&notification.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| SendError::Smtp(format!("failed to build message: {e}")))
    }
}

#[async_trait]
impl Transport for EmailTransport {
    fn channel(&self) -> ContactMethod {
        ContactMethod::Email
    }

    async fn attempt(&self, notification: &Notification) -> Result<(), SendError> {
        let message = self.build_message(notification)?;

        debug!(
            notification_id = %notification.id,
            to = %notification.contact,
            "Submitting email"
        );

        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::Smtp(e.to_string()))?;

        Ok(())
    }
}

/// SMS channel. No provider is wired up; every attempt fails deterministically
/// rather than pretending to succeed.
pub struct SmsTransport;

#[async_trait]
impl Transport for SmsTransport {
    fn channel(&self) -> ContactMethod {
        ContactMethod::Sms
    }

    async fn attempt(&self, notification: &Notification) -> Result<(), SendError> {
        debug!(notification_id = %notification.id, "SMS transport invoked");
        Err(SendError::NotImplemented("sms"))
    }
}

/// WhatsApp channel. Same contract as SMS: deterministic, descriptive failure.
pub struct WhatsappTransport;

#[async_trait]
impl Transport for WhatsappTransport {
    fn channel(&self) -> ContactMethod {
        ContactMethod::Whatsapp
    }

    async fn attempt(&self, notification: &Notification) -> Result<(), SendError> {
        debug!(notification_id = %notification.id, "WhatsApp transport invoked");
        Err(SendError::NotImplemented("whatsapp"))
    }
}

/// Routes a notification to the transport for its contact method.
pub struct Sender {
    email: Box<dyn Transport>,
    sms: Box<dyn Transport>,
    whatsapp: Box<dyn Transport>,
}

impl Sender {
    /// Production wiring: SMTP email plus the unimplemented sms/whatsapp
    /// channels.
    pub fn new(smtp: &SmtpSettings) -> Result<Self, SendError> {
        Ok(Self::with_transports(
            Box::new(EmailTransport::new(smtp)?),
            Box::new(SmsTransport),
            Box::new(WhatsappTransport),
        ))
    }

    /// Explicit wiring, one transport per channel.
    pub fn with_transports(
        email: Box<dyn Transport>,
        sms: Box<dyn Transport>,
        whatsapp: Box<dyn Transport>,
    ) -> Self {
        Self {
            email,
            sms,
            whatsapp,
        }
    }

    fn transport(&self, method: ContactMethod) -> &dyn Transport {
        match method {
            ContactMethod::Email => self.email.as_ref(),
            ContactMethod::Sms => self.sms.as_ref(),
            ContactMethod::Whatsapp => self.whatsapp.as_ref(),
        }
    }

    /// Validate the job and invoke its transport once.
    ///
    /// An unrecognized contact method or empty destination fails before any
    /// transport is touched, so no I/O happens for malformed jobs.
    pub async fn dispatch(&self, notification: &Notification) -> Result<(), SendError> {
        let method = ContactMethod::parse(&notification.contact_method).ok_or_else(|| {
            SendError::UnknownContactMethod(notification.contact_method.clone())
        })?;

        if notification.contact.trim().is_empty() {
            return Err(SendError::EmptyContact(notification.id));
        }

        self.transport(method).attempt(notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    use pulse_common::types::NotificationStatus;

    /// Counts attempts and always succeeds.
    struct RecordingTransport {
        channel: ContactMethod,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn channel(&self) -> ContactMethod {
            self.channel
        }

        async fn attempt(&self, _notification: &Notification) -> Result<(), SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_sender() -> (Sender, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let sender = Sender::with_transports(
            Box::new(RecordingTransport {
                channel: ContactMethod::Email,
                calls: calls.clone(),
            }),
            Box::new(SmsTransport),
            Box::new(WhatsappTransport),
        );
        (sender, calls)
    }

    fn make_notification(contact_method: &str, contact: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            contact_method: contact_method.to_string(),
            contact: contact.to_string(),
            subject: "New listing matches your alert".to_string(),
            body: "2-bedroom flat, Yaba, 450000/month".to_string(),
            status: NotificationStatus::Pending,
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_method_fails_without_transport_io() {
        let (sender, calls) = test_sender();
        let err = sender
            .dispatch(&make_notification("pigeon", "coop 7"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "unknown contact method: pigeon");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sms_fails_deterministically() {
        let (sender, _) = test_sender();
        let err = sender
            .dispatch(&make_notification("sms", "+2348012345678"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "sms not implemented yet");
    }

    #[tokio::test]
    async fn test_whatsapp_fails_deterministically() {
        let (sender, _) = test_sender();
        let err = sender
            .dispatch(&make_notification("whatsapp", "+2348012345678"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "whatsapp not implemented yet");
    }

    #[tokio::test]
    async fn test_empty_contact_rejected_before_transport() {
        let (sender, calls) = test_sender();
        let err = sender
            .dispatch(&make_notification("email", "  "))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::EmptyContact(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_email_routes_to_email_transport() {
        let (sender, calls) = test_sender();
        sender
            .dispatch(&make_notification("email", "renter@example.com"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
