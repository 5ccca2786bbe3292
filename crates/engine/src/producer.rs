//! Notification producer — fans a new listing out into queued delivery jobs.
//!
//! For every alert matching the listing, a `pending` notification row is
//! written and the same payload is published to the durable queue the
//! dispatcher consumes. One alert's failure never aborts the rest of the
//! fan-out.

use sqlx::PgPool;
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::{ContactMethod, Listing, Notification, NotificationStatus, User};
use pulse_notifier::queue::QueueClient;

use crate::matcher::AlertMatcher;

/// Builds and publishes notification jobs for listing events.
pub struct NotificationProducer {
    matcher: AlertMatcher,
}

impl NotificationProducer {
    pub fn new() -> Self {
        Self {
            matcher: AlertMatcher::new(),
        }
    }

    /// Match the listing against saved alerts and enqueue one notification
    /// per match. Returns the number of jobs queued.
    pub async fn fan_out(
        &self,
        listing: &Listing,
        pool: &PgPool,
        queue: &QueueClient,
    ) -> Result<u32, AppError> {
        let alerts = self.matcher.find_matching_alerts(listing, pool).await?;
        if alerts.is_empty() {
            return Ok(0);
        }

        let (subject, body) = compose_message(listing);
        let mut queued = 0u32;

        for alert in &alerts {
            let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
                .bind(alert.user_id)
                .fetch_optional(pool)
                .await?;
            let Some(user) = user else {
                tracing::warn!(alert_id = %alert.id, user_id = %alert.user_id, "Alert owner no longer exists, skipping");
                continue;
            };

            let Some(contact) = resolve_contact(alert.contact_method, &user) else {
                tracing::warn!(
                    alert_id = %alert.id,
                    user_id = %user.id,
                    contact_method = %alert.contact_method,
                    "User has no contact for this method, skipping"
                );
                continue;
            };

            let notification = Notification {
                id: Uuid::new_v4(),
                user_id: user.id,
                listing_id: listing.id,
                contact_method: alert.contact_method.to_string(),
                contact,
                subject: subject.clone(),
                body: body.clone(),
                status: NotificationStatus::Pending,
                sent_at: None,
            };

            sqlx::query(
                r#"
                INSERT INTO notifications (id, user_id, listing_id, contact_method, contact, subject, body, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(notification.id)
            .bind(notification.user_id)
            .bind(notification.listing_id)
            .bind(&notification.contact_method)
            .bind(&notification.contact)
            .bind(&notification.subject)
            .bind(&notification.body)
            .bind(notification.status.to_string())
            .execute(pool)
            .await?;

            // The row stays `pending` if the publish fails; the job can be
            // re-published from the store later.
            match queue.publish(&notification).await {
                Ok(_) => {
                    tracing::info!(
                        notification_id = %notification.id,
                        listing_id = %listing.id,
                        alert_id = %alert.id,
                        contact_method = %notification.contact_method,
                        "Notification queued"
                    );
                    queued += 1;
                }
                Err(e) => {
                    tracing::error!(
                        notification_id = %notification.id,
                        listing_id = %listing.id,
                        error = %e,
                        "Failed to publish notification"
                    );
                }
            }
        }

        Ok(queued)
    }
}

impl Default for NotificationProducer {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination address for a contact method, if the user has one.
fn resolve_contact(method: ContactMethod, user: &User) -> Option<String> {
    match method {
        ContactMethod::Email => Some(user.email.clone()),
        ContactMethod::Sms | ContactMethod::Whatsapp => user.phone_number.clone(),
    }
}

/// Compose the message for a listing event.
fn compose_message(listing: &Listing) -> (String, String) {
    let subject = format!("New listing in {}", listing.location);
    let body = format!(
        "{} — {}/month in {}.\n\n{}",
        listing.title, listing.price, listing.location, listing.description
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use pulse_common::types::{ListingStatus, Role};

    fn make_user(phone: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: phone.map(str::to_string),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    fn make_listing() -> Listing {
        Listing {
            id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            title: "2-bedroom flat".to_string(),
            description: "Bright flat close to the market".to_string(),
            price: 450_000,
            location: "Yaba".to_string(),
            property_type_id: Uuid::new_v4(),
            verified: false,
            images: serde_json::json!([]),
            status: ListingStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_email_contact_is_user_email() {
        let user = make_user(None);
        assert_eq!(
            resolve_contact(ContactMethod::Email, &user),
            Some("ada@example.com".to_string())
        );
    }

    #[test]
    fn test_sms_contact_requires_phone() {
        assert_eq!(
            resolve_contact(ContactMethod::Sms, &make_user(Some("+2348012345678"))),
            Some("+2348012345678".to_string())
        );
        assert_eq!(resolve_contact(ContactMethod::Sms, &make_user(None)), None);
        assert_eq!(
            resolve_contact(ContactMethod::Whatsapp, &make_user(None)),
            None
        );
    }

    #[test]
    fn test_compose_message_names_the_listing() {
        let listing = make_listing();
        let (subject, body) = compose_message(&listing);
        assert_eq!(subject, "New listing in Yaba");
        assert!(body.contains("2-bedroom flat"));
        assert!(body.contains("450000"));
        assert!(body.contains("Bright flat close to the market"));
    }
}
