use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles a registered account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Landlord,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
            Role::Landlord => write!(f, "landlord"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl Role {
    /// Parse a role string, returning `None` for unrecognized values.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "user" => Some(Role::User),
            "agent" => Some(Role::Agent),
            "landlord" => Some(Role::Landlord),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Rented,
    Inactive,
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Active => write!(f, "active"),
            ListingStatus::Rented => write!(f, "rented"),
            ListingStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// The channel through which a notification is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Email,
    Sms,
    Whatsapp,
}

impl ContactMethod {
    /// Parse a contact method string, returning `None` for unrecognized values.
    ///
    /// The queue payload carries the method as a string so that unknown values
    /// survive decoding and can be rejected at routing time.
    pub fn parse(value: &str) -> Option<ContactMethod> {
        match value {
            "email" => Some(ContactMethod::Email),
            "sms" => Some(ContactMethod::Sms),
            "whatsapp" => Some(ContactMethod::Whatsapp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Email => "email",
            ContactMethod::Sms => "sms",
            ContactMethod::Whatsapp => "whatsapp",
        }
    }
}

impl std::fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification delivery status, owned by the producer/store side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A registered user. The password hash never leaves the auth layer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A category of rental property (apartment, duplex, ...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyType {
    pub id: Uuid,
    pub name: String,
}

/// A rental listing published by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub title: String,
    pub description: String,
    /// Monthly rent in the smallest currency unit
    pub price: i64,
    pub location: String,
    pub property_type_id: Uuid,
    pub verified: bool,
    pub images: serde_json::Value,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

/// A saved search: the user is notified when a new listing falls inside it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub min_price: i64,
    pub max_price: i64,
    pub location: String,
    pub property_type_id: Uuid,
    pub contact_method: ContactMethod,
    pub created_at: DateTime<Utc>,
}

/// A user's bookmarked listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
}

/// One unit of outbound contact work — both the `notifications` table row and
/// the JSON payload carried on the queue.
///
/// `contact_method` stays a string here (not [`ContactMethod`]) so a payload
/// with an unrecognized method still decodes; routing rejects it with an
/// "unknown contact method" error instead of the decoder masking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub contact_method: String,
    /// Destination address or number; semantics depend on `contact_method`
    pub contact: String,
    /// Only meaningful for email
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    /// Set by the store once delivery is confirmed
    pub sent_at: Option<DateTime<Utc>>,
}
