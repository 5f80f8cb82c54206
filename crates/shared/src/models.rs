//! Domain models
//!
//! Rows map 1:1 onto the tables in `migrations/`. Status transitions on
//! subscriptions and payments are owned by the billing webhook handlers;
//! nothing else mutates those columns.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Purchasable offering type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BundleType {
    OneTime,
    Recurring,
}

impl BundleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleType::OneTime => "one_time",
            BundleType::Recurring => "recurring",
        }
    }
}

impl std::fmt::Display for BundleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing cadence recorded on a subscription row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    OneTime,
    Recurring,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OneTime => "one_time",
            Frequency::Recurring => "recurring",
        }
    }
}

/// Subscription lifecycle state
///
/// pending -> paid (subscription created / payment succeeded)
/// pending -> failed (payment failed)
/// paid    -> cancelled (subscription deleted, or updated with cancel_at)
///
/// `failed` and `cancelled` are terminal. No transition removes a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Paid => "paid",
            SubscriptionStatus::Failed => "failed",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a transition driven by the given target is allowed
    pub fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        matches!(
            (self, next),
            (
                SubscriptionStatus::Pending,
                SubscriptionStatus::Paid | SubscriptionStatus::Failed
            ) | (SubscriptionStatus::Paid, SubscriptionStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment lifecycle state. Only webhook handlers finalize a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Platform user. `stripe_customer_id` is attached lazily on first checkout
/// and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub is_creator: bool,
    pub social: Option<serde_json::Value>,
    pub stripe_customer_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A purchasable bundle of courses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bundle {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub creator_id: Uuid,
    pub bundle_type: BundleType,
    /// Required before checkout for recurring bundles; rotated on price change
    pub stripe_price_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Course row, returned nested under a bundle (public courses only)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub public: bool,
    pub created_at: OffsetDateTime,
}

/// One record per purchase attempt. A row with `end_date = NULL` is live.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: Uuid,
    pub bundle_id: i64,
    pub payment_status: SubscriptionStatus,
    pub price: f64,
    pub frequency: Frequency,
    /// Stripe payment-intent id (one-time) or subscription id (recurring)
    pub stripe_reference: String,
    pub start_date: OffsetDateTime,
    pub end_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One record per money-movement attempt. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: Uuid,
    pub creator_id: Option<Uuid>,
    pub subscription_id: Option<i64>,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub stripe_transaction_id: Option<String>,
    pub payment_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_become_paid_or_failed() {
        assert!(SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Paid));
        assert!(SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Failed));
        assert!(!SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Cancelled));
    }

    #[test]
    fn paid_can_only_be_cancelled() {
        assert!(SubscriptionStatus::Paid.can_transition_to(SubscriptionStatus::Cancelled));
        assert!(!SubscriptionStatus::Paid.can_transition_to(SubscriptionStatus::Pending));
        assert!(!SubscriptionStatus::Paid.can_transition_to(SubscriptionStatus::Failed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for next in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Paid,
            SubscriptionStatus::Failed,
            SubscriptionStatus::Cancelled,
        ] {
            assert!(!SubscriptionStatus::Failed.can_transition_to(next));
            assert!(!SubscriptionStatus::Cancelled.can_transition_to(next));
        }
    }
}
