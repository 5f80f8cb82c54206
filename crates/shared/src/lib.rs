//! Shared types for the coursebundle platform
//!
//! Domain models, status enums and database pool helpers used by the API
//! server, the billing crate and the background worker.

pub mod db;
pub mod models;

pub use db::{create_pool, run_migrations};
pub use models::{
    Bundle, BundleType, Course, Frequency, Payment, PaymentStatus, Subscription,
    SubscriptionStatus, User,
};
