//! Bundle management
//!
//! CRUD over the bundles table plus the Stripe price lifecycle for recurring
//! bundles. Stripe forbids changing a price's amount, so every price update on
//! a recurring bundle creates a fresh Price object and re-points the bundle.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use stripe::{
    CreatePrice, CreatePriceProductData, CreatePriceRecurring, CreatePriceRecurringInterval,
    Currency, Price,
};
use uuid::Uuid;

use coursebundle_shared::{Bundle, BundleType, Course, User};

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Input for creating a bundle
#[derive(Debug, Clone, Deserialize)]
pub struct NewBundle {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub bundle_type: BundleType,
}

/// Input for updating a bundle; all fields required, matching the edit form
#[derive(Debug, Clone, Deserialize)]
pub struct BundleUpdate {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
}

/// Bundle with its public course rows nested
#[derive(Debug, Clone, Serialize)]
pub struct BundleWithCourses {
    #[serde(flatten)]
    pub bundle: Bundle,
    pub courses: Vec<Course>,
}

/// Convert a whole-unit price to Stripe minor units
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

pub(crate) fn parse_currency(code: &str) -> BillingResult<Currency> {
    Currency::from_str(&code.to_lowercase())
        .map_err(|_| BillingError::InvalidCurrency(code.to_string()))
}

#[derive(Clone)]
pub struct BundleService {
    stripe: StripeClient,
    pool: PgPool,
}

impl BundleService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    fn validate(name: &str, description: &str, price: f64, currency: &str) -> BillingResult<()> {
        if name.is_empty() {
            return Err(BillingError::Validation("name is empty".into()));
        }
        if description.is_empty() {
            return Err(BillingError::Validation("description is empty".into()));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(BillingError::Validation("price must be positive".into()));
        }
        // Sub-cent prices can never be matched back against Stripe's
        // minor-unit amounts, so reject them up front.
        let cents = price * 100.0;
        if (cents - cents.round()).abs() > 1e-6 {
            return Err(BillingError::Validation(
                "price must be a whole number of cents".into(),
            ));
        }
        if currency.is_empty() {
            return Err(BillingError::Validation("currency is empty".into()));
        }
        Ok(())
    }

    /// Create a monthly recurring Price on Stripe for a bundle
    async fn create_recurring_price(
        &self,
        name: &str,
        price: f64,
        currency: &str,
        bundle_id: i64,
    ) -> BillingResult<String> {
        let mut params = CreatePrice::new(parse_currency(currency)?);
        params.unit_amount = Some(to_minor_units(price));
        params.recurring = Some(CreatePriceRecurring {
            interval: CreatePriceRecurringInterval::Month,
            interval_count: None,
            aggregate_usage: None,
            trial_period_days: None,
            usage_type: None,
        });
        params.product_data = Some(CreatePriceProductData {
            name: name.to_string(),
            unit_label: Some("Bundle".to_string()),
            ..Default::default()
        });

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("bundle_id".to_string(), bundle_id.to_string());
        params.metadata = Some(metadata);

        let price_obj = Price::create(self.stripe.inner(), params).await?;

        tracing::info!(
            bundle_id = bundle_id,
            price_id = %price_obj.id,
            amount_minor = to_minor_units(price),
            "Created Stripe price for recurring bundle"
        );

        Ok(price_obj.id.to_string())
    }

    /// Create a bundle; recurring bundles get a Stripe price attached before
    /// they become purchasable.
    pub async fn create_bundle(&self, creator: &User, input: NewBundle) -> BillingResult<Bundle> {
        if !creator.is_creator {
            return Err(BillingError::CreatorRequired);
        }
        Self::validate(&input.name, &input.description, input.price, &input.currency)?;

        let bundle: Bundle = sqlx::query_as(
            r#"
            INSERT INTO bundles (name, description, price, currency, creator_id, bundle_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.currency)
        .bind(creator.id)
        .bind(input.bundle_type)
        .fetch_one(&self.pool)
        .await?;

        if input.bundle_type == BundleType::Recurring {
            let price_id = self
                .create_recurring_price(&input.name, input.price, &input.currency, bundle.id)
                .await?;

            let bundle: Bundle = sqlx::query_as(
                "UPDATE bundles SET stripe_price_id = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
            )
            .bind(&price_id)
            .bind(bundle.id)
            .fetch_one(&self.pool)
            .await?;

            return Ok(bundle);
        }

        Ok(bundle)
    }

    /// Update a bundle owned by `creator`. Recurring price changes rotate the
    /// Stripe price to a new object.
    pub async fn update_bundle(
        &self,
        creator: &User,
        bundle_id: i64,
        input: BundleUpdate,
    ) -> BillingResult<Bundle> {
        if !creator.is_creator {
            return Err(BillingError::CreatorRequired);
        }
        Self::validate(&input.name, &input.description, input.price, &input.currency)?;

        let existing: Option<Bundle> =
            sqlx::query_as("SELECT * FROM bundles WHERE id = $1 AND creator_id = $2")
                .bind(bundle_id)
                .bind(creator.id)
                .fetch_optional(&self.pool)
                .await?;

        let existing = existing.ok_or(BillingError::BundleNotFound(bundle_id))?;

        let new_price_id = if existing.bundle_type == BundleType::Recurring {
            Some(
                self.create_recurring_price(&input.name, input.price, &input.currency, bundle_id)
                    .await?,
            )
        } else {
            None
        };

        let bundle: Bundle = sqlx::query_as(
            r#"
            UPDATE bundles
            SET name = $1, description = $2, price = $3, currency = $4,
                stripe_price_id = COALESCE($5, stripe_price_id), updated_at = NOW()
            WHERE id = $6 AND creator_id = $7
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.currency)
        .bind(new_price_id.as_deref())
        .bind(bundle_id)
        .bind(creator.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            bundle_id = bundle_id,
            rotated_price = new_price_id.is_some(),
            "Bundle updated"
        );

        Ok(bundle)
    }

    /// Fetch a bundle by id with its publicly visible courses nested
    pub async fn get_bundle(&self, bundle_id: i64) -> BillingResult<BundleWithCourses> {
        let bundle: Option<Bundle> = sqlx::query_as("SELECT * FROM bundles WHERE id = $1")
            .bind(bundle_id)
            .fetch_optional(&self.pool)
            .await?;

        let bundle = bundle.ok_or(BillingError::BundleNotFound(bundle_id))?;

        let courses: Vec<Course> = sqlx::query_as(
            r#"
            SELECT c.*
            FROM courses c
            JOIN bundle_courses bc ON bc.course_id = c.id
            WHERE bc.bundle_id = $1 AND c.public = TRUE
            ORDER BY c.id
            "#,
        )
        .bind(bundle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(BundleWithCourses { bundle, courses })
    }

    pub async fn list_all(&self) -> BillingResult<Vec<Bundle>> {
        let bundles: Vec<Bundle> =
            sqlx::query_as("SELECT * FROM bundles ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(bundles)
    }

    pub async fn list_by_creator(&self, creator_id: Uuid) -> BillingResult<Vec<Bundle>> {
        let bundles: Vec<Bundle> =
            sqlx::query_as("SELECT * FROM bundles WHERE creator_id = $1 ORDER BY created_at DESC")
                .bind(creator_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(bundles)
    }

    /// Bundles that include the given course
    pub async fn list_by_course(&self, course_id: i64) -> BillingResult<Vec<Bundle>> {
        let bundles: Vec<Bundle> = sqlx::query_as(
            r#"
            SELECT b.*
            FROM bundles b
            JOIN bundle_courses bc ON bc.bundle_id = b.id
            WHERE bc.course_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bundles)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn minor_units_round_half_cents() {
        assert_eq!(to_minor_units(9.99), 999);
        assert_eq!(to_minor_units(10.0), 1000);
        assert_eq!(to_minor_units(0.015), 2);
        assert_eq!(to_minor_units(19.999), 2000);
    }

    #[test]
    fn currency_codes_parse_case_insensitively() {
        assert_eq!(parse_currency("EUR").unwrap(), Currency::EUR);
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
        assert!(matches!(
            parse_currency("???"),
            Err(BillingError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn validation_rejects_blank_fields_and_bad_prices() {
        assert!(BundleService::validate("", "d", 1.0, "EUR").is_err());
        assert!(BundleService::validate("n", "", 1.0, "EUR").is_err());
        assert!(BundleService::validate("n", "d", 0.0, "EUR").is_err());
        assert!(BundleService::validate("n", "d", f64::NAN, "EUR").is_err());
        assert!(BundleService::validate("n", "d", 1.0, "").is_err());
        assert!(BundleService::validate("n", "d", 9.99, "EUR").is_ok());
    }

    #[test]
    fn validation_rejects_sub_cent_prices() {
        // A 9.999 bundle would produce charges that never match the stored
        // price, so it must be rejected before any row exists.
        assert!(BundleService::validate("n", "d", 9.999, "EUR").is_err());
        assert!(BundleService::validate("n", "d", 0.001, "EUR").is_err());
        assert!(BundleService::validate("n", "d", 0.01, "EUR").is_ok());
        assert!(BundleService::validate("n", "d", 1234.56, "EUR").is_ok());
    }
}
