//! Checkout session initiation
//!
//! Resolves the bundle, lazily ensures a Stripe customer for the buyer, then
//! creates either a SetupIntent (recurring) or a PaymentIntent (one-time).
//! The returned client secret is the only thing the browser needs; card data
//! never passes through this service.

use serde::Serialize;
use sqlx::PgPool;
use stripe::{
    CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, CreateSetupIntent,
    PaymentIntent, SetupIntent,
};
use uuid::Uuid;

use coursebundle_shared::BundleType;

use crate::bundles::{parse_currency, to_minor_units, BundleService};
use crate::client::StripeClient;
use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult};

/// Opaque handle for the browser payment element
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub client_secret: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    stripe: StripeClient,
    bundles: BundleService,
    customers: CustomerService,
}

impl CheckoutService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        let bundles = BundleService::new(stripe.clone(), pool.clone());
        let customers = CustomerService::new(stripe.clone(), pool);
        Self {
            stripe,
            bundles,
            customers,
        }
    }

    /// Start a checkout for `bundle_id` on behalf of the authenticated buyer.
    ///
    /// Preconditions are checked before any Stripe call that would leave
    /// partial state: the bundle must exist, and a recurring bundle must
    /// already carry its Stripe price reference.
    pub async fn create_checkout_session(
        &self,
        buyer_id: Uuid,
        bundle_id: i64,
    ) -> BillingResult<CheckoutResponse> {
        let bundle = self.bundles.get_bundle(bundle_id).await?.bundle;

        if bundle.bundle_type == BundleType::Recurring && bundle.stripe_price_id.is_none() {
            return Err(BillingError::MissingPriceReference(bundle.id));
        }

        let customer_id = self.customers.ensure_customer(buyer_id).await?;
        let customer = customer_id
            .parse::<stripe::CustomerId>()
            .map_err(|e| BillingError::Internal(format!("invalid customer id: {}", e)))?;

        let client_secret = match bundle.bundle_type {
            BundleType::Recurring => {
                let mut metadata = std::collections::HashMap::new();
                metadata.insert("user_id".to_string(), buyer_id.to_string());
                metadata.insert("bundle_id".to_string(), bundle.id.to_string());
                metadata.insert("creator_id".to_string(), bundle.creator_id.to_string());
                metadata.insert("type".to_string(), "recurring".to_string());

                let mut params = CreateSetupIntent::new();
                params.customer = Some(customer);
                params.metadata = Some(metadata);
                params.payment_method_types = Some(vec!["card".to_string()]);

                let intent = SetupIntent::create(self.stripe.inner(), params).await?;

                tracing::info!(
                    buyer_id = %buyer_id,
                    bundle_id = bundle.id,
                    setup_intent = %intent.id,
                    "Created setup intent for recurring bundle"
                );

                intent.client_secret
            }
            BundleType::OneTime => {
                let mut params = CreatePaymentIntent::new(
                    to_minor_units(bundle.price),
                    parse_currency(&bundle.currency)?,
                );
                params.customer = Some(customer);
                params.automatic_payment_methods =
                    Some(CreatePaymentIntentAutomaticPaymentMethods {
                        enabled: true,
                        allow_redirects: None,
                    });

                let mut metadata = std::collections::HashMap::new();
                metadata.insert("bundle_id".to_string(), bundle.id.to_string());
                metadata.insert("creator_id".to_string(), bundle.creator_id.to_string());
                metadata.insert("buyer_id".to_string(), buyer_id.to_string());
                metadata.insert("type".to_string(), "one_time".to_string());
                params.metadata = Some(metadata);

                let intent = PaymentIntent::create(self.stripe.inner(), params).await?;

                tracing::info!(
                    buyer_id = %buyer_id,
                    bundle_id = bundle.id,
                    payment_intent = %intent.id,
                    amount_minor = to_minor_units(bundle.price),
                    "Created payment intent for one-time bundle"
                );

                intent.client_secret
            }
        };

        let client_secret = client_secret
            .ok_or_else(|| BillingError::Internal("Stripe returned no client secret".into()))?;

        Ok(CheckoutResponse { client_secret })
    }
}
