//! # Payment Gateways
//!
//! Payment initiation for the three checkout methods.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Payment Initiation                                   │
//! │                                                                         │
//! │  CheckoutSubmitter ──► initiate(method, ..) ──┬──► mpesa_stk_push()    │
//! │                                               ├──► card_charge()       │
//! │                                               └──► paypal_payment()    │
//! │                                                          │              │
//! │                                   PaymentAck { reference } ◄┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only [`PlaceholderGateway`] exists today: it waits a configurable delay
//! and acknowledges every well-formed request. Real Daraja / card / PayPal
//! clients plug in behind [`PaymentGateway`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use printhouse_core::{Money, PaymentMethod};

/// Payment initiation failures.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway refused the request.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The gateway could not be reached.
    #[error("Payment service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid payment amount: {0}")]
    InvalidAmount(Money),
}

/// A gateway's acknowledgment of a payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    pub method: PaymentMethod,
    /// Reference stored on the order.
    pub reference: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
}

/// Payment collaborator used by checkout.
pub trait PaymentGateway: Send + Sync {
    /// Sends an M-Pesa STK push prompt to `phone`.
    fn mpesa_stk_push(
        &self,
        phone: &str,
        amount: Money,
        order_ref: &str,
    ) -> impl Future<Output = Result<PaymentAck, PaymentError>> + Send;

    /// Charges a card for `order_ref`.
    fn card_charge(
        &self,
        amount: Money,
        order_ref: &str,
    ) -> impl Future<Output = Result<PaymentAck, PaymentError>> + Send;

    /// Creates a PayPal wallet payment.
    fn paypal_payment(
        &self,
        amount: Money,
        currency: &str,
    ) -> impl Future<Output = Result<PaymentAck, PaymentError>> + Send;
}

/// Dispatches to the gateway call for `method`.
pub async fn initiate<G: PaymentGateway>(
    gateway: &G,
    method: PaymentMethod,
    phone: &str,
    amount: Money,
    order_ref: &str,
    paypal_currency: &str,
) -> Result<PaymentAck, PaymentError> {
    debug!(%method, order_ref, amount = amount.cents(), "Initiating payment");

    match method {
        PaymentMethod::Mpesa => gateway.mpesa_stk_push(phone, amount, order_ref).await,
        PaymentMethod::Card => gateway.card_charge(amount, order_ref).await,
        PaymentMethod::Paypal => gateway.paypal_payment(amount, paypal_currency).await,
    }
}

// =============================================================================
// Placeholder Gateway
// =============================================================================

/// Gateway that simulates network latency and always accepts.
#[derive(Debug, Clone)]
pub struct PlaceholderGateway {
    latency: Duration,
}

impl PlaceholderGateway {
    pub fn new(latency: Duration) -> Self {
        PlaceholderGateway { latency }
    }

    /// No simulated delay.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    async fn simulate(&self, amount: Money) -> Result<(), PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount(amount));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }
}

impl Default for PlaceholderGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

impl PaymentGateway for PlaceholderGateway {
    async fn mpesa_stk_push(
        &self,
        phone: &str,
        amount: Money,
        order_ref: &str,
    ) -> Result<PaymentAck, PaymentError> {
        self.simulate(amount).await?;
        info!(phone, order_ref, amount = amount.cents(), "STK push accepted");

        Ok(PaymentAck {
            method: PaymentMethod::Mpesa,
            reference: "456".to_string(),
            message: "Success. Request accepted for processing".to_string(),
            merchant_request_id: Some("123".to_string()),
            checkout_request_id: Some("456".to_string()),
            response_code: Some("0".to_string()),
        })
    }

    async fn card_charge(&self, amount: Money, order_ref: &str) -> Result<PaymentAck, PaymentError> {
        self.simulate(amount).await?;
        info!(order_ref, amount = amount.cents(), "Card charge accepted");

        Ok(PaymentAck {
            method: PaymentMethod::Card,
            reference: format!("card-{}", order_ref),
            message: "Payment processed successfully".to_string(),
            merchant_request_id: None,
            checkout_request_id: None,
            response_code: None,
        })
    }

    async fn paypal_payment(&self, amount: Money, currency: &str) -> Result<PaymentAck, PaymentError> {
        self.simulate(amount).await?;
        let reference = format!("paypal-{}", uuid::Uuid::new_v4());
        info!(currency, reference = %reference, "PayPal payment created");

        Ok(PaymentAck {
            method: PaymentMethod::Paypal,
            reference,
            message: format!("PayPal payment created in {}", currency),
            merchant_request_id: None,
            checkout_request_id: None,
            response_code: None,
        })
    }
}
