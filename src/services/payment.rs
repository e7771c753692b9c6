//! Client for the external payment gateway.
//!
//! The gateway receives a checkout amount and a correlation id and answers
//! with a hosted payment URL; it later calls back into the confirmation
//! endpoint on success. All calls run through a circuit breaker so a broken
//! gateway is not hammered with requests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::error::TicketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerInner {
    state: BreakerState,
    failures: u32,
    opened_at: Option<Instant>,
}

/// Trips after `threshold` consecutive failures; after `cooldown` a single
/// probe request is let through and its outcome closes or re-opens the
/// circuit.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: 0,
                opened_at: None,
            }),
            threshold,
            cooldown,
        }
    }

    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.cooldown);
                if cooled {
                    inner.state = BreakerState::HalfOpen;
                    info!("circuit breaker half-open, allowing a probe request");
                }
                cooled
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::HalfOpen {
            info!("circuit breaker closed after successful probe");
        }
        inner.state = BreakerState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures += 1;
        if inner.state == BreakerState::HalfOpen || inner.failures >= self.threshold {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
            warn!(
                "circuit breaker opened after {} consecutive failures",
                inner.failures
            );
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }
}

#[derive(Debug, Serialize)]
struct CheckoutRequest {
    /// Amount in minor units (cents).
    amount: i64,
    currency: String,
    #[serde(rename = "orderId")]
    order_id: String,
    description: String,
    #[serde(rename = "successURL")]
    success_url: String,
    #[serde(rename = "cancelURL")]
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    #[serde(rename = "paymentURL")]
    pub payment_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutClient {
    http: reqwest::Client,
    gateway_url: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
    breaker: Arc<CircuitBreaker>,
}

impl CheckoutClient {
    pub fn from_config(config: &PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            gateway_url: config.gateway_url.clone(),
            secret_key: config.secret_key.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
            breaker: Arc::new(CircuitBreaker::new(
                config.failure_threshold,
                Duration::from_secs(config.cooldown_seconds),
            )),
        }
    }

    /// Creates a checkout session for one reservation and returns the
    /// gateway's redirect URL. The success URL is keyed by a single ticket
    /// id, which the gateway echoes back on its success callback.
    pub async fn create_checkout(
        &self,
        amount: Decimal,
        description: &str,
        reservation_id: Uuid,
        ticket_id: Uuid,
    ) -> Result<String, TicketError> {
        if !self.breaker.can_execute() {
            warn!("circuit breaker open, rejecting checkout for {}", reservation_id);
            return Err(TicketError::PaymentGateway(
                "payment gateway temporarily unavailable".to_string(),
            ));
        }

        let minor_units = (amount * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| TicketError::InvalidInput("amount out of range".to_string()))?;

        let request = CheckoutRequest {
            amount: minor_units,
            currency: "USD".to_string(),
            order_id: reservation_id.to_string(),
            description: description.to_string(),
            success_url: format!("{}?ticket_id={}", self.success_url, ticket_id),
            cancel_url: self.cancel_url.clone(),
        };

        info!(
            "creating checkout: reservation={}, amount={} minor units",
            reservation_id, minor_units
        );

        let result = async {
            self.http
                .post(format!("{}/v1/checkout/sessions", self.gateway_url))
                .bearer_auth(&self.secret_key)
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<CheckoutResponse>()
                .await
        }
        .await;

        let response = match result {
            Ok(response) => {
                self.breaker.record_success();
                response
            }
            Err(e) => {
                error!("payment gateway request failed: {:?}", e);
                self.breaker.record_failure();
                return Err(TicketError::PaymentGateway(e.to_string()));
            }
        };

        match (response.success, response.payment_url) {
            (true, Some(url)) => Ok(url),
            _ => Err(TicketError::PaymentGateway(
                response
                    .message
                    .unwrap_or_else(|| "gateway rejected the checkout".to_string()),
            )),
        }
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }
}
