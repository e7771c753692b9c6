use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Resource, TicketError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/checkout", post(checkout))
        .route("/payments/success", get(payment_success))
        .route("/payments/failure", get(payment_failure))
}

// POST /api/payments/checkout
#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    reservation_id: Uuid,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, TicketError> {
    let tickets = state
        .store
        .list_reservation_tickets(req.reservation_id)
        .await?;
    if tickets.is_empty() {
        return Err(TicketError::NotFound(Resource::Reservation(req.reservation_id)));
    }

    let total_amount = tickets
        .iter()
        .map(|t| t.price_at_purchase)
        .sum::<rust_decimal::Decimal>();
    let description = format!("{} ticket(s)", tickets.len());

    // the gateway's success callback is keyed by one ticket id
    let payment_url = state
        .payments
        .create_checkout(total_amount, &description, req.reservation_id, tickets[0].id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "payment_url": payment_url,
            "reservation_id": req.reservation_id,
            "amount": total_amount,
        })),
    ))
}

// GET /api/payments/success?ticket_id=
// Invoked by the payment gateway after a completed checkout.
#[derive(Debug, Deserialize)]
struct SuccessQuery {
    ticket_id: Uuid,
}

async fn payment_success(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuccessQuery>,
) -> Result<impl IntoResponse, TicketError> {
    let ticket = state.reservations.confirm(params.ticket_id).await?;
    let ticket_url = format!("{}/tickets/{}/view", state.config.app.site_base_url, ticket.id);
    Ok(Json(json!({
        "success": true,
        "message": "Payment successful.",
        "ticket": ticket,
        "ticket_url": ticket_url,
    })))
}

// GET /api/payments/failure
// Abandoned checkouts land here; the tickets stay pending on purpose.
async fn payment_failure() -> impl IntoResponse {
    Json(json!({
        "success": false,
        "message": "Payment was cancelled. Your reservation is still pending.",
    }))
}
