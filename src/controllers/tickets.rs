use axum::{
    extract::{Path, Query, State},
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
        .route("/tickets", post(reserve).get(list_tickets).delete(cancel_all))
        .route("/tickets/{id}", get(get_ticket).delete(cancel))
        .route("/tickets/{id}/confirm", post(confirm))
}

// POST /api/tickets
#[derive(Debug, Deserialize)]
struct ReserveRequest {
    user_id: Uuid,
    event_id: Uuid,
    quantity: i32,
}

async fn reserve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReserveRequest>,
) -> Result<impl IntoResponse, TicketError> {
    let reservation = state
        .reservations
        .reserve(req.user_id, req.event_id, req.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Reservation successful. Proceed to payment.",
            "reservation_id": reservation.reservation_id,
            "total_amount": reservation.total_amount,
            "tickets": reservation.tickets,
        })),
    ))
}

// GET /api/tickets?user_id=
#[derive(Debug, Deserialize)]
struct TicketsQuery {
    user_id: Option<Uuid>,
}

async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TicketsQuery>,
) -> Result<impl IntoResponse, TicketError> {
    let tickets = state.store.list_tickets(params.user_id).await?;
    Ok(Json(tickets))
}

// GET /api/tickets/{id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, TicketError> {
    let ticket = state
        .store
        .get_ticket(id)
        .await?
        .ok_or(TicketError::NotFound(Resource::Ticket(id)))?;
    Ok(Json(ticket))
}

// POST /api/tickets/{id}/confirm
async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, TicketError> {
    let ticket = state.reservations.confirm(id).await?;
    let ticket_url = format!("{}/tickets/{}/view", state.config.app.site_base_url, ticket.id);
    Ok(Json(json!({
        "success": true,
        "message": "Payment successful.",
        "ticket": ticket,
        "ticket_url": ticket_url,
    })))
}

// DELETE /api/tickets/{id}
async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, TicketError> {
    let ticket = state.reservations.cancel(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Ticket cancelled, seat released.",
        "ticket": ticket,
    })))
}

// DELETE /api/tickets?event_id=
#[derive(Debug, Deserialize)]
struct CancelAllQuery {
    event_id: Option<Uuid>,
}

async fn cancel_all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CancelAllQuery>,
) -> Result<impl IntoResponse, TicketError> {
    let deleted = state.reservations.cancel_all(params.event_id).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
