use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Resource, TicketError};
use crate::store::NewEvent;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/{id}", get(get_event))
}

#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    title: String,
    description: Option<String>,
    price: Decimal,
    total_seats: i32,
    starts_at: Option<DateTime<Utc>>,
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, TicketError> {
    if req.title.trim().is_empty() {
        return Err(TicketError::InvalidInput("title must not be empty".to_string()));
    }
    if req.total_seats < 0 {
        return Err(TicketError::InvalidInput(
            "total_seats must not be negative".to_string(),
        ));
    }
    if req.price < Decimal::ZERO {
        return Err(TicketError::InvalidInput("price must not be negative".to_string()));
    }

    let event = state
        .store
        .create_event(NewEvent {
            title: req.title,
            description: req.description,
            price: req.price,
            total_seats: req.total_seats,
            starts_at: req.starts_at,
        })
        .await?;

    tracing::info!("event {} created with {} seats", event.id, event.total_seats);
    Ok((StatusCode::CREATED, Json(event)))
}

// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, TicketError> {
    let events = state.store.list_events().await?;
    Ok(Json(events))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, TicketError> {
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or(TicketError::NotFound(Resource::Event(id)))?;
    Ok(Json(event))
}
