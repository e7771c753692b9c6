use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::TicketError;
use crate::store::NewUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/users", post(create_user))
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    email: String,
    name: String,
}

// POST /api/users
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, TicketError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(TicketError::InvalidInput("email is malformed".to_string()));
    }
    let user = state
        .store
        .create_user(NewUser {
            email: req.email,
            name: req.name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}
