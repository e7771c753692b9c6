use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;

/// Errors surfaced by the reservation engine.
///
/// Capacity and limit variants carry the current numbers so callers can show
/// an actionable message; storage failures stay opaque to the client.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(Resource),

    #[error("event is sold out, only {remaining} seats remain")]
    SoldOut { remaining: i32 },

    #[error("at most 10 tickets per event; you hold {held} and can buy {remaining} more")]
    LimitExceeded { held: i64, remaining: i64 },

    #[error("ticket {0} is already paid and confirmed")]
    AlreadyConfirmed(Uuid),

    #[error("payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User(Uuid),
    Event(Uuid),
    Ticket(Uuid),
    Reservation(Uuid),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::User(id) => write!(f, "user {id}"),
            Resource::Event(id) => write!(f, "event {id}"),
            Resource::Ticket(id) => write!(f, "ticket {id}"),
            Resource::Reservation(id) => write!(f, "reservation {id}"),
        }
    }
}

impl TicketError {
    fn status(&self) -> StatusCode {
        match self {
            TicketError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TicketError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketError::SoldOut { .. }
            | TicketError::LimitExceeded { .. }
            | TicketError::AlreadyConfirmed(_) => StatusCode::CONFLICT,
            TicketError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            TicketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TicketError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            // never leak storage details to the client
            TicketError::Storage(e) => {
                tracing::error!("storage error: {:?}", e);
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "success": false, "message": message }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_errors_name_the_numbers() {
        let e = TicketError::SoldOut { remaining: 3 };
        assert!(e.to_string().contains("3"));

        let e = TicketError::LimitExceeded { held: 9, remaining: 1 };
        let msg = e.to_string();
        assert!(msg.contains("9") && msg.contains("1 more"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            TicketError::SoldOut { remaining: 0 }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TicketError::NotFound(Resource::Ticket(Uuid::nil())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TicketError::InvalidInput("quantity".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
