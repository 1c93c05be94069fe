//! Ticket API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use triage_core::{Ticket, TicketError};

use crate::metrics::TICKETS_CREATED_TOTAL;
use crate::state::AppState;

/// Request body for creating a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub title: String,
    pub description: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TicketErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> (StatusCode, Json<TicketErrorResponse>) {
    (status, Json(TicketErrorResponse { error }))
}

fn map_ticket_error(e: TicketError) -> (StatusCode, Json<TicketErrorResponse>) {
    let status = match &e {
        TicketError::Validation(_) => StatusCode::BAD_REQUEST,
        TicketError::NotFound(_) => StatusCode::NOT_FOUND,
        TicketError::InvalidTransition { .. } => StatusCode::CONFLICT,
    };
    error_response(status, e.to_string())
}

/// Create a new ticket. Returns immediately; the generation job runs in
/// the background and its progress is observable on the ticket's stream.
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<Ticket>), impl IntoResponse> {
    match state.service().create_ticket(&body.title, &body.description) {
        Ok(ticket) => {
            TICKETS_CREATED_TOTAL.inc();
            Ok((StatusCode::CREATED, Json(ticket)))
        }
        Err(e) => Err(map_ticket_error(e)),
    }
}

/// List all tickets, most-recently-created first
pub async fn list_tickets(State(state): State<Arc<AppState>>) -> Json<Vec<Ticket>> {
    Json(state.service().list_tickets())
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, impl IntoResponse> {
    match state.service().get_ticket(&id) {
        Ok(ticket) => Ok(Json(ticket)),
        Err(e) => Err(map_ticket_error(e)),
    }
}
