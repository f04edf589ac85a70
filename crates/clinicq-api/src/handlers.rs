//! REST API endpoint handlers for the queue server.
//!
//! Handlers are thin: parse the request, call one [`QueueEngine`]
//! operation, serialize the result. Staff routes take a [`StaffAccess`]
//! argument so the [`AuthGate`](crate::auth::AuthGate) runs before the
//! engine is touched.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/clinics` | List clinics |
//! | `GET` | `/api/tickets` | Waiting list (staff) |
//! | `POST` | `/api/tickets` | Issue a ticket (staff) |
//! | `GET` | `/api/tickets/:id` | Single ticket (staff) |
//! | `POST` | `/api/tickets/call` | Call next, optionally `?clinic_id=N` (staff) |
//! | `POST` | `/api/tickets/:id/finish` | Finish a ticket (staff) |
//! | `POST` | `/api/tickets/:id/absent` | Mark a ticket absent (staff) |
//! | `GET` | `/api/display` | Current + next two (number and name only), for the waiting room |
//!
//! [`QueueEngine`]: clinicq_core::QueueEngine

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use clinicq_core::EnqueueRequest;
use clinicq_types::{ClinicId, DisplayBoard, TicketId};

use crate::auth::StaffAccess;
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `POST /api/tickets/call`.
#[derive(Debug, serde::Deserialize)]
pub struct CallQuery {
    /// Only call tickets queued for this clinic.
    pub clinic_id: Option<i64>,
}

fn ticket_id(path: Result<Path<i64>, PathRejection>) -> Result<TicketId, ApiError> {
    let Path(raw) = path.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    Ok(TicketId::new(raw))
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing queue totals and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let counts = state.engine.counts().await?;
    let subscribers = state.broadcaster.subscriber_count().await;
    let waiting = counts.waiting;
    let serving = counts.serving;
    let finished = counts.finished;
    let absent = counts.absent;

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Clinic Queue</title>
    <style>
        body {{
            background: #f8f9fa;
            color: #212529;
            font-family: system-ui, sans-serif;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #007bff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #fff;
            border: 1px solid #dee2e6;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #6c757d; font-size: 0.85rem; }}
        .metric .value {{ color: #007bff; font-size: 1.5rem; font-weight: bold; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #dee2e6; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Clinic Queue</h1>
    <div>
        <div class="metric"><div class="label">Waiting</div><div class="value">{waiting}</div></div>
        <div class="metric"><div class="label">Serving</div><div class="value">{serving}</div></div>
        <div class="metric"><div class="label">Finished</div><div class="value">{finished}</div></div>
        <div class="metric"><div class="label">Absent</div><div class="value">{absent}</div></div>
        <div class="metric"><div class="label">Displays</div><div class="value">{subscribers}</div></div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/clinics">/api/clinics</a> -- Clinics</li>
        <li>GET <a href="/api/display">/api/display</a> -- Current ticket and next two</li>
        <li>GET /api/tickets -- Waiting list (staff)</li>
        <li>POST /api/tickets -- Issue a ticket (staff)</li>
        <li>POST /api/tickets/call -- Call the next patient (staff)</li>
        <li>POST /api/tickets/:id/finish -- Finish (staff)</li>
        <li>POST /api/tickets/:id/absent -- Mark absent (staff)</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/queue</code> -- Live <code>queue_update</code> stream</li>
    </ul>
</body>
</html>"#
    )))
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Clinics and display (public)
// ---------------------------------------------------------------------------

/// List every clinic with its display color.
pub async fn list_clinics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let clinics = state.engine.clinics().await?;
    Ok(Json(serde_json::json!({
        "count": clinics.len(),
        "clinics": clinics,
    })))
}

/// The ticket being served and the next two waiting tickets.
///
/// The route is public, so only the board projection is returned: ticket
/// number, patient name, and clinic.
pub async fn display(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let view = state.engine.display_view().await?;
    Ok(Json(DisplayBoard::from(&view)))
}

// ---------------------------------------------------------------------------
// Tickets (staff)
// ---------------------------------------------------------------------------

/// Full waiting list in FIFO order, joined with clinic name and color.
pub async fn list_waiting(
    _staff: StaffAccess,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = state.engine.waiting_list().await?;
    Ok(Json(serde_json::json!({
        "count": queue.len(),
        "queue": queue,
    })))
}

/// Issue a ticket. Responds `201 Created` with the new ticket.
pub async fn create_ticket(
    _staff: StaffAccess,
    State(state): State<Arc<AppState>>,
    body: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let ticket = state.engine.enqueue(request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Fetch one ticket.
pub async fn get_ticket(
    _staff: StaffAccess,
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ticket_id(path)?;
    Ok(Json(state.engine.ticket(id).await?))
}

/// Move the oldest waiting ticket (optionally of one clinic) to serving.
pub async fn call_next(
    _staff: StaffAccess,
    State(state): State<Arc<AppState>>,
    query: Result<Query<CallQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let ticket = match params.clinic_id {
        Some(clinic) => state.engine.call_next_in(ClinicId::new(clinic)).await?,
        None => state.engine.call_next().await?,
    };
    Ok(Json(ticket))
}

/// Finish the ticket being served.
pub async fn finish_ticket(
    _staff: StaffAccess,
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ticket_id(path)?;
    Ok(Json(state.engine.finish(id).await?))
}

/// Mark a patient as absent.
pub async fn mark_absent(
    _staff: StaffAccess,
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ticket_id(path)?;
    Ok(Json(state.engine.mark_absent(id).await?))
}
