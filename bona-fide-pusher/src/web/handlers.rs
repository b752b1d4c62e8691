//! Event notification handlers.
//!
//! The relay handler only does three things:
//! 1. Validate the REMS payload
//! 2. Push approved applicants to Elixir
//! 3. Map the outcome to a status code for REMS

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hyper::ext::ReasonPhrase;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::elixir::{ElixirClient, ForwardError, ForwardResult};
use crate::event::{
    parse_payload, EventId, EventKind, InboundEvent, ValidationError, APPROVED_EVENT,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub elixir: Arc<ElixirClient>,
}

impl AppState {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            elixir: Arc::new(ElixirClient::new(client, config)),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// REMS Event Notification
// =============================================================================

/// Relay response body. REMS only looks at the status code.
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    pub status: &'static str,
    pub message: String,
}

fn respond(code: StatusCode, status: &'static str, message: impl Into<String>) -> Response {
    (
        code,
        Json(RelayResponse {
            status,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Pass Elixir's status and reason phrase through to REMS.
fn relay_failure(result: ForwardResult) -> Response {
    let mut response = respond(result.status, "elixir_error", result.reason.clone());
    match ReasonPhrase::try_from(result.reason) {
        Ok(reason) => {
            response.extensions_mut().insert(reason);
        }
        Err(e) => warn!(error = ?e, "elixir_reason_phrase_invalid"),
    }
    response
}

/// Parse and validate a body, keeping whatever event id could be read.
fn validate(body: &[u8]) -> Result<InboundEvent, (EventId, ValidationError)> {
    let payload = parse_payload(body).map_err(|e| (EventId::unknown(), e))?;
    InboundEvent::from_value(&payload).map_err(|e| (EventId::from_payload(&payload), e))
}

/// REMS event notification endpoint.
///
/// Approved events are pushed to Elixir once. Other event types and invalid
/// payloads get 400 without contacting Elixir.
///
/// An Elixir transport failure is returned as the error, which the server
/// turns into an aborted connection. It is not retried.
pub async fn event_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ForwardError> {
    debug!(headers = ?headers, "event_notification_request");

    if !headers.contains_key(CONTENT_LENGTH) {
        warn!(event_id = %EventId::unknown(), "event_notification_length_required");
        return Ok(respond(
            StatusCode::LENGTH_REQUIRED,
            "length_required",
            "content-length header is required",
        ));
    }

    let event = match validate(&body) {
        Ok(event) => event,
        Err((event_id, e)) => {
            let message = format!("event/id:{} invalid payload: {}", event_id, e);
            error!(
                event_id = %event_id,
                error = %e,
                payload = %String::from_utf8_lossy(&body),
                "event_notification_invalid"
            );
            return Ok(respond(StatusCode::BAD_REQUEST, "invalid", message));
        }
    };

    let event_id = event.id;
    let applicant = match event.kind {
        EventKind::Approved { applicant } => applicant,
        EventKind::Other(event_type) => {
            info!(
                event_id = %event_id,
                event_type = %event_type,
                "event_notification_illegal_type"
            );
            return Ok(respond(
                StatusCode::BAD_REQUEST,
                "illegal_event_type",
                format!("illegal event type: {}", event_type),
            ));
        }
    };

    info!(
        event_id = %event_id,
        event_type = APPROVED_EVENT,
        user_id = %applicant,
        "bona_fide_push_starting"
    );

    let result = match state.elixir.forward(&applicant).await {
        Ok(result) => result,
        Err(e) => {
            error!(
                event_id = %event_id,
                user_id = %applicant,
                error = %e,
                "bona_fide_push_failed"
            );
            return Err(e);
        }
    };

    if result.is_success() {
        info!(event_id = %event_id, user_id = %applicant, "bona_fide_push_complete");
        return Ok(respond(StatusCode::OK, "pushed", "OK"));
    }

    warn!(
        event_id = %event_id,
        user_id = %applicant,
        status_code = result.status.as_u16(),
        reason = %result.reason,
        "bona_fide_push_rejected"
    );
    Ok(relay_failure(result))
}
