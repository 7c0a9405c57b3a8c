//! Slack-facing HTTP routes.
//!
//! Slack retries any delivery not acknowledged within three seconds, so both
//! routes answer 200 as soon as the body is authenticated and parsed and run
//! the relay in a spawned task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use brainrelay_slack::events::{EventContext, EventDispatcher, SlackEnvelope};
use brainrelay_slack::payload::{parse_events_body, parse_interaction_body, InboundRequest};
use brainrelay_slack::signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub const EVENTS_PATH: &str = "/slack/events";
pub const INTERACTIONS_PATH: &str = "/slack/interactions";

const DRAIN_POLL: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct WebhookState {
    dispatcher: Arc<EventDispatcher>,
    verifier: Option<Arc<SignatureVerifier>>,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when a dispatch task ends, panics included.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WebhookState {
    pub fn new(dispatcher: Arc<EventDispatcher>, verifier: Option<SignatureVerifier>) -> Self {
        Self {
            dispatcher,
            verifier: verifier.map(Arc::new),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits up to `grace` for spawned dispatches to finish; returns how many are still running.
    pub async fn drain(&self, grace: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + grace;
        while self.in_flight() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(DRAIN_POLL).await;
        }
        self.in_flight()
    }

    fn authenticate(&self, route: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
        let Some(verifier) = &self.verifier else {
            return Ok(());
        };

        let timestamp = header_value(headers, TIMESTAMP_HEADER);
        let signature = header_value(headers, SIGNATURE_HEADER);
        verifier
            .verify(timestamp, signature, body, Utc::now().timestamp())
            .map_err(|error| {
                warn!(
                    event_name = "slack.webhook.rejected",
                    route,
                    error = %error,
                    "rejected request with invalid slack signature"
                );
                StatusCode::UNAUTHORIZED.into_response()
            })
    }

    fn spawn_dispatch(&self, envelope: SlackEnvelope) {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        tokio::spawn(async move {
            let _guard = guard;
            let ctx = EventContext { correlation_id: envelope.envelope_id.clone() };
            // Failures are already logged and answered in-thread by the relay.
            let _ = dispatcher.dispatch(&envelope, &ctx).await;
        });
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(EVENTS_PATH, post(handle_events))
        .route(INTERACTIONS_PATH, post(handle_interactions))
        .with_state(state)
}

async fn handle_events(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = state.authenticate(EVENTS_PATH, &headers, &body) {
        return rejection;
    }

    match parse_events_body(&body) {
        Ok(InboundRequest::UrlVerification { challenge }) => {
            info!(event_name = "slack.webhook.url_verification", "answered url verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(InboundRequest::Event(envelope)) => {
            info!(
                event_name = "slack.webhook.accepted",
                correlation_id = %envelope.envelope_id,
                event_type = envelope.event.event_type().as_str(),
                "accepted events api delivery"
            );
            state.spawn_dispatch(envelope);
            StatusCode::OK.into_response()
        }
        Err(error) => {
            warn!(
                event_name = "slack.webhook.malformed",
                route = EVENTS_PATH,
                error = %error,
                "could not parse events api body"
            );
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn handle_interactions(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = state.authenticate(INTERACTIONS_PATH, &headers, &body) {
        return rejection;
    }

    match parse_interaction_body(&body) {
        Ok(envelope) => {
            info!(
                event_name = "slack.webhook.accepted",
                correlation_id = %envelope.envelope_id,
                event_type = envelope.event.event_type().as_str(),
                "accepted interaction"
            );
            state.spawn_dispatch(envelope);
            StatusCode::OK.into_response()
        }
        Err(error) => {
            warn!(
                event_name = "slack.webhook.malformed",
                route = INTERACTIONS_PATH,
                error = %error,
                "could not parse interaction body"
            );
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}
