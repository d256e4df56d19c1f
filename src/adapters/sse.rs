//! SSE adapter (§4.3): parses the subscription query, registers a client,
//! and streams `text/event-stream` frames until the connection drops.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};

use crate::core::{ClientId, ClientKind, EventLoopHandle};
use crate::error::PlasmaError;
use crate::event::{validate_event_type, Payload, HEARTBEAT_TYPE};
use crate::state::AppState;

pub async fn sse_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query_key = &state.config.sse.sse_event_query;
    let requested = match parse_event_types(&params, query_key) {
        Ok(types) => types,
        Err(err) => return err.into_response(),
    };

    let mut subscriptions: HashSet<String> = requested.into_iter().collect();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if is_legacy_browser(user_agent) {
        subscriptions.insert(HEARTBEAT_TYPE.to_string());
    }

    let last_event_id = parse_last_event_id(&headers, &params);

    tracing::info!(
        target: crate::tracing_setup::ACCESS_LOG_TARGET,
        user_agent,
        types = ?subscriptions,
        "sse subscribe"
    );

    let Some((id, outbox)) = state.event_loop.join(ClientKind::Sse, subscriptions).await else {
        return PlasmaError::Internal("event loop unavailable".into()).into_response();
    };

    let retry_ms = state.config.sse.sse_retry;
    let guard = ClientGuard::new(state.event_loop.clone(), id);
    let stream = sse_stream(outbox, last_event_id, retry_ms, guard);

    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(30)))
        .into_response();

    let response_headers = response.headers_mut();
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(value) = HeaderValue::from_str(&state.config.http.origin) {
        response_headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    response
}

fn parse_event_types(params: &HashMap<String, String>, query_key: &str) -> Result<Vec<String>, PlasmaError> {
    let raw = params
        .get(query_key)
        .map(String::as_str)
        .unwrap_or("");
    let types: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if types.is_empty() {
        return Err(PlasmaError::InvalidEventType(format!(
            "missing or empty '{query_key}' query parameter"
        )));
    }
    for t in &types {
        if !validate_event_type(t) {
            return Err(PlasmaError::InvalidEventType(t.clone()));
        }
    }
    Ok(types)
}

/// `Last-Event-ID` is the real HTTP reconnection header; the spec's
/// `HTTP_LAST_EVENT_ID` is the CGI-style name the same header takes once it
/// reaches request-handling code in the original. Either it or a
/// `lastEventId` query parameter seeds the counter; unparseable falls back
/// to zero, never a hard error.
fn parse_last_event_id(headers: &HeaderMap, params: &HashMap<String, String>) -> u64 {
    headers
        .get("Last-Event-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| params.get("lastEventId").and_then(|v| v.parse::<u64>().ok()))
        .unwrap_or(0)
}

fn is_legacy_browser(user_agent: &str) -> bool {
    user_agent.contains("MSIE") || user_agent.contains("Trident/") || user_agent.contains("Edge/")
}

/// Drop-triggered cleanup: if the SSE response body future is ever dropped
/// without the loop observing a clean `Leave` first (client disconnect,
/// response cancellation), this still enqueues one.
struct ClientGuard {
    event_loop: EventLoopHandle,
    id: ClientId,
}

impl ClientGuard {
    fn new(event_loop: EventLoopHandle, id: ClientId) -> Self {
        ClientGuard { event_loop, id }
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.event_loop.leave_now(self.id);
    }
}

fn sse_stream(
    mut outbox: tokio::sync::mpsc::Receiver<Payload>,
    last_event_id: u64,
    retry_ms: u64,
    guard: ClientGuard,
) -> impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        let _guard = guard;
        let mut next_id = last_event_id;

        yield Ok(Event::default().retry(Duration::from_millis(retry_ms)));

        while let Some(payload) = outbox.recv().await {
            if payload.event_type() == HEARTBEAT_TYPE {
                yield Ok(Event::default().comment("heartbeat "));
            } else {
                let body = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
                yield Ok(Event::default().id(next_id.to_string()).data(body));
            }
            next_id += 1;
        }
    }
}
