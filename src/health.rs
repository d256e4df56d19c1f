//! `/hc`, `/metrics`, and the debug test-only publish endpoint (§4.7).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use crate::config::SubscriberType;
use crate::error::PlasmaError;
use crate::event::{validate_event_type, Payload};
use crate::state::AppState;
use crate::upstream::redis::publish_oneshot;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.driver.is_alive() {
        (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"status": "not ready"})),
        )
            .into_response()
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts a JSON payload and republishes it for local testing (§4.7),
/// gated by `PLASMA_DEBUG` in `router::build`. Decodes the same nested
/// `Payload` wire shape `/publish` does — both endpoints' originals
/// (`server/sse.go`'s `debug` handler and `subscriber/api.go`'s `handler`)
/// decode into the same `event.Payload` struct, so there's no reason for
/// the two endpoints to disagree on shape here.
///
/// When the configured upstream is Redis, this republishes onto the first
/// configured channel via a one-off `PUBLISH`, mirroring the Go `debug`
/// handler's own dedicated `redis.NewClient` rather than reusing the
/// gateway's subscribe-side connection; for every other subscriber type it
/// publishes straight onto the in-process bus, same as `/publish`.
pub async fn debug_publish(State(state): State<AppState>, Json(payload): Json<Payload>) -> impl IntoResponse {
    if !validate_event_type(payload.event_type()) {
        return PlasmaError::InvalidEventType(payload.event_type().to_string()).into_response();
    }

    if state.config.subscriber.subscriber_type == SubscriberType::Redis {
        let Some(channel) = state.config.subscriber.subscriber_redis_channels.first() else {
            return PlasmaError::Config(
                "PLASMA_SUBSCRIBER_REDIS_CHANNELS must name at least one channel to debug-publish onto".into(),
            )
            .into_response();
        };
        let message = match serde_json::to_string(&payload) {
            Ok(message) => message,
            Err(e) => return PlasmaError::Internal(format!("encoding debug payload: {e}")).into_response(),
        };
        if let Err(e) = publish_oneshot(
            &state.config.subscriber.subscriber_redis_addr,
            &state.config.subscriber.subscriber_redis_password,
            state.config.subscriber.subscriber_redis_db,
            channel,
            &message,
        )
        .await
        {
            warn!(error = %e, channel = %channel, "debug publish: redis PUBLISH failed");
            return e.into_response();
        }
    } else {
        state.bus.publish(payload);
    }

    StatusCode::ACCEPTED.into_response()
}
