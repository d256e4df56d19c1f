//! API driver (§4.6): the upstream is an HTTP POST ingress rather than a
//! background subscription. `run` just idles for the process lifetime —
//! the actual ingestion happens in [`ingest`], an axum handler
//! [`crate::router::build`] mounts at `POST /publish` whenever
//! `PLASMA_SUBSCRIBER_TYPE=api`, publishing straight onto the same bus this
//! driver was constructed with (`original_source/subscriber/api.go`'s
//! `handler` does the equivalent over its own dedicated `:8090` listener;
//! this gateway multiplexes it onto the main listener instead, per §4.8).

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use crate::error::{PlasmaError, PlasmaResult};
use crate::event::{validate_event_type, Payload};
use crate::pubsub::PubSub;
use crate::state::AppState;

use super::Driver;

pub struct ApiDriver;

#[async_trait]
impl Driver for ApiDriver {
    async fn run(&self, _bus: Arc<PubSub>) -> PlasmaResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        true
    }
}

/// One JSON [`Payload`] per request, republished onto the bus unchanged.
/// A malformed event type is rejected with `400`; this is the API driver's
/// own ingress, distinct from the always-`PLASMA_DEBUG`-gated `/debug` path
/// in [`crate::health`].
pub async fn ingest(State(state): State<AppState>, Json(payload): Json<Payload>) -> impl IntoResponse {
    if !validate_event_type(payload.event_type()) {
        warn!(event_type = payload.event_type(), "api ingest: invalid event type");
        return PlasmaError::InvalidEventType(payload.event_type().to_string()).into_response();
    }
    state.bus.publish(payload);
    StatusCode::ACCEPTED.into_response()
}
