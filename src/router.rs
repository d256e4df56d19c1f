//! Assembles one `axum::Router` serving SSE, health/debug, and the native
//! gRPC service on a single listener (§4.8) — merging the `tonic` service
//! straight into the router works because both are `tower::Service`
//! implementations over the same HTTP/2-capable body type.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::adapters::sse::sse_handler;
use crate::adapters::streaming::StreamingAdapter;
use crate::config::SubscriberType;
use crate::health::{debug_publish, health_check, metrics};
use crate::proto::stream_service_server::StreamServiceServer;
use crate::state::AppState;
use crate::upstream::api::ingest as api_ingest;

pub fn build(state: AppState) -> Router {
    let streaming_service = StreamServiceServer::new(StreamingAdapter::new(state.clone()));

    let mut http_routes = Router::new()
        .route("/events", get(sse_handler))
        .route("/hc", get(health_check))
        .route("/metrics", get(metrics));

    if state.config.debug {
        http_routes = http_routes.route("/debug", post(debug_publish));
    }

    if state.config.subscriber.subscriber_type == SubscriberType::Api {
        http_routes = http_routes.route("/publish", post(api_ingest));
    }

    http_routes
        .with_state(state)
        .route_service("/plasma.StreamService/Events", streaming_service)
        .layer(TraceLayer::new_for_http())
}
