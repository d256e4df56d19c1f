//! The application state threaded through every axum handler, grounded on
//! the teacher's `AppState`/`builder.rs` composition — one `Clone`-able
//! struct of `Arc`s rather than a grab-bag of extractors.

use std::sync::Arc;

use crate::config::CliArgs;
use crate::core::EventLoopHandle;
use crate::metrics::Metrics;
use crate::pubsub::PubSub;
use crate::upstream::SharedDriver;

#[derive(Clone)]
pub struct AppState {
    pub event_loop: EventLoopHandle,
    pub bus: Arc<PubSub>,
    pub metrics: Metrics,
    pub driver: SharedDriver,
    pub config: Arc<CliArgs>,
}
