//! Upstream subscriber drivers (§4.6): each implements `Subscribe()` by
//! running until canceled, publishing everything it ingests onto the
//! [`PubSub`](crate::pubsub::PubSub) bus. Selection is a single enum in
//! configuration (`PLASMA_SUBSCRIBER_TYPE`).

pub mod api;
pub mod mock;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlasmaResult;
use crate::pubsub::PubSub;

/// A running upstream source. `run` drives the subscription loop until a
/// fatal error or cancellation; `is_alive` backs `GET /hc` without needing
/// to interrupt that loop.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn run(&self, bus: Arc<PubSub>) -> PlasmaResult<()>;

    /// Liveness as observed by the most recent connection attempt. Drivers
    /// with nothing to probe (api, mock) are always alive.
    fn is_alive(&self) -> bool {
        true
    }
}

pub type SharedDriver = Arc<dyn Driver>;
