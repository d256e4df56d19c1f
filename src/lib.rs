//! Plasma: a push-notification fan-out gateway. See module docs for the
//! fan-out core (`core`), the protocol adapters (`adapters`), and the
//! upstream drivers (`upstream`).

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod health;
pub mod metrics;
pub mod pubsub;
pub mod router;
pub mod state;
pub mod tls;
pub mod tracing_setup;
pub mod upstream;

pub mod proto {
    tonic::include_proto!("plasma");
}
