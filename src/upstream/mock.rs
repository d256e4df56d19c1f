//! Mock driver: emits one of three fixed payloads on a configurable tick.
//! The default `PLASMA_SUBSCRIBER_TYPE` — no external dependency needed to
//! see the gateway fan out events end to end.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::error::PlasmaResult;
use crate::event::Payload;
use crate::pubsub::PubSub;

use super::Driver;

pub struct MockDriver {
    interval: Duration,
}

impl MockDriver {
    pub fn new(interval: Duration) -> Self {
        MockDriver { interval }
    }

    fn samples() -> [Payload; 3] {
        [
            Payload::new(
                "program:1234:poll",
                br#"{"poll":{"1":"One","2":"Two","3":"Three"}}"#.to_vec(),
            ),
            Payload::new("program:1234:views", br#"{"views":55301}"#.to_vec()),
            Payload::new(
                "program:1234:annotation",
                br#"{"text":"hello world"}"#.to_vec(),
            ),
        ]
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn run(&self, bus: Arc<PubSub>) -> PlasmaResult<()> {
        let samples = Self::samples();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut i = 0usize;
        loop {
            ticker.tick().await;
            let payload = samples[i % samples.len()].clone();
            trace!(event_type = payload.event_type(), "mock driver publishing");
            bus.publish(payload);
            i += 1;
        }
    }
}
