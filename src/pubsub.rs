//! Process-local PubSub bus (§4.5): a thin facade so upstream drivers never
//! touch the event loop directly. `Subscribe` registers a handler; `Publish`
//! invokes every registered handler synchronously, and each handler's only
//! job is to enqueue onto the event loop.
//!
//! Handler signature is a plain `Fn(Payload)`, so "incompatible signature"
//! is a compile-time question here rather than a runtime one — the typing
//! the spec asks `Subscribe` to verify is enforced by the Rust type system
//! instead of a runtime check.

use std::sync::Mutex;

use crate::event::Payload;

type Handler = Box<dyn Fn(Payload) + Send + Sync>;

#[derive(Default)]
pub struct PubSub {
    handlers: Mutex<Vec<Handler>>,
}

impl PubSub {
    pub fn new() -> Self {
        PubSub::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(Payload) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .expect("pubsub handler list mutex is never held across a panic")
            .push(Box::new(handler));
    }

    pub fn publish(&self, payload: Payload) {
        let handlers = self
            .handlers
            .lock()
            .expect("pubsub handler list mutex is never held across a panic");
        for handler in handlers.iter() {
            handler(payload.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn publish_invokes_every_registered_handler() {
        let bus = PubSub::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = count.clone();
        bus.subscribe(move |_payload| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = count.clone();
        bus.subscribe(move |_payload| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Payload::new("a", "x"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
