//! Redis Pub/Sub driver (§4.6): subscribes to N channels with a receive
//! timeout, PINGs the connection on timeout, and retries transient errors
//! up to `maxRetry` before consulting `overMaxRetryBehavior`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{info, warn};

use crate::config::OverMaxRetryBehavior;
use crate::error::{PlasmaError, PlasmaResult};
use crate::event::Payload;
use crate::pubsub::PubSub;

use super::Driver;

pub struct RedisDriver {
    addr: String,
    password: String,
    db: i64,
    channels: Vec<String>,
    max_retry: u32,
    timeout: Duration,
    retry_interval: Duration,
    over_max_retry_behavior: OverMaxRetryBehavior,
    alive: AtomicBool,
}

impl RedisDriver {
    pub fn new(
        addr: String,
        password: String,
        db: i64,
        channels: Vec<String>,
        max_retry: u32,
        timeout: Duration,
        retry_interval: Duration,
        over_max_retry_behavior: OverMaxRetryBehavior,
    ) -> Self {
        RedisDriver {
            addr,
            password,
            db,
            channels,
            max_retry,
            timeout,
            retry_interval,
            over_max_retry_behavior,
            alive: AtomicBool::new(false),
        }
    }

    async fn ping(&self, client: &redis::Client) -> PlasmaResult<()> {
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_err)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    /// One connect-subscribe-receive cycle. Returns on any error; the
    /// caller owns retry/backoff policy.
    async fn subscribe_once(&self, bus: &Arc<PubSub>) -> PlasmaResult<()> {
        let client =
            redis::Client::open(connection_url(&self.addr, &self.password, self.db)).map_err(redis_err)?;
        let mut pubsub = client.get_async_pubsub().await.map_err(redis_err)?;
        for channel in &self.channels {
            pubsub.subscribe(channel).await.map_err(redis_err)?;
        }
        self.alive.store(true, Ordering::SeqCst);
        info!(channels = ?self.channels, "redis driver subscribed");

        let mut stream = pubsub.on_message();
        loop {
            match tokio::time::timeout(self.timeout, stream.next()).await {
                Ok(Some(msg)) => {
                    let raw: String = msg.get_payload().map_err(redis_err)?;
                    match serde_json::from_str::<Payload>(&raw) {
                        Ok(payload) => bus.publish(payload),
                        Err(e) => warn!(error = %e, "dropping malformed redis payload"),
                    }
                }
                Ok(None) => {
                    self.alive.store(false, Ordering::SeqCst);
                    return Err(PlasmaError::Internal("redis pubsub stream closed".into()));
                }
                Err(_elapsed) => {
                    if let Err(e) = self.ping(&client).await {
                        self.alive.store(false, Ordering::SeqCst);
                        return Err(e);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Driver for RedisDriver {
    async fn run(&self, bus: Arc<PubSub>) -> PlasmaResult<()> {
        let mut retries = 0u32;
        loop {
            if let Err(e) = self.subscribe_once(&bus).await {
                warn!(error = %e, retries, "redis driver connection lost");
                retries += 1;
                if retries > self.max_retry {
                    match self.over_max_retry_behavior {
                        OverMaxRetryBehavior::Alive => {
                            retries = 0;
                        }
                        OverMaxRetryBehavior::Die => {
                            return Err(PlasmaError::UpstreamExhausted(e.to_string()));
                        }
                    }
                }
                tokio::time::sleep(self.retry_interval).await;
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

fn redis_err(err: redis::RedisError) -> PlasmaError {
    PlasmaError::Internal(format!("redis: {err}"))
}

pub(crate) fn connection_url(addr: &str, password: &str, db: i64) -> String {
    if password.is_empty() {
        format!("redis://{addr}/{db}")
    } else {
        format!("redis://:{password}@{addr}/{db}")
    }
}

/// One-off `PUBLISH`, independent of the long-lived [`RedisDriver`] connection.
/// Grounded in `original_source/server/sse.go`'s `debug` handler, which opens
/// its own `redis.NewClient` and calls `client.Publish` rather than reusing
/// the subscriber's connection — the debug endpoint is meant to exercise the
/// exact channel a real publisher would write to, not the gateway's own
/// subscribe-side connection.
pub async fn publish_oneshot(
    addr: &str,
    password: &str,
    db: i64,
    channel: &str,
    message: &str,
) -> PlasmaResult<()> {
    let client = redis::Client::open(connection_url(addr, password, db)).map_err(redis_err)?;
    let mut conn = client.get_multiplexed_async_connection().await.map_err(redis_err)?;
    let _: i64 = redis::cmd("PUBLISH")
        .arg(channel)
        .arg(message)
        .query_async(&mut conn)
        .await
        .map_err(redis_err)?;
    Ok(())
}
