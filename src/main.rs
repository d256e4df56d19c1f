use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info};

use plasma::config::{CliArgs, SubscriberType};
use plasma::core::EventLoop;
use plasma::error::PlasmaError;
use plasma::metrics::Metrics;
use plasma::pubsub::PubSub;
use plasma::state::AppState;
use plasma::upstream::{api::ApiDriver, mock::MockDriver, redis::RedisDriver, SharedDriver};
use plasma::{router, tls, tracing_setup};

/// Fixed per §4.1 — "Fixed interval (default 10 s)" is not one of the
/// configuration table's knobs.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.markdown_help {
        clap_markdown::print_help_markdown::<CliArgs>();
        return Ok(());
    }

    if let Err(e) = tracing_setup::init(&args.logging) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: CliArgs) -> Result<(), PlasmaError> {
    let metrics = Metrics::new();
    let (event_loop, event_loop_handle) = EventLoop::new(metrics.clone());
    let bus = Arc::new(PubSub::new());

    // The bus's one registered handler (§4.5): forward everything published
    // straight into the event loop's command intake.
    let forwarding_handle = event_loop_handle.clone();
    bus.subscribe(move |payload| forwarding_handle.publish_now(payload));

    let driver = build_driver(&args)?;

    let state = AppState {
        event_loop: event_loop_handle.clone(),
        bus: bus.clone(),
        metrics,
        driver: driver.clone(),
        config: Arc::new(args.clone()),
    };

    let app = router::build(state);

    let listener = make_listener(args.http.port)?;
    info!(port = args.http.port, "listening");

    let event_loop_task = tokio::spawn(event_loop.run());
    let heartbeat_task = tokio::spawn(heartbeat_ticker(event_loop_handle.clone()));
    let driver_task = tokio::spawn({
        let driver = driver.clone();
        let bus = bus.clone();
        async move { driver.run(bus).await }
    });

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received, draining connections");
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    let serve_result = if args.tls.enabled() {
        let rustls_config = tls::build_rustls_config(&args.tls)?;
        axum_server::from_tcp_rustls(listener, rustls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
    } else {
        axum_server::from_tcp(listener)
            .handle(handle)
            .serve(app.into_make_service())
            .await
    };
    serve_result.map_err(PlasmaError::from)?;

    event_loop_handle.shutdown().await;
    heartbeat_task.abort();
    driver_task.abort();
    let _ = event_loop_task.await;

    Ok(())
}

fn build_driver(args: &CliArgs) -> Result<SharedDriver, PlasmaError> {
    let driver: SharedDriver = match args.subscriber.subscriber_type {
        SubscriberType::Mock => Arc::new(MockDriver::new(args.subscriber.subscriber_mock_interval)),
        SubscriberType::Api => Arc::new(ApiDriver),
        SubscriberType::Redis => {
            let over_max_retry_behavior = args
                .subscriber
                .subscriber_redis_over_max_retry_behavior
                .ok_or_else(|| {
                    PlasmaError::Config(
                        "PLASMA_SUBSCRIBER_REDIS_OVER_MAX_RETRY_BEHAVIOR is required when PLASMA_SUBSCRIBER_TYPE=redis"
                            .into(),
                    )
                })?;
            Arc::new(RedisDriver::new(
                args.subscriber.subscriber_redis_addr.clone(),
                args.subscriber.subscriber_redis_password.clone(),
                args.subscriber.subscriber_redis_db,
                args.subscriber.subscriber_redis_channels.clone(),
                args.subscriber.subscriber_redis_max_retry,
                args.subscriber.subscriber_redis_timeout,
                args.subscriber.subscriber_redis_retry_interval,
                over_max_retry_behavior,
            ))
        }
    };
    Ok(driver)
}

async fn heartbeat_ticker(event_loop: plasma::core::EventLoopHandle) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        event_loop.publish(plasma::event::Payload::heartbeat()).await;
    }
}

fn make_listener(port: u16) -> Result<StdTcpListener, PlasmaError> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    Ok(socket.into())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = unix_signal(SignalKind::terminate()).expect("failed to bind SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => { info!("received SIGINT"); }
            _ = sigterm.recv() => { info!("received SIGTERM"); }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C");
    }
}
