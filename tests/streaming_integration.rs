//! Native streaming adapter tests over an in-process `tonic` channel
//! (`tokio::io::duplex`, no real socket), covering scenario 5 of §8.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::duplex;
use tonic::transport::{Endpoint, Server, Uri};
use tower::service_fn;

use plasma::adapters::streaming::StreamingAdapter;
use plasma::config::CliArgs;
use plasma::core::EventLoop;
use plasma::metrics::Metrics;
use plasma::proto::stream_service_client::StreamServiceClient;
use plasma::proto::stream_service_server::StreamServiceServer;
use plasma::proto::{EventType, Request as ProtoRequest};
use plasma::pubsub::PubSub;
use plasma::state::AppState;
use plasma::upstream::mock::MockDriver;
use plasma::upstream::SharedDriver;

async fn connected_client(state: AppState) -> StreamServiceClient<tonic::transport::Channel> {
    let (client_io, server_io) = duplex(4096);

    let service = StreamServiceServer::new(StreamingAdapter::new(state));
    tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming(futures_util::stream::once(async move { Ok::<_, std::io::Error>(server_io) }))
            .await
            .expect("in-memory tonic server exited");
    });

    let mut client_io = Some(client_io);
    let channel = Endpoint::try_from("http://in-memory")
        .unwrap()
        .connect_with_connector(service_fn(move |_: Uri| {
            let io = client_io.take().expect("duplex client half used only once");
            async move { Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(io)) }
        }))
        .await
        .expect("failed to connect to in-memory tonic server");

    StreamServiceClient::new(channel)
}

fn test_state() -> AppState {
    let metrics = Metrics::new();
    let (event_loop, handle) = EventLoop::new(metrics.clone());
    tokio::spawn(event_loop.run());

    let bus = Arc::new(PubSub::new());
    let forwarding = handle.clone();
    bus.subscribe(move |payload| forwarding.publish_now(payload));

    let driver: SharedDriver = Arc::new(MockDriver::new(Duration::from_secs(3600)));
    let args = CliArgs::parse_from(["plasma"]);

    AppState {
        event_loop: handle,
        bus,
        metrics,
        driver,
        config: Arc::new(args),
    }
}

#[tokio::test]
async fn empty_request_receives_nothing_then_subscribe_receives_matches() {
    let state = test_state();
    let bus = state.bus.clone();
    let mut client = connected_client(state).await;

    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::channel::<ProtoRequest>(8);
    let response = client
        .events(tokio_stream::wrappers::ReceiverStream::new(outbound_rx))
        .await
        .expect("Events RPC call failed");
    let mut inbound = response.into_inner();

    // 1. Empty subscription set: publishing now must not reach this client.
    outbound_tx
        .send(ProtoRequest {
            events: vec![],
            force_close: false,
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.publish(plasma::event::Payload::new("program:1234:poll", "{}"));
    let nothing_yet = tokio::time::timeout(Duration::from_millis(100), inbound.message()).await;
    assert!(nothing_yet.is_err(), "expected no payload before subscribing");

    // 2. Subscribe to program:1234:poll, then a matching publish arrives.
    outbound_tx
        .send(ProtoRequest {
            events: vec![EventType {
                r#type: "program:1234:poll".to_string(),
            }],
            force_close: false,
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.publish(plasma::event::Payload::new(
        "program:1234:poll",
        r#"{"poll":{"1":"One"}}"#,
    ));
    let received = tokio::time::timeout(Duration::from_secs(1), inbound.message())
        .await
        .expect("timed out waiting for payload")
        .expect("RPC error")
        .expect("stream ended early");
    assert_eq!(received.event_type.unwrap().r#type, "program:1234:poll");

    // 3. Re-subscribing to an empty set unsubscribes again.
    outbound_tx
        .send(ProtoRequest {
            events: vec![],
            force_close: false,
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.publish(plasma::event::Payload::new("program:1234:poll", "{}"));
    let nothing_again = tokio::time::timeout(Duration::from_millis(100), inbound.message()).await;
    assert!(nothing_again.is_err(), "expected no payload after unsubscribing");
}

#[tokio::test]
async fn force_close_ends_the_stream_cleanly() {
    let state = test_state();
    let mut client = connected_client(state).await;

    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::channel::<ProtoRequest>(8);
    let response = client
        .events(tokio_stream::wrappers::ReceiverStream::new(outbound_rx))
        .await
        .expect("Events RPC call failed");
    let mut inbound = response.into_inner();

    outbound_tx
        .send(ProtoRequest {
            events: vec![],
            force_close: true,
        })
        .await
        .unwrap();

    let ended = tokio::time::timeout(Duration::from_secs(1), inbound.message())
        .await
        .expect("timed out waiting for clean close")
        .expect("RPC error on close");
    assert!(ended.is_none(), "expected the stream to end after force_close");
}
