//! Native streaming adapter (§4.4): bidirectional gRPC where every inbound
//! `Request` *replaces* the client's subscription set.

use std::collections::HashSet;
use std::pin::Pin;

use futures_util::Stream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{info, warn};

use crate::core::ClientKind;
use crate::proto::stream_service_server::StreamService;
use crate::proto::{EventType as ProtoEventType, Payload as ProtoPayload, Request as ProtoRequest};
use crate::state::AppState;

pub struct StreamingAdapter {
    state: AppState,
}

impl StreamingAdapter {
    pub fn new(state: AppState) -> Self {
        StreamingAdapter { state }
    }
}

#[tonic::async_trait]
impl StreamService for StreamingAdapter {
    type EventsStream = Pin<Box<dyn Stream<Item = Result<ProtoPayload, Status>> + Send + 'static>>;

    async fn events(
        &self,
        request: Request<Streaming<ProtoRequest>>,
    ) -> Result<Response<Self::EventsStream>, Status> {
        let mut inbound = request.into_inner();
        let event_loop = self.state.event_loop.clone();

        let Some((id, mut outbox)) = event_loop.join(ClientKind::Native, HashSet::new()).await else {
            return Err(Status::unavailable("event loop unavailable"));
        };

        let reader_loop = event_loop.clone();
        tokio::spawn(async move {
            loop {
                match inbound.message().await {
                    Ok(Some(request)) => {
                        if request.force_close {
                            break;
                        }
                        let types: HashSet<String> = request
                            .events
                            .into_iter()
                            .map(|event_type| event_type.r#type)
                            .collect();
                        info!(
                            target: crate::tracing_setup::ACCESS_LOG_TARGET,
                            client = %id,
                            types = ?types,
                            "native client replaced subscriptions"
                        );
                        reader_loop.replace(id, types).await;
                    }
                    Ok(None) => break,
                    Err(status) => {
                        if status.code() != tonic::Code::Cancelled {
                            warn!(client = %id, error = %status, "native stream receive error");
                        }
                        break;
                    }
                }
            }
            reader_loop.leave(id).await;
        });

        let output = async_stream::stream! {
            while let Some(payload) = outbox.recv().await {
                let data = String::from_utf8_lossy(&payload.data).to_string();
                yield Ok(ProtoPayload {
                    event_type: Some(ProtoEventType { r#type: payload.event_type().to_string() }),
                    data,
                });
            }
        };

        Ok(Response::new(Box::pin(output)))
    }
}
