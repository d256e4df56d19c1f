//! Protocol adapters: SSE for browsers, native bidirectional gRPC for
//! everything else (§4.3, §4.4).

pub mod sse;
pub mod streaming;
