//! The event model: hierarchical event types and the payloads that carry them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-empty, colon-delimited hierarchy, e.g. `program:1234:views`.
///
/// Stored as a plain `String` rather than a newtype wrapping a `Vec<&str>`:
/// the only operation callers need is the ordered prefix chain, computed
/// once per publish in [`prefixes`].
pub type EventType = String;

/// One unit of broadcast: a type tag plus opaque bytes.
///
/// Immutable after ingestion — adapters and the event loop only ever clone
/// or read a `Payload`, never mutate one in place.
///
/// `data` is kept as raw bytes rather than a `serde_json::Value` because the
/// native protocol treats it as an opaque UTF-8 string (§4.4), but on the
/// wire — both the Redis ingest format and the SSE frame body — `data` sits
/// embedded as a JSON value under `meta`, mirroring the original's
/// `json.RawMessage` field: an object/number/array round-trips as itself,
/// not as a base64 byte array. [`Payload`]'s `Serialize`/`Deserialize` below
/// are hand-written for exactly that reason.
#[derive(Debug, Clone)]
pub struct Payload {
    pub meta: PayloadMeta,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadMeta {
    #[serde(rename = "type")]
    pub event_type: EventType,
}

#[derive(Serialize, Deserialize)]
struct PayloadWire {
    meta: PayloadMeta,
    data: serde_json::Value,
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = serde_json::from_slice::<serde_json::Value>(&self.data).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&self.data).into_owned())
        });
        PayloadWire {
            meta: self.meta.clone(),
            data,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = PayloadWire::deserialize(deserializer)?;
        let data = match wire.data {
            serde_json::Value::String(s) => s.into_bytes(),
            other => other.to_string().into_bytes(),
        };
        Ok(Payload {
            meta: wire.meta,
            data,
        })
    }
}

/// Reserved type for the synthetic heartbeat tick (§3).
pub const HEARTBEAT_TYPE: &str = "heartbeat";

impl Payload {
    pub fn new(event_type: impl Into<EventType>, data: impl Into<Vec<u8>>) -> Self {
        Payload {
            meta: PayloadMeta {
                event_type: event_type.into(),
            },
            data: data.into(),
        }
    }

    pub fn heartbeat() -> Self {
        Payload::new(HEARTBEAT_TYPE, Vec::new())
    }

    pub fn event_type(&self) -> &str {
        &self.meta.event_type
    }
}

/// Validates that `event_type` is non-empty and has no empty segments
/// (`a::b`, leading/trailing `:`), per the data model's "non-empty string"
/// rule extended to cover the degenerate prefix cases the Go original
/// rejects implicitly by never producing them.
pub fn validate_event_type(event_type: &str) -> bool {
    !event_type.is_empty() && event_type.split(':').all(|segment| !segment.is_empty())
}

/// The ordered, shortest-to-longest prefix chain of a colon-delimited type.
///
/// `prefixes("a:b:c")` is `["a", "a:b", "a:b:c"]`. Used both to fan a publish
/// out across every matching subscription key and, at subscribe time, to
/// recognize which of a client's subscriptions match a given type.
pub fn prefixes(event_type: &str) -> Vec<EventType> {
    let mut out = Vec::new();
    let mut end = 0;
    for (i, ch) in event_type.char_indices() {
        if ch == ':' {
            out.push(event_type[..i].to_string());
        }
        end = i + ch.len_utf8();
    }
    let _ = end;
    out.push(event_type.to_string());
    out
}
