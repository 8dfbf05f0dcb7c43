use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use crate::core::types::conversion::value_to_i64;
use crate::exchanges::huobi::types::HuobiSubRequest;
use serde_json::Value;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_tungstenite::tungstenite::Message;

/// Market feed frames after decompression
#[derive(Debug, Clone, PartialEq)]
pub enum HuobiMessage {
    /// Server heartbeat; must be answered with the same value
    Ping(Value),
    /// Answer to one of our heartbeats
    Pong(Value),
    /// Subscription acknowledgement
    SubscriptionAck {
        id: Option<String>,
        status: Option<String>,
        subbed: Option<String>,
    },
    /// Market data push
    Data {
        channel: String,
        ts: u64,
        tick: Value,
    },
}

/// Codec for the gzip-compressed market feed
#[derive(Debug, Default)]
pub struct HuobiCodec {
    next_id: AtomicU64,
}

impl HuobiCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Classify a decoded frame
    pub fn parse_frame(value: Value) -> Result<HuobiMessage, ExchangeError> {
        let mut frame = match value {
            Value::Object(frame) => frame,
            other => {
                return Err(ExchangeError::DeserializationError(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        if let Some(ping) = frame.remove("ping").filter(|v| !v.is_null()) {
            return Ok(HuobiMessage::Ping(ping));
        }
        if let Some(pong) = frame.remove("pong").filter(|v| !v.is_null()) {
            return Ok(HuobiMessage::Pong(pong));
        }

        let channel = frame.remove("ch");
        if channel.is_none() && frame.contains_key("id") {
            let text = |v: Option<Value>| match v {
                Some(Value::String(s)) => Some(s),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            };
            return Ok(HuobiMessage::SubscriptionAck {
                id: text(frame.remove("id")),
                status: text(frame.remove("status")),
                subbed: text(frame.remove("subbed")),
            });
        }

        let channel = match channel {
            Some(Value::String(ch)) => ch,
            _ => {
                return Err(ExchangeError::DeserializationError(format!(
                    "frame without channel: {}",
                    Value::Object(frame)
                )))
            }
        };
        let tick = frame.remove("tick").ok_or_else(|| {
            ExchangeError::DeserializationError(format!("frame on {} without tick", channel))
        })?;
        let ts = frame
            .get("ts")
            .and_then(|v| value_to_i64(v).ok())
            .and_then(|ts| u64::try_from(ts).ok())
            .unwrap_or_default();

        Ok(HuobiMessage::Data { channel, ts, tick })
    }
}

/// Inflate a gzip payload
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, ExchangeError> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| ExchangeError::DeserializationError(format!("gzip: {}", e)))?;
    Ok(inflated)
}

impl WsCodec for HuobiCodec {
    type Message = HuobiMessage;

    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError> {
        streams
            .iter()
            .map(|stream| {
                let request = HuobiSubRequest {
                    id: self.next_request_id(),
                    sub: stream.as_ref(),
                };
                serde_json::to_string(&request)
                    .map(Message::Text)
                    .map_err(|e| ExchangeError::SerializationError(e.to_string()))
            })
            .collect()
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        let value: Value = match message {
            Message::Binary(data) => serde_json::from_slice(&gunzip(&data)?)?,
            Message::Text(text) => serde_json::from_str(&text)?,
            _ => return Ok(None),
        };

        Self::parse_frame(value).map(Some)
    }
}
