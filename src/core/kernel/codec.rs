use crate::core::errors::ExchangeError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for handling exchange-specific WebSocket message encoding/decoding
///
/// This trait defines the contract for converting between raw WebSocket messages
/// and exchange-specific typed messages.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this exchange
    type Message: Send + Sync;

    /// Encode a subscription request into a WebSocket message
    ///
    /// # Arguments
    /// * `streams` - The stream identifiers to subscribe to
    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError>;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// Control frames (ping, pong, close) are handled by the transport.
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
