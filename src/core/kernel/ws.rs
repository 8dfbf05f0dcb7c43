use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, instrument, warn};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Interval between client heartbeats in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Max reconnection attempts
    pub max_reconnect_attempts: u32,
    /// Initial reconnection delay in milliseconds, doubled per failed attempt
    pub reconnect_delay_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            heartbeat_interval_ms: 5_000,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1_000,
        }
    }
}

impl WsConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// WebSocket session trait - pure transport layer
#[async_trait]
pub trait WsSession<C: WsCodec>: Send + Sync {
    /// Connect to the WebSocket
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next raw message
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;

    /// Subscribe to streams using the codec
    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<(), ExchangeError>;

    /// Get the next decoded message
    ///
    /// Frames the codec cannot decode are logged and skipped; only transport
    /// failures surface as errors.
    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>>;
}

/// Tungstenite-based WebSocket implementation
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    write: Option<futures_util::stream::SplitSink<WsStream, Message>>,
    read: Option<futures_util::stream::SplitStream<WsStream>>,
    connected: bool,
    exchange_name: String,
    codec: C,
    config: WsConfig,
    connection_stats: ConnectionStats,
}

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connect_count: u32,
    pub decode_failures: u64,
}

impl<C: WsCodec> TungsteniteWs<C> {
    /// Create a new WebSocket session with the specified codec
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `exchange_name` - Name of the exchange for logging/tracing
    /// * `codec` - The codec to handle message encoding/decoding
    pub fn new(url: String, exchange_name: String, codec: C) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            exchange_name,
            codec,
            config: WsConfig::default(),
            connection_stats: ConnectionStats::default(),
        }
    }

    /// Set custom WebSocket configuration
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.connection_stats
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(exchange = %self.exchange_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let (ws_stream, _) = tokio::time::timeout(connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| {
                ExchangeError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| {
                ExchangeError::NetworkError(format!("WebSocket connection failed: {}", e))
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        self.connection_stats.connect_count += 1;

        Ok(())
    }

    #[instrument(skip(self, msg), fields(exchange = %self.exchange_name))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::NetworkError(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ExchangeError::NetworkError("WebSocket write stream not available".to_string())
        })?;

        if let Err(e) = write.send(msg).await {
            self.connected = false;
            return Err(ExchangeError::NetworkError(format!(
                "Failed to send WebSocket message: {}",
                e
            )));
        }

        self.connection_stats.messages_sent += 1;
        Ok(())
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            if !self.connected {
                return Some(Err(ExchangeError::NetworkError(
                    "WebSocket not connected".to_string(),
                )));
            }

            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(Message::Ping(data))) => {
                    // Protocol-level ping; exchange heartbeats arrive as data frames
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        warn!("Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(message)) => {
                    if matches!(message, Message::Close(_)) {
                        self.connected = false;
                    }
                    self.connection_stats.messages_received += 1;
                    return Some(Ok(message));
                }
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ExchangeError::NetworkError(format!(
                        "WebSocket error: {}",
                        e
                    ))));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    #[instrument(skip(self, streams), fields(exchange = %self.exchange_name, stream_count = streams.len()))]
    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<(), ExchangeError> {
        if streams.is_empty() {
            return Ok(());
        }

        for message in self.codec.encode_subscription(streams)? {
            self.send_raw(message).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>> {
        loop {
            match self.next_raw().await? {
                Ok(Message::Close(frame)) => {
                    debug!("Server closed the connection: {:?}", frame);
                    return None;
                }
                Ok(raw_msg) => match self.codec.decode_message(raw_msg) {
                    Ok(Some(decoded)) => return Some(Ok(decoded)),
                    Ok(None) => {}
                    Err(e) => {
                        self.connection_stats.decode_failures += 1;
                        warn!("Dropping undecodable frame: {}", e);
                    }
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Reconnection lifecycle notifications emitted by [`ReconnectWs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectEvent {
    Started,
    Succeeded,
    Failed,
}

pub type ReconnectListener = Arc<dyn Fn(ReconnectEvent) + Send + Sync>;

/// Wrapper that adds automatic reconnection capabilities
///
/// Every stream passed to `subscribe` is remembered and replayed after a
/// successful reconnect. A reconnect interrupted by dropping the calling
/// future is resumed by the next call: the replay and the `Succeeded`
/// event are only marked done once both have happened.
pub struct ReconnectWs<C: WsCodec, T: WsSession<C>> {
    inner: T,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
    auto_resubscribe: bool,
    subscribed_streams: Vec<String>,
    listener: Option<ReconnectListener>,
    recovering: bool,
    _codec: std::marker::PhantomData<C>,
}

impl<C: WsCodec, T: WsSession<C>> ReconnectWs<C, T> {
    /// Create a new reconnecting WebSocket wrapper
    ///
    /// # Arguments
    /// * `inner` - The underlying WebSocket session to wrap
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            auto_resubscribe: true,
            subscribed_streams: Vec::new(),
            listener: None,
            recovering: false,
            _codec: std::marker::PhantomData,
        }
    }

    /// Set the maximum number of reconnection attempts
    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Set the initial delay between reconnection attempts
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Enable or disable automatic resubscription after reconnection
    pub fn with_auto_resubscribe(mut self, auto_resubscribe: bool) -> Self {
        self.auto_resubscribe = auto_resubscribe;
        self
    }

    /// Observe reconnect attempts
    pub fn with_listener(mut self, listener: ReconnectListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn subscribed_streams(&self) -> &[String] {
        &self.subscribed_streams
    }

    fn notify(&self, event: ReconnectEvent) {
        if let Some(listener) = &self.listener {
            listener(event);
        }
    }

    fn remember(&mut self, streams: &[impl AsRef<str> + Send + Sync]) {
        for stream in streams {
            let stream = stream.as_ref();
            if !self.subscribed_streams.iter().any(|s| s == stream) {
                self.subscribed_streams.push(stream.to_string());
            }
        }
    }

    /// Reconnect if the transport dropped, or finish a reconnect whose
    /// replay was cut short
    async fn ensure_connected(&mut self) -> Result<(), ExchangeError> {
        if !self.inner.is_connected() {
            self.attempt_reconnect().await
        } else if self.recovering {
            self.finish_reconnect().await;
            Ok(())
        } else {
            Ok(())
        }
    }

    async fn finish_reconnect(&mut self) {
        if self.auto_resubscribe && !self.subscribed_streams.is_empty() {
            let streams = self.subscribed_streams.clone();
            if let Err(e) = self.inner.subscribe(streams.as_slice()).await {
                warn!("Failed to resubscribe after reconnection: {}", e);
            }
        }
        self.recovering = false;
        self.notify(ReconnectEvent::Succeeded);
    }

    async fn attempt_reconnect(&mut self) -> Result<(), ExchangeError> {
        self.recovering = true;
        self.notify(ReconnectEvent::Started);
        let mut attempts = 0;
        let mut delay = self.reconnect_delay;

        while attempts < self.max_reconnect_attempts {
            attempts += 1;

            match self.inner.connect().await {
                Ok(()) => {
                    self.finish_reconnect().await;
                    return Ok(());
                }
                Err(e) => {
                    error!("Reconnection attempt {} failed: {}", attempts, e);
                    if attempts < self.max_reconnect_attempts {
                        sleep(delay).await;
                        delay = std::cmp::min(delay * 2, Duration::from_secs(60));
                    }
                }
            }
        }

        self.notify(ReconnectEvent::Failed);
        Err(ExchangeError::NetworkError(format!(
            "Failed to reconnect after {} attempts",
            self.max_reconnect_attempts
        )))
    }
}

#[async_trait]
impl<C: WsCodec, T: WsSession<C>> WsSession<C> for ReconnectWs<C, T> {
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        self.inner.connect().await
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        self.ensure_connected().await?;
        self.inner.send_raw(msg).await
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            if let Err(e) = self.ensure_connected().await {
                return Some(Err(e));
            }

            match self.inner.next_raw().await {
                Some(Ok(msg)) => return Some(Ok(msg)),
                Some(Err(e)) => {
                    warn!("Connection lost: {}", e);
                    if let Err(reconnect_err) = self.attempt_reconnect().await {
                        return Some(Err(reconnect_err));
                    }
                }
                None => {
                    if let Err(reconnect_err) = self.attempt_reconnect().await {
                        return Some(Err(reconnect_err));
                    }
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        self.subscribed_streams.clear();
        self.recovering = false;
        self.inner.close().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<(), ExchangeError> {
        self.remember(streams);
        if !self.inner.is_connected() || self.recovering {
            // the replay inside the reconnect already covers these streams
            return self.ensure_connected().await;
        }
        self.inner.subscribe(streams).await
    }

    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>> {
        loop {
            if let Err(e) = self.ensure_connected().await {
                return Some(Err(e));
            }

            match self.inner.next_message().await {
                Some(Ok(msg)) => return Some(Ok(msg)),
                Some(Err(e)) => {
                    warn!("Connection lost: {}", e);
                    if let Err(reconnect_err) = self.attempt_reconnect().await {
                        return Some(Err(reconnect_err));
                    }
                }
                None => {
                    if let Err(reconnect_err) = self.attempt_reconnect().await {
                        return Some(Err(reconnect_err));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct TextCodec;

    impl WsCodec for TextCodec {
        type Message = String;

        fn encode_subscription(
            &self,
            streams: &[impl AsRef<str> + Send + Sync],
        ) -> Result<Vec<Message>, ExchangeError> {
            Ok(streams
                .iter()
                .map(|s| Message::Text(s.as_ref().to_string()))
                .collect())
        }

        fn decode_message(&self, message: Message) -> Result<Option<String>, ExchangeError> {
            match message {
                Message::Text(text) if text == "bad" => {
                    Err(ExchangeError::DeserializationError("bad".to_string()))
                }
                Message::Text(text) => Ok(Some(text)),
                _ => Ok(None),
            }
        }
    }

    /// In-memory transport replaying scripted frames
    #[derive(Default)]
    struct ScriptedWs {
        connected: bool,
        connects: Arc<AtomicUsize>,
        stall_subscribe: Arc<AtomicBool>,
        sent: Vec<String>,
        inbox: VecDeque<Message>,
    }

    #[async_trait]
    impl WsSession<TextCodec> for ScriptedWs {
        async fn connect(&mut self) -> Result<(), ExchangeError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.connected = true;
            Ok(())
        }

        async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
            if let Message::Text(text) = msg {
                self.sent.push(text);
            }
            Ok(())
        }

        async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
            self.inbox.pop_front().map(Ok)
        }

        async fn close(&mut self) -> Result<(), ExchangeError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn subscribe(
            &mut self,
            streams: &[impl AsRef<str> + Send + Sync],
        ) -> Result<(), ExchangeError> {
            if self.stall_subscribe.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            for msg in TextCodec.encode_subscription(streams)? {
                self.send_raw(msg).await?;
            }
            Ok(())
        }

        async fn next_message(&mut self) -> Option<Result<String, ExchangeError>> {
            loop {
                let raw = self.inbox.pop_front()?;
                match TextCodec.decode_message(raw) {
                    Ok(Some(text)) => return Some(Ok(text)),
                    Ok(None) | Err(_) => {}
                }
            }
        }
    }

    #[tokio::test]
    async fn test_subscribe_accumulates_streams() {
        let mut ws = ReconnectWs::new(ScriptedWs::default());
        ws.connect().await.unwrap();

        ws.subscribe(&["market.btcusdt.detail"]).await.unwrap();
        ws.subscribe(&["market.ethusdt.detail", "market.btcusdt.detail"])
            .await
            .unwrap();

        assert_eq!(
            ws.subscribed_streams(),
            &[
                "market.btcusdt.detail".to_string(),
                "market.ethusdt.detail".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_reconnect_replays_subscriptions() {
        let connects = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = events.clone();

        let inner = ScriptedWs {
            connects: connects.clone(),
            ..ScriptedWs::default()
        };
        let mut ws = ReconnectWs::new(inner)
            .with_reconnect_delay(Duration::from_millis(1))
            .with_listener(Arc::new(move |event: ReconnectEvent| {
                recorded.lock().unwrap().push(event);
            }));

        // not connected yet, so subscribing triggers a connect plus replay
        ws.subscribe(&["market.btcusdt.detail"]).await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(ws.inner.sent, vec!["market.btcusdt.detail".to_string()]);
        assert_eq!(
            *events.lock().unwrap(),
            vec![ReconnectEvent::Started, ReconnectEvent::Succeeded]
        );
    }

    #[tokio::test]
    async fn test_interrupted_reconnect_is_finished_by_next_call() {
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = events.clone();
        let stall = Arc::new(AtomicBool::new(false));

        let mut inner = ScriptedWs {
            stall_subscribe: stall.clone(),
            ..ScriptedWs::default()
        };
        inner.inbox.push_back(Message::Text("tick".to_string()));
        let mut ws = ReconnectWs::new(inner)
            .with_reconnect_delay(Duration::from_millis(1))
            .with_listener(Arc::new(move |event: ReconnectEvent| {
                recorded.lock().unwrap().push(event);
            }));
        ws.connect().await.unwrap();
        ws.subscribe(&["market.btcusdt.detail"]).await.unwrap();

        // drop the link, then abandon the read while the replay is stuck
        ws.inner.connected = false;
        stall.store(true, Ordering::SeqCst);
        let cut = tokio::time::timeout(Duration::from_millis(20), ws.next_message()).await;
        assert!(cut.is_err());
        assert!(ws.inner.connected);
        assert_eq!(*events.lock().unwrap(), vec![ReconnectEvent::Started]);

        stall.store(false, Ordering::SeqCst);
        let msg = ws.next_message().await.unwrap().unwrap();

        assert_eq!(msg, "tick");
        assert_eq!(
            ws.inner.sent,
            vec![
                "market.btcusdt.detail".to_string(),
                "market.btcusdt.detail".to_string()
            ]
        );
        assert_eq!(
            *events.lock().unwrap(),
            vec![ReconnectEvent::Started, ReconnectEvent::Succeeded]
        );
    }

    #[tokio::test]
    async fn test_decode_failures_are_skipped() {
        let mut inner = ScriptedWs::default();
        inner.inbox.push_back(Message::Text("bad".to_string()));
        inner.inbox.push_back(Message::Text("good".to_string()));

        let mut ws = ReconnectWs::new(inner);
        ws.connect().await.unwrap();

        let msg = ws.next_message().await.unwrap().unwrap();
        assert_eq!(msg, "good");
    }
}
