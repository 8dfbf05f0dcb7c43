use crate::core::errors::ExchangeError;
use crate::core::kernel::ws::{ReconnectEvent, ReconnectListener};
use crate::core::kernel::WsSession;
use crate::exchanges::huobi::channel::{self, ChannelKind, Route};
use crate::exchanges::huobi::codec::{HuobiCodec, HuobiMessage};
use crate::exchanges::huobi::conversions::{self, decode};
use crate::exchanges::huobi::registry::SubscriptionRegistry;
use crate::exchanges::huobi::types::{HuobiDepthTick, HuobiKline, HuobiTickerTick, HuobiTradeTick};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Uninitialized = 0,
    Connecting = 1,
    Connected = 2,
    Reconnecting = 3,
    Closed = 4,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reconnecting,
            4 => Self::Closed,
            _ => Self::Uninitialized,
        }
    }
}

/// Connection state and liveness shared between the session and its transport
#[derive(Debug)]
pub struct SessionStatus {
    state: AtomicU8,
    last_active_ms: AtomicI64,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Uninitialized as u8),
            last_active_ms: AtomicI64::new(0),
        }
    }
}

impl SessionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Record inbound heartbeat traffic
    pub fn touch(&self) {
        self.last_active_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        match self.last_active_ms.load(Ordering::Acquire) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Time since the last heartbeat traffic, zero before the first one
    pub fn idle_for(&self) -> Duration {
        self.last_active().map_or(Duration::ZERO, |at| {
            (Utc::now() - at).to_std().unwrap_or(Duration::ZERO)
        })
    }

    /// Mirror transport reconnects into the session state
    pub fn reconnect_listener(self: &Arc<Self>) -> ReconnectListener {
        let status = Arc::clone(self);
        Arc::new(move |event: ReconnectEvent| {
            if status.state() == SessionState::Closed {
                return;
            }
            match event {
                ReconnectEvent::Started => status.set_state(SessionState::Reconnecting),
                ReconnectEvent::Succeeded => {
                    status.touch();
                    status.set_state(SessionState::Connected);
                }
                ReconnectEvent::Failed => {}
            }
        })
    }
}

/// Turns decoded frames into heartbeat replies and callback invocations
pub struct Dispatcher {
    status: Arc<SessionStatus>,
    registry: Arc<SubscriptionRegistry>,
}

impl Dispatcher {
    pub fn new(status: Arc<SessionStatus>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { status, registry }
    }

    /// Process one frame, returning the reply to send if any
    pub fn handle_message(&self, message: HuobiMessage) -> Option<Message> {
        match message {
            HuobiMessage::Ping(value) => {
                self.status.touch();
                Some(Message::Text(json!({ "pong": value }).to_string()))
            }
            HuobiMessage::Pong(_) => {
                self.status.touch();
                None
            }
            HuobiMessage::SubscriptionAck { id, status, subbed } => {
                debug!(?id, ?status, ?subbed, "Subscription acknowledged");
                None
            }
            HuobiMessage::Data { channel, ts, tick } => {
                match channel::route(&channel) {
                    Some(route) => self.dispatch(&channel, route, ts, tick),
                    None => warn!("Dropping frame on unrecognised channel {}", channel),
                }
                None
            }
        }
    }

    fn dispatch(&self, channel: &str, route: Route, ts: u64, tick: Value) {
        let Route { kind, pair, .. } = route;
        match kind {
            ChannelKind::Ticker => {
                let Some(callback) = self.registry.ticker.get(channel) else {
                    trace!("No ticker callback for {}", channel);
                    return;
                };
                match decode::<HuobiTickerTick>("ticker", tick) {
                    Ok(tick) => callback(conversions::convert_ticker(tick, pair, ts)),
                    Err(e) => warn!("Dropping frame on {}: {}", channel, e),
                }
            }
            ChannelKind::Depth => {
                let Some(callback) = self.registry.depth.get(channel) else {
                    trace!("No depth callback for {}", channel);
                    return;
                };
                match decode::<HuobiDepthTick>("depth", tick) {
                    Ok(tick) => callback(conversions::convert_depth(tick, pair)),
                    Err(e) => warn!("Dropping frame on {}: {}", channel, e),
                }
            }
            ChannelKind::Trade => {
                let Some(callback) = self.registry.trade.get(channel) else {
                    trace!("No trade callback for {}", channel);
                    return;
                };
                match decode::<HuobiTradeTick>("trade", tick) {
                    Ok(tick) => {
                        // reverse of receipt order
                        for trade in conversions::convert_trades(tick.data, &pair).into_iter().rev() {
                            callback(trade);
                        }
                    }
                    Err(e) => warn!("Dropping frame on {}: {}", channel, e),
                }
            }
            ChannelKind::Kline => {
                let Some(callback) = self.registry.kline.get(channel) else {
                    trace!("No kline callback for {}", channel);
                    return;
                };
                match decode::<HuobiKline>("kline", tick) {
                    Ok(raw) => callback(conversions::convert_kline(raw, pair)),
                    Err(e) => warn!("Dropping frame on {}: {}", channel, e),
                }
            }
            ChannelKind::OrderUpdate => {
                debug!("Order update on {} for {}: {}", channel, pair, tick);
            }
        }
    }
}

enum Command {
    Subscribe {
        channel: String,
        ack: oneshot::Sender<Result<(), ExchangeError>>,
    },
    Close,
}

/// Handle to the single market feed connection
///
/// All frames are processed in order on one background task. Dropping the
/// handle closes the connection.
pub struct HuobiSession {
    status: Arc<SessionStatus>,
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for HuobiSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuobiSession")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HuobiSession {
    /// Connect `ws` and start the receive loop
    #[instrument(skip_all, fields(exchange = "huobi"))]
    pub async fn start<W>(
        mut ws: W,
        status: Arc<SessionStatus>,
        registry: Arc<SubscriptionRegistry>,
        heartbeat: Duration,
    ) -> Result<Self, ExchangeError>
    where
        W: WsSession<HuobiCodec> + 'static,
    {
        status.set_state(SessionState::Connecting);
        if let Err(e) = ws.connect().await {
            status.set_state(SessionState::Closed);
            return Err(e);
        }
        status.touch();
        status.set_state(SessionState::Connected);

        let (commands, receiver) = mpsc::channel(64);
        let dispatcher = Dispatcher::new(Arc::clone(&status), registry);
        tokio::spawn(run(ws, dispatcher, receiver, heartbeat));

        Ok(Self { status, commands })
    }

    /// Send a subscribe frame and wait until it is written
    pub async fn subscribe(&self, channel: String) -> Result<(), ExchangeError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { channel, ack })
            .await
            .map_err(|_| ExchangeError::NetworkError("market feed session is closed".to_string()))?;
        done.await
            .map_err(|_| ExchangeError::NetworkError("market feed session is closed".to_string()))?
    }

    pub async fn close(&self) -> Result<(), ExchangeError> {
        if self.commands.send(Command::Close).await.is_err() {
            // a finished task has already closed the socket
            debug!("Market feed task already stopped");
        }
        self.status.set_state(SessionState::Closed);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.status.state()
    }

    pub fn status(&self) -> &Arc<SessionStatus> {
        &self.status
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.status.last_active()
    }

    pub fn idle_for(&self) -> Duration {
        self.status.idle_for()
    }
}

fn heartbeat_frame() -> Message {
    Message::Text(json!({ "ping": Utc::now().timestamp() }).to_string())
}

async fn run<W>(
    mut ws: W,
    dispatcher: Dispatcher,
    mut commands: mpsc::Receiver<Command>,
    heartbeat: Duration,
) where
    W: WsSession<HuobiCodec>,
{
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + heartbeat, heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = ws.send_raw(heartbeat_frame()).await {
                    warn!("Failed to send heartbeat: {}", e);
                }
            }
            command = commands.recv() => match command {
                Some(Command::Subscribe { channel, ack }) => {
                    debug!("Subscribing to {}", channel);
                    let result = ws.subscribe(&[channel.as_str()]).await;
                    let _ = ack.send(result);
                }
                Some(Command::Close) | None => {
                    if let Err(e) = ws.close().await {
                        warn!("Failed to close market feed: {}", e);
                    }
                    break;
                }
            },
            message = ws.next_message() => match message {
                Some(Ok(message)) => {
                    if let Some(reply) = dispatcher.handle_message(message) {
                        if let Err(e) = ws.send_raw(reply).await {
                            warn!("Failed to answer heartbeat: {}", e);
                        }
                    }
                }
                Some(Err(e)) => {
                    error!("Market feed lost: {}", e);
                    break;
                }
                None => {
                    debug!("Market feed ended");
                    break;
                }
            },
        }
    }

    dispatcher.status.set_state(SessionState::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::ReconnectWs;
    use crate::core::types::{CurrencyPair, Ticker, Trade};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn dispatcher() -> (Dispatcher, Arc<SessionStatus>, Arc<SubscriptionRegistry>) {
        let status = Arc::new(SessionStatus::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        (
            Dispatcher::new(status.clone(), registry.clone()),
            status,
            registry,
        )
    }

    fn data(channel: &str, tick: Value) -> HuobiMessage {
        HuobiMessage::Data {
            channel: channel.to_string(),
            ts: 1_630_000_000_000,
            tick,
        }
    }

    #[test]
    fn test_ping_is_echoed_and_marks_activity() {
        let (dispatcher, status, _) = dispatcher();
        assert!(status.last_active().is_none());

        let reply = dispatcher.handle_message(HuobiMessage::Ping(json!(1492420473027_u64)));

        assert_eq!(
            reply,
            Some(Message::Text(r#"{"pong":1492420473027}"#.to_string()))
        );
        assert!(status.last_active().is_some());
    }

    #[test]
    fn test_pong_marks_activity_without_reply() {
        let (dispatcher, status, _) = dispatcher();
        assert!(dispatcher.handle_message(HuobiMessage::Pong(json!(1))).is_none());
        assert!(status.last_active().is_some());
    }

    #[test]
    fn test_ticker_reaches_its_callback() {
        let (dispatcher, _, registry) = dispatcher();
        let received: Arc<Mutex<Vec<Ticker>>> = Arc::default();
        let sink = received.clone();
        registry.ticker.insert(
            "market.btcusdt.detail",
            Arc::new(move |ticker: Ticker| sink.lock().unwrap().push(ticker)),
        );

        dispatcher.handle_message(data(
            "market.btcusdt.detail",
            json!({"close": 100, "low": 90, "high": 110, "vol": 500}),
        ));
        // other markets are not delivered to this callback
        dispatcher.handle_message(data(
            "market.ethusdt.detail",
            json!({"close": 1, "low": 1, "high": 1, "vol": 1}),
        ));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].pair, CurrencyPair::new("btc", "usdt").unwrap());
        assert_eq!(received[0].last.to_string(), "100");
        assert_eq!(received[0].date, 1_630_000_000_000);
    }

    #[test]
    fn test_trades_are_delivered_in_reverse_receipt_order() {
        let (dispatcher, _, registry) = dispatcher();
        let received: Arc<Mutex<Vec<Trade>>> = Arc::default();
        let sink = received.clone();
        registry.trade.insert(
            "market.btcusdt.trade.detail",
            Arc::new(move |trade: Trade| sink.lock().unwrap().push(trade)),
        );

        dispatcher.handle_message(data(
            "market.btcusdt.trade.detail",
            json!({"data": [
                {"id": 1, "amount": 1, "price": 10, "ts": 1, "direction": "buy"},
                {"id": 1, "amount": 2, "price": 10, "ts": 2, "direction": "buy"},
                {"id": 2, "amount": 3, "price": 10, "ts": 3, "direction": "sell"}
            ]}),
        ));

        let ids: Vec<String> = received.lock().unwrap().iter().map(|t| t.tid.clone()).collect();
        assert_eq!(ids, vec!["2".to_string(), "1".to_string()]);
        assert_eq!(received.lock().unwrap()[1].amount.to_string(), "2");
    }

    #[test]
    fn test_unusable_frames_are_dropped() {
        let (dispatcher, _, registry) = dispatcher();
        let calls: Arc<Mutex<usize>> = Arc::default();
        let sink = calls.clone();
        registry.ticker.insert(
            "market.btcusdt.detail",
            Arc::new(move |_: Ticker| *sink.lock().unwrap() += 1),
        );

        // malformed payload
        dispatcher.handle_message(data("market.btcusdt.detail", json!({"close": "abc"})));
        // unknown channel
        dispatcher.handle_message(data("candles.btcusdt", json!({})));
        // no callback registered
        dispatcher.handle_message(data(
            "market.btcusdt.depth.step0",
            json!({"asks": [], "bids": []}),
        ));
        let ack = HuobiMessage::SubscriptionAck {
            id: Some("1".to_string()),
            status: Some("ok".to_string()),
            subbed: None,
        };
        assert!(dispatcher.handle_message(ack).is_none());

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_reconnect_events_drive_state() {
        let status = Arc::new(SessionStatus::new());
        status.set_state(SessionState::Connected);
        let listener = status.reconnect_listener();

        listener(ReconnectEvent::Started);
        assert_eq!(status.state(), SessionState::Reconnecting);
        listener(ReconnectEvent::Succeeded);
        assert_eq!(status.state(), SessionState::Connected);

        status.set_state(SessionState::Closed);
        listener(ReconnectEvent::Started);
        assert_eq!(status.state(), SessionState::Closed);
    }

    /// Transport that replays scripted frames and records what is written
    #[derive(Default)]
    struct ScriptedFeed {
        connected: bool,
        connects: usize,
        drop_after_subscribe: bool,
        replay_delay: Option<Duration>,
        inbox: VecDeque<HuobiMessage>,
        sent: Arc<Mutex<Vec<String>>>,
        subscribed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl WsSession<HuobiCodec> for ScriptedFeed {
        async fn connect(&mut self) -> Result<(), ExchangeError> {
            self.connects += 1;
            self.connected = true;
            Ok(())
        }

        async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
            if let Message::Text(text) = msg {
                self.sent.lock().unwrap().push(text);
            }
            Ok(())
        }

        async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
            std::future::pending().await
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
            if self.connects > 1 {
                if let Some(delay) = self.replay_delay.take() {
                    tokio::time::sleep(delay).await;
                }
            }
            let mut subscribed = self.subscribed.lock().unwrap();
            subscribed.extend(streams.iter().map(|s| s.as_ref().to_string()));
            Ok(())
        }

        async fn next_message(&mut self) -> Option<Result<HuobiMessage, ExchangeError>> {
            if let Some(message) = self.inbox.pop_front() {
                return Some(Ok(message));
            }
            if self.drop_after_subscribe && !self.subscribed.lock().unwrap().is_empty() {
                self.drop_after_subscribe = false;
                self.connected = false;
                return None;
            }
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_session_answers_pings_and_sends_heartbeats() {
        let mut feed = ScriptedFeed::default();
        feed.inbox.push_back(HuobiMessage::Ping(json!(42)));
        let sent = feed.sent.clone();
        let subscribed = feed.subscribed.clone();

        let session = HuobiSession::start(
            feed,
            Arc::new(SessionStatus::new()),
            Arc::new(SubscriptionRegistry::new()),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        session
            .subscribe("market.btcusdt.detail".to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sent = sent.lock().unwrap().clone();
        assert!(sent.contains(&r#"{"pong":42}"#.to_string()));
        assert!(sent.iter().any(|frame| frame.starts_with(r#"{"ping":"#)));
        assert_eq!(
            *subscribed.lock().unwrap(),
            vec!["market.btcusdt.detail".to_string()]
        );
        assert!(session.idle_for() < Duration::from_secs(5));

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session
            .subscribe("market.ethusdt.detail".to_string())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_heartbeat_during_replay_still_restores_session() {
        let feed = ScriptedFeed {
            drop_after_subscribe: true,
            replay_delay: Some(Duration::from_millis(200)),
            ..ScriptedFeed::default()
        };
        let subscribed = feed.subscribed.clone();
        let status = Arc::new(SessionStatus::new());
        let ws = ReconnectWs::new(feed)
            .with_reconnect_delay(Duration::from_millis(1))
            .with_listener(status.reconnect_listener());

        // the heartbeat fires while the replay after the drop is still running
        let session = HuobiSession::start(
            ws,
            status,
            Arc::new(SubscriptionRegistry::new()),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        session
            .subscribe("market.btcusdt.detail".to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(
            *subscribed.lock().unwrap(),
            vec![
                "market.btcusdt.detail".to_string(),
                "market.btcusdt.detail".to_string()
            ]
        );

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_after_feed_ended_is_ok() {
        let feed = ScriptedFeed {
            drop_after_subscribe: true,
            ..ScriptedFeed::default()
        };
        let session = HuobiSession::start(
            feed,
            Arc::new(SessionStatus::new()),
            Arc::new(SubscriptionRegistry::new()),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        session
            .subscribe("market.btcusdt.detail".to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.state(), SessionState::Closed);

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }
}
