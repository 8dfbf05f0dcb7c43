use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReconnectWs, TungsteniteWs, WsConfig};
use crate::core::traits::{Handler, MarketStream};
use crate::core::types::{CurrencyPair, Depth, Kline, KlinePeriod, Ticker, Trade};
use crate::exchanges::huobi::channel;
use crate::exchanges::huobi::codec::HuobiCodec;
use crate::exchanges::huobi::registry::{HandlerRegistry, SubscriptionRegistry};
use crate::exchanges::huobi::session::{HuobiSession, SessionState, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Push subscriptions over one lazily opened market feed connection
pub struct Streams {
    ws_url: String,
    ws_config: WsConfig,
    registry: Arc<SubscriptionRegistry>,
    status: Arc<SessionStatus>,
    session: OnceCell<HuobiSession>,
}

impl std::fmt::Debug for Streams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Streams")
            .field("ws_url", &self.ws_url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Streams {
    pub fn new(ws_url: String, ws_config: WsConfig) -> Self {
        Self {
            ws_url,
            ws_config,
            registry: Arc::new(SubscriptionRegistry::new()),
            status: Arc::new(SessionStatus::new()),
            session: OnceCell::new(),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// The shared session, connecting on first use
    ///
    /// Concurrent first callers wait on the same connection attempt; a failed
    /// attempt leaves the cell empty so the next call tries again.
    async fn session(&self) -> Result<&HuobiSession, ExchangeError> {
        self.session
            .get_or_try_init(|| async {
                debug!(url = %self.ws_url, "opening market feed");
                let transport = TungsteniteWs::new(
                    self.ws_url.clone(),
                    "huobi".to_string(),
                    HuobiCodec::new(),
                )
                .with_config(self.ws_config.clone());
                let ws = ReconnectWs::new(transport)
                    .with_max_reconnect_attempts(self.ws_config.max_reconnect_attempts)
                    .with_reconnect_delay(self.ws_config.reconnect_delay())
                    .with_listener(self.status.reconnect_listener());

                HuobiSession::start(
                    ws,
                    Arc::clone(&self.status),
                    Arc::clone(&self.registry),
                    self.ws_config.heartbeat_interval(),
                )
                .await
            })
            .await
    }

    async fn subscribe<T>(
        &self,
        table: &HandlerRegistry<T>,
        channel: String,
        handler: Handler<T>,
    ) -> Result<(), ExchangeError> {
        // registered first so the earliest push already finds it
        if table.insert(channel.clone(), Arc::from(handler)) {
            debug!(%channel, "replaced existing callback");
        }
        self.session().await?.subscribe(channel).await
    }

    pub async fn close(&self) -> Result<(), ExchangeError> {
        match self.session.get() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    /// `Uninitialized` until the first subscription
    pub fn state(&self) -> SessionState {
        self.status.state()
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.status.last_active()
    }

    pub fn idle_for(&self) -> Duration {
        self.status.idle_for()
    }
}

#[async_trait]
impl MarketStream for Streams {
    async fn subscribe_ticker(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Ticker>,
    ) -> Result<(), ExchangeError> {
        self.subscribe(&self.registry.ticker, channel::ticker_channel(pair), handler)
            .await
    }

    async fn subscribe_depth(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Depth>,
    ) -> Result<(), ExchangeError> {
        self.subscribe(&self.registry.depth, channel::depth_channel(pair), handler)
            .await
    }

    async fn subscribe_trades(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Trade>,
    ) -> Result<(), ExchangeError> {
        self.subscribe(&self.registry.trade, channel::trade_channel(pair), handler)
            .await
    }

    async fn subscribe_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        handler: Handler<Kline>,
    ) -> Result<(), ExchangeError> {
        self.subscribe(
            &self.registry.kline,
            channel::kline_channel(pair, period),
            handler,
        )
        .await
    }
}
