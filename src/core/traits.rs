use crate::core::{
    errors::ExchangeError,
    types::{
        Account, CurrencyPair, Depth, Kline, KlinePeriod, Order, PageDirection, Ticker, Trade,
    },
};
use async_trait::async_trait;

/// Callback invoked for every pushed market data update
pub type Handler<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

#[async_trait]
pub trait MarketDataSource {
    /// Latest 24h ticker with best bid/ask
    async fn get_ticker(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError>;

    /// Order book snapshot; `size` of zero keeps every level
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> Result<Depth, ExchangeError>;

    /// Historical candles, newest first
    async fn get_kline_records(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: u32,
    ) -> Result<Vec<Kline>, ExchangeError>;

    /// Recent public trades for the whole market
    async fn get_trades(&self, pair: &CurrencyPair, size: u32)
        -> Result<Vec<Trade>, ExchangeError>;
}

#[async_trait]
pub trait OrderPlacer {
    async fn limit_buy(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError>;

    async fn limit_sell(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError>;

    /// Market buy; `price` is ignored by the exchange
    async fn market_buy(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError>;

    /// Market sell; `price` is ignored by the exchange
    async fn market_sell(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError>;

    async fn cancel_order(&self, order_id: &str, pair: &CurrencyPair)
        -> Result<bool, ExchangeError>;

    async fn get_one_order(&self, order_id: &str, pair: &CurrencyPair)
        -> Result<Order, ExchangeError>;

    async fn get_unfinished_orders(&self, pair: &CurrencyPair)
        -> Result<Vec<Order>, ExchangeError>;

    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page_size: Option<u32>,
        direction: Option<PageDirection>,
    ) -> Result<Vec<Order>, ExchangeError>;
}

#[async_trait]
pub trait AccountSource {
    async fn get_account(&self) -> Result<Account, ExchangeError>;
}

/// Push subscriptions; one handler per channel, a new one replaces the old
#[async_trait]
pub trait MarketStream {
    async fn subscribe_ticker(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Ticker>,
    ) -> Result<(), ExchangeError>;

    async fn subscribe_depth(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Depth>,
    ) -> Result<(), ExchangeError>;

    async fn subscribe_trades(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Trade>,
    ) -> Result<(), ExchangeError>;

    async fn subscribe_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        handler: Handler<Kline>,
    ) -> Result<(), ExchangeError>;
}

// Composite trait for callers that need everything
pub trait ExchangeConnector: MarketDataSource + OrderPlacer + AccountSource + MarketStream {}
