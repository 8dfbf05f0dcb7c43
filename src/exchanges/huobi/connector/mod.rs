use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::{
    AccountSource, ExchangeConnector, Handler, MarketDataSource, MarketStream, OrderPlacer,
};
use crate::core::types::{
    Account as AccountBalances, AccountInfo, AccountType, CurrencyPair, Depth, Kline, KlinePeriod,
    Order, PageDirection, SymbolInfo, Ticker, Trade,
};
use crate::exchanges::huobi::session::SessionState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub mod account;
pub mod market_data;
pub mod streams;
pub mod trading;

pub use account::Account;
pub use market_data::MarketData;
pub use streams::Streams;
pub use trading::Trading;

/// Huobi connector that composes all sub-trait implementations
#[derive(Debug)]
pub struct HuobiConnector<R: RestClient> {
    pub market: MarketData<R>,
    pub trading: Trading<R>,
    pub account: Account<R>,
    pub streams: Streams,
}

impl<R: RestClient + Clone> HuobiConnector<R> {
    pub fn new(rest: R, account_id: String, streams: Streams) -> Self {
        Self {
            market: MarketData::new(&rest),
            trading: Trading::new(&rest, account_id.clone()),
            account: Account::new(&rest, account_id),
            streams,
        }
    }
}

impl<R: RestClient> HuobiConnector<R> {
    /// Account id used for balances and orders; empty when unresolved
    pub fn account_id(&self) -> &str {
        self.account.account_id()
    }

    pub async fn get_account_info(
        &self,
        account_type: AccountType,
    ) -> Result<AccountInfo, ExchangeError> {
        self.account.get_account_info(account_type).await
    }

    pub async fn get_symbols(&self) -> Result<Vec<SymbolInfo>, ExchangeError> {
        self.market.get_symbols().await
    }

    pub async fn get_currencies(&self) -> Result<Vec<String>, ExchangeError> {
        self.market.get_currencies().await
    }

    /// Close the market feed; a no-op before the first subscription
    pub async fn close(&self) -> Result<(), ExchangeError> {
        self.streams.close().await
    }

    pub fn session_state(&self) -> SessionState {
        self.streams.state()
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.streams.last_active()
    }

    pub fn idle_for(&self) -> Duration {
        self.streams.idle_for()
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for HuobiConnector<R> {
    async fn get_ticker(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError> {
        self.market.get_ticker(pair).await
    }

    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> Result<Depth, ExchangeError> {
        self.market.get_depth(size, pair).await
    }

    async fn get_kline_records(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        self.market.get_kline_records(pair, period, size).await
    }

    async fn get_trades(
        &self,
        pair: &CurrencyPair,
        size: u32,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.market.get_trades(pair, size).await
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for HuobiConnector<R> {
    async fn limit_buy(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.trading.limit_buy(amount, price, pair).await
    }

    async fn limit_sell(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.trading.limit_sell(amount, price, pair).await
    }

    async fn market_buy(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.trading.market_buy(amount, price, pair).await
    }

    async fn market_sell(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.trading.market_sell(amount, price, pair).await
    }

    async fn cancel_order(
        &self,
        order_id: &str,
        pair: &CurrencyPair,
    ) -> Result<bool, ExchangeError> {
        self.trading.cancel_order(order_id, pair).await
    }

    async fn get_one_order(
        &self,
        order_id: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.trading.get_one_order(order_id, pair).await
    }

    async fn get_unfinished_orders(
        &self,
        pair: &CurrencyPair,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.trading.get_unfinished_orders(pair).await
    }

    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page_size: Option<u32>,
        direction: Option<PageDirection>,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.trading
            .get_order_history(pair, page_size, direction)
            .await
    }
}

#[async_trait]
impl<R: RestClient> AccountSource for HuobiConnector<R> {
    async fn get_account(&self) -> Result<AccountBalances, ExchangeError> {
        self.account.get_account().await
    }
}

#[async_trait]
impl<R: RestClient> MarketStream for HuobiConnector<R> {
    async fn subscribe_ticker(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Ticker>,
    ) -> Result<(), ExchangeError> {
        self.streams.subscribe_ticker(pair, handler).await
    }

    async fn subscribe_depth(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Depth>,
    ) -> Result<(), ExchangeError> {
        self.streams.subscribe_depth(pair, handler).await
    }

    async fn subscribe_trades(
        &self,
        pair: &CurrencyPair,
        handler: Handler<Trade>,
    ) -> Result<(), ExchangeError> {
        self.streams.subscribe_trades(pair, handler).await
    }

    async fn subscribe_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        handler: Handler<Kline>,
    ) -> Result<(), ExchangeError> {
        self.streams.subscribe_klines(pair, period, handler).await
    }
}

impl<R: RestClient> ExchangeConnector for HuobiConnector<R> {}
