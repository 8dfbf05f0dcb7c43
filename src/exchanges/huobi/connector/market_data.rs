use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::MarketDataSource;
use crate::core::types::{CurrencyPair, Depth, Kline, KlinePeriod, SymbolInfo, Ticker, Trade};
use crate::exchanges::huobi::{conversions, rest::HuobiRest};
use async_trait::async_trait;
use tracing::instrument;

/// Public market data over REST
#[derive(Debug)]
pub struct MarketData<R: RestClient> {
    rest: HuobiRest<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &R) -> Self {
        Self {
            rest: HuobiRest::new(rest.clone()),
        }
    }
}

impl<R: RestClient> MarketData<R> {
    /// Every listed trading pair with its precisions
    pub async fn get_symbols(&self) -> Result<Vec<SymbolInfo>, ExchangeError> {
        Ok(self
            .rest
            .get_symbols()
            .await?
            .into_iter()
            .map(conversions::convert_symbol)
            .collect())
    }

    /// Every listed currency code, lower-case as the exchange reports them
    pub async fn get_currencies(&self) -> Result<Vec<String>, ExchangeError> {
        self.rest.get_currencies().await
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "huobi"))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError> {
        let (tick, ts) = self.rest.get_merged_ticker(&pair.to_symbol()).await?;
        Ok(conversions::convert_merged_ticker(tick, pair.clone(), ts))
    }

    #[instrument(skip(self), fields(exchange = "huobi"))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> Result<Depth, ExchangeError> {
        let tick = self.rest.get_depth(&pair.to_symbol()).await?;
        let depth = conversions::convert_depth(tick, pair.clone());
        Ok(conversions::truncate_depth(depth, size))
    }

    async fn get_kline_records(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        Ok(self
            .rest
            .get_klines(&pair.to_symbol(), period, size)
            .await?
            .into_iter()
            .map(|raw| conversions::convert_kline(raw, pair.clone()))
            .collect())
    }

    async fn get_trades(
        &self,
        pair: &CurrencyPair,
        size: u32,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let batches = self.rest.get_trades(&pair.to_symbol(), size).await?;
        Ok(batches
            .into_iter()
            .flat_map(|batch| conversions::convert_trades(batch.data, pair))
            .collect())
    }
}
