use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::OrderPlacer;
use crate::core::types::conversion::parse_decimal;
use crate::core::types::{
    CurrencyPair, Order, OrderSide, OrderStateFilter, OrderStatus, PageDirection,
};
use crate::exchanges::huobi::{conversions, rest::HuobiRest};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, instrument};

/// Page size used when listing open orders
pub const UNFINISHED_PAGE_SIZE: u32 = 100;

/// Order placement, cancellation and queries
#[derive(Debug)]
pub struct Trading<R: RestClient> {
    rest: HuobiRest<R>,
    account_id: String,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &R, account_id: String) -> Self {
        Self {
            rest: HuobiRest::new(rest.clone()),
            account_id,
        }
    }
}

impl<R: RestClient> Trading<R> {
    #[instrument(skip(self), fields(exchange = "huobi", symbol = %pair.to_symbol()))]
    async fn place(
        &self,
        side: OrderSide,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        if self.account_id.is_empty() {
            return Err(ExchangeError::InvalidParameters(
                "account id is not set".to_string(),
            ));
        }
        let amount_value = parse_decimal(amount)
            .map_err(|e| ExchangeError::InvalidParameters(format!("amount: {}", e)))?;
        let price_value = if side.is_market() {
            parse_decimal(price).unwrap_or(Decimal::ZERO)
        } else {
            parse_decimal(price)
                .map_err(|e| ExchangeError::InvalidParameters(format!("price: {}", e)))?
        };

        let order_id_str = self
            .rest
            .place_order(&self.account_id, &pair.to_symbol(), side, amount, price)
            .await?;
        let order_id = order_id_str.parse::<u64>().map_err(|_| {
            ExchangeError::MalformedResponse(format!("order id is not numeric: {}", order_id_str))
        })?;
        info!(order_id = %order_id_str, order_type = side.order_type(), "order placed");

        Ok(Order {
            order_id,
            order_id_str,
            pair: pair.clone(),
            side,
            amount: amount_value,
            price: price_value,
            deal_amount: Decimal::ZERO,
            fee: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            status: OrderStatus::Unfinished,
            order_time: 0,
        })
    }

    async fn list(
        &self,
        pair: &CurrencyPair,
        filter: OrderStateFilter,
        size: Option<u32>,
        direction: Option<PageDirection>,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.rest
            .get_orders(&pair.to_symbol(), filter, size, direction)
            .await?
            .into_iter()
            .map(|raw| conversions::convert_order(raw, pair.clone()))
            .collect()
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for Trading<R> {
    async fn limit_buy(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.place(OrderSide::Buy, amount, price, pair).await
    }

    async fn limit_sell(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.place(OrderSide::Sell, amount, price, pair).await
    }

    async fn market_buy(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.place(OrderSide::BuyMarket, amount, price, pair).await
    }

    async fn market_sell(
        &self,
        amount: &str,
        price: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        self.place(OrderSide::SellMarket, amount, price, pair).await
    }

    #[instrument(skip(self, _pair), fields(exchange = "huobi"))]
    async fn cancel_order(
        &self,
        order_id: &str,
        _pair: &CurrencyPair,
    ) -> Result<bool, ExchangeError> {
        self.rest.cancel_order(order_id).await?;
        Ok(true)
    }

    async fn get_one_order(
        &self,
        order_id: &str,
        pair: &CurrencyPair,
    ) -> Result<Order, ExchangeError> {
        let raw = self.rest.get_order(order_id).await?;
        conversions::convert_order(raw, pair.clone())
    }

    async fn get_unfinished_orders(
        &self,
        pair: &CurrencyPair,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.list(
            pair,
            OrderStateFilter::Unfinished,
            Some(UNFINISHED_PAGE_SIZE),
            None,
        )
        .await
    }

    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page_size: Option<u32>,
        direction: Option<PageDirection>,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.list(
            pair,
            OrderStateFilter::History,
            page_size,
            Some(direction.unwrap_or(PageDirection::Next)),
        )
        .await
    }
}
