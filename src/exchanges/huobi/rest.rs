use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::types::conversion::{value_to_i64, value_to_id};
use crate::core::types::{KlinePeriod, OrderSide, OrderStateFilter, PageDirection};
use crate::exchanges::huobi::conversions::decode;
use crate::exchanges::huobi::types::{
    HuobiAccount, HuobiBalance, HuobiDepthTick, HuobiKline, HuobiMergedTick, HuobiOrder,
    HuobiSymbol, HuobiTradeTick,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const STATUS_OK: &str = "ok";

/// Huobi REST API client
#[derive(Debug, Clone)]
pub struct HuobiRest<R: RestClient> {
    rest_client: R,
}

impl<R: RestClient> HuobiRest<R> {
    pub fn new(rest_client: R) -> Self {
        Self { rest_client }
    }

    /// Unwrap the `{"status": ...}` envelope
    ///
    /// Anything but `ok` becomes an `ApiError` carrying `err-code`/`err-msg`.
    fn check_envelope(response: Value) -> Result<Map<String, Value>, ExchangeError> {
        let mut envelope = match response {
            Value::Object(envelope) => envelope,
            other => {
                return Err(ExchangeError::MalformedResponse(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let status = envelope
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if status == STATUS_OK {
            return Ok(envelope);
        }

        let text = |v: Option<Value>| match v {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let code = text(envelope.remove("err-code"))
            .or_else(|| Some(status).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = text(envelope.remove("err-msg")).unwrap_or_default();
        Err(ExchangeError::ApiError { code, message })
    }

    fn take_field(
        envelope: &mut Map<String, Value>,
        field: &str,
        what: &str,
    ) -> Result<Value, ExchangeError> {
        envelope
            .remove(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ExchangeError::MalformedResponse(format!("{}: missing {}", what, field)))
    }

    /// Decode the `data` member of a successful response
    fn handle_data<T: DeserializeOwned>(response: Value, what: &str) -> Result<T, ExchangeError> {
        let mut envelope = Self::check_envelope(response)?;
        decode(what, Self::take_field(&mut envelope, "data", what)?)
    }

    /// Decode the `tick` member together with the server timestamp
    fn handle_tick<T: DeserializeOwned>(
        response: Value,
        what: &str,
    ) -> Result<(T, u64), ExchangeError> {
        let mut envelope = Self::check_envelope(response)?;
        let ts = envelope
            .get("ts")
            .and_then(|v| value_to_i64(v).ok())
            .and_then(|ts| u64::try_from(ts).ok())
            .unwrap_or_default();
        let tick = decode(what, Self::take_field(&mut envelope, "tick", what)?)?;
        Ok((tick, ts))
    }

    // Account endpoints (signed)

    pub async fn get_accounts(&self) -> Result<Vec<HuobiAccount>, ExchangeError> {
        let response = self
            .rest_client
            .get("/v1/account/accounts", &[], true)
            .await?;
        Self::handle_data(response, "accounts")
    }

    pub async fn get_balance(&self, account_id: &str) -> Result<HuobiBalance, ExchangeError> {
        let endpoint = format!("/v1/account/accounts/{}/balance", account_id);
        let response = self.rest_client.get(&endpoint, &[], true).await?;
        Self::handle_data(response, "balance")
    }

    // Trading endpoints (signed)

    /// Place an order and return its id
    ///
    /// Amount and price are sent exactly as given; market orders carry no price.
    pub async fn place_order(
        &self,
        account_id: &str,
        symbol: &str,
        side: OrderSide,
        amount: &str,
        price: &str,
    ) -> Result<String, ExchangeError> {
        let mut params = vec![
            ("account-id", account_id),
            ("amount", amount),
            ("symbol", symbol),
            ("type", side.order_type()),
        ];
        if !side.is_market() {
            params.push(("price", price));
        }

        let response = self
            .rest_client
            .post("/v1/order/orders/place", &params, true)
            .await?;
        let id: Value = Self::handle_data(response, "order placement")?;
        value_to_id(&id)
            .map_err(|e| ExchangeError::MalformedResponse(format!("order placement: {}", e)))
    }

    /// Request cancellation; the exchange answers with the order id
    pub async fn cancel_order(&self, order_id: &str) -> Result<String, ExchangeError> {
        let endpoint = format!("/v1/order/orders/{}/submitcancel", order_id);
        let response = self.rest_client.post(&endpoint, &[], true).await?;
        let mut envelope = Self::check_envelope(response)?;
        Ok(envelope
            .remove("data")
            .and_then(|v| value_to_id(&v).ok())
            .unwrap_or_else(|| order_id.to_string()))
    }

    pub async fn get_order(&self, order_id: &str) -> Result<HuobiOrder, ExchangeError> {
        let endpoint = format!("/v1/order/orders/{}", order_id);
        let response = self.rest_client.get(&endpoint, &[], true).await?;
        Self::handle_data(response, "order")
    }

    pub async fn get_orders(
        &self,
        symbol: &str,
        filter: OrderStateFilter,
        size: Option<u32>,
        direction: Option<PageDirection>,
    ) -> Result<Vec<HuobiOrder>, ExchangeError> {
        let size = size.filter(|s| *s > 0).map(|s| s.to_string());
        let mut params = vec![("symbol", symbol), ("states", filter.states())];
        if let Some(direction) = direction {
            params.push(("direct", direction.as_str()));
        }
        if let Some(ref size) = size {
            params.push(("size", size.as_str()));
        }

        let response = self
            .rest_client
            .get("/v1/order/orders", &params, true)
            .await?;
        Self::handle_data(response, "orders")
    }

    // Market data endpoints (public)

    pub async fn get_merged_ticker(
        &self,
        symbol: &str,
    ) -> Result<(HuobiMergedTick, u64), ExchangeError> {
        let response = self
            .rest_client
            .get("/market/detail/merged", &[("symbol", symbol)], false)
            .await?;
        Self::handle_tick(response, "ticker")
    }

    pub async fn get_depth(&self, symbol: &str) -> Result<HuobiDepthTick, ExchangeError> {
        let response = self
            .rest_client
            .get("/market/depth", &[("symbol", symbol), ("type", "step0")], false)
            .await?;
        Self::handle_tick(response, "depth").map(|(tick, _)| tick)
    }

    /// Candles, newest first
    pub async fn get_klines(
        &self,
        symbol: &str,
        period: KlinePeriod,
        size: u32,
    ) -> Result<Vec<HuobiKline>, ExchangeError> {
        let size = size.to_string();
        let params = [
            ("period", period.as_str()),
            ("size", size.as_str()),
            ("symbol", symbol),
        ];
        let response = self
            .rest_client
            .get("/market/history/kline", &params, false)
            .await?;
        Self::handle_data(response, "klines")
    }

    /// Recent trade batches, newest first
    pub async fn get_trades(
        &self,
        symbol: &str,
        size: u32,
    ) -> Result<Vec<HuobiTradeTick>, ExchangeError> {
        let size = size.to_string();
        let response = self
            .rest_client
            .get(
                "/market/history/trade",
                &[("symbol", symbol), ("size", size.as_str())],
                false,
            )
            .await?;
        Self::handle_data(response, "trades")
    }

    pub async fn get_symbols(&self) -> Result<Vec<HuobiSymbol>, ExchangeError> {
        let response = self
            .rest_client
            .get("/v1/common/symbols", &[], false)
            .await?;
        Self::handle_data(response, "symbols")
    }

    pub async fn get_currencies(&self) -> Result<Vec<String>, ExchangeError> {
        let response = self
            .rest_client
            .get("/v1/common/currencys", &[], false)
            .await?;
        Self::handle_data(response, "currencies")
    }
}
