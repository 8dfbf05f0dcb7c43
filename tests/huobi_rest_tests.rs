use async_trait::async_trait;
use huobix::core::config::ExchangeConfig;
use huobix::core::kernel::{RestClient, WsConfig};
use huobix::core::traits::{AccountSource, MarketDataSource, OrderPlacer};
use huobix::core::types::{
    AccountType, Currency, CurrencyPair, KlinePeriod, OrderSide, OrderStatus, TradeSide,
};
use huobix::exchanges::huobi::{HuobiConnector, Streams};
use huobix::ExchangeError;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Answers each endpoint with a canned body
#[derive(Clone, Default)]
struct CannedExchange {
    replies: Arc<HashMap<String, Value>>,
    requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
}

impl CannedExchange {
    fn new(replies: Vec<(&str, Value)>) -> Self {
        Self {
            replies: Arc::new(
                replies
                    .into_iter()
                    .map(|(endpoint, body)| (endpoint.to_string(), body))
                    .collect(),
            ),
            requests: Arc::default(),
        }
    }

    fn reply(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, ExchangeError> {
        self.requests.lock().unwrap().push((
            endpoint.to_string(),
            params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        self.replies
            .get(endpoint)
            .cloned()
            .ok_or_else(|| ExchangeError::HttpStatus {
                status: 404,
                body: endpoint.to_string(),
            })
    }

    fn params_of(&self, endpoint: &str) -> Vec<(String, String)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| e == endpoint)
            .map(|(_, params)| params.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RestClient for CannedExchange {
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        _authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.reply(endpoint, query_params)
    }

    async fn post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        _authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.reply(endpoint, params)
    }
}

fn connector(exchange: &CannedExchange, account_id: &str) -> HuobiConnector<CannedExchange> {
    HuobiConnector::new(
        exchange.clone(),
        account_id.to_string(),
        Streams::new("wss://127.0.0.1:1/ws".to_string(), WsConfig::default()),
    )
}

fn btc_usdt() -> CurrencyPair {
    CurrencyPair::new("btc", "usdt").unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_limit_buy_returns_placed_order() {
    let exchange = CannedExchange::new(vec![(
        "/v1/order/orders/place",
        json!({"status": "ok", "data": "12345"}),
    )]);
    let huobi = connector(&exchange, "100009");

    let order = huobi.limit_buy("0.01", "6500.5", &btc_usdt()).await.unwrap();

    assert_eq!(order.order_id, 12345);
    assert_eq!(order.order_id_str, "12345");
    assert_eq!(order.side, OrderSide::Buy);
    assert_eq!(order.amount, dec("0.01"));
    assert_eq!(order.price, dec("6500.5"));
    assert_eq!(order.status, OrderStatus::Unfinished);

    let params = exchange.params_of("/v1/order/orders/place");
    assert!(params.contains(&("account-id".to_string(), "100009".to_string())));
    assert!(params.contains(&("symbol".to_string(), "btcusdt".to_string())));
    assert!(params.contains(&("type".to_string(), "buy-limit".to_string())));
}

#[tokio::test]
async fn test_rejected_order_surfaces_err_code() {
    let exchange = CannedExchange::new(vec![(
        "/v1/order/orders/place",
        json!({"status": "error", "err-code": "invalid-amount", "err-msg": "bad amount"}),
    )]);
    let huobi = connector(&exchange, "100009");

    let err = huobi.market_sell("0", "", &btc_usdt()).await.unwrap_err();
    assert_eq!(err.api_code(), Some("invalid-amount"));
}

#[tokio::test]
async fn test_orders_need_an_account_id() {
    let exchange = CannedExchange::default();
    let huobi = connector(&exchange, "");

    let err = huobi.limit_sell("1", "1", &btc_usdt()).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidParameters(_)));
    assert!(exchange.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_one_order_normalizes_fields() {
    let exchange = CannedExchange::new(vec![(
        "/v1/order/orders/59378",
        json!({"status": "ok", "data": {
            "id": 59378,
            "symbol": "btcusdt",
            "type": "sell-limit",
            "amount": "2.0",
            "price": "100.0",
            "field-amount": "2.0",
            "field-cash-amount": "200.4",
            "field-fees": "0.4",
            "created-at": 1494901162595_i64,
            "state": "filled"
        }}),
    )]);
    let huobi = connector(&exchange, "1");

    let order = huobi.get_one_order("59378", &btc_usdt()).await.unwrap();
    assert_eq!(order.side, OrderSide::Sell);
    assert_eq!(order.status, OrderStatus::Finished);
    assert_eq!(order.avg_price, dec("100.2"));
    assert_eq!(order.fee, dec("0.4"));
    assert_eq!(order.order_time, 1_494_901_162_595);
    assert_eq!(order.pair, btc_usdt());
}

#[tokio::test]
async fn test_unfinished_orders_query() {
    let exchange = CannedExchange::new(vec![(
        "/v1/order/orders",
        json!({"status": "ok", "data": [{
            "id": "1", "type": "buy-market", "amount": "10", "price": "0",
            "field-amount": "0", "field-cash-amount": "0", "field-fees": "0",
            "created-at": 1, "state": "submitted"
        }]}),
    )]);
    let huobi = connector(&exchange, "1");

    let orders = huobi.get_unfinished_orders(&btc_usdt()).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::BuyMarket);
    assert_eq!(orders[0].avg_price, Decimal::ZERO);

    let params = exchange.params_of("/v1/order/orders");
    assert!(params.contains(&(
        "states".to_string(),
        "pre-submitted,submitted,partial-filled".to_string()
    )));
    assert!(params.contains(&("size".to_string(), "100".to_string())));
}

#[tokio::test]
async fn test_cancel_order() {
    let exchange = CannedExchange::new(vec![(
        "/v1/order/orders/59378/submitcancel",
        json!({"status": "ok", "data": "59378"}),
    )]);
    let huobi = connector(&exchange, "1");

    assert!(huobi.cancel_order("59378", &btc_usdt()).await.unwrap());
}

#[tokio::test]
async fn test_account_balances_fold_by_currency() {
    let exchange = CannedExchange::new(vec![(
        "/v1/account/accounts/100009/balance",
        json!({"status": "ok", "data": {
            "id": 100009, "type": "spot", "state": "working",
            "list": [
                {"currency": "usdt", "type": "trade", "balance": "500.009"},
                {"currency": "usdt", "type": "frozen", "balance": "10"},
                {"currency": "btc", "type": "trade", "balance": "0.5"}
            ]
        }}),
    )]);
    let huobi = connector(&exchange, "100009");

    let account = huobi.get_account().await.unwrap();
    assert_eq!(account.account_id, "100009");
    let usdt = &account.sub_accounts[&Currency::new("usdt")];
    assert_eq!(usdt.amount, dec("500.009"));
    assert_eq!(usdt.frozen_amount, dec("10"));
    assert_eq!(account.sub_accounts.len(), 2);
}

#[tokio::test]
async fn test_account_info_by_type() {
    let exchange = CannedExchange::new(vec![(
        "/v1/account/accounts",
        json!({"status": "ok", "data": [
            {"id": 100009, "type": "spot", "state": "working"},
            {"id": 100010, "type": "point", "state": "lock"}
        ]}),
    )]);
    let huobi = connector(&exchange, "");

    let point = huobi.get_account_info(AccountType::Point).await.unwrap();
    assert_eq!(point.id, "100010");
    assert_eq!(point.state, "lock");

    let exchange = CannedExchange::new(vec![(
        "/v1/account/accounts",
        json!({"status": "ok", "data": [{"id": 1, "type": "otc", "state": "working"}]}),
    )]);
    let err = connector(&exchange, "")
        .get_account_info(AccountType::Spot)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::AccountNotFound(_)));
}

#[tokio::test]
async fn test_ticker_from_merged_detail() {
    let exchange = CannedExchange::new(vec![(
        "/market/detail/merged",
        json!({"status": "ok", "ts": 1630000000000_u64, "tick": {
            "close": 100, "low": 90, "high": 110, "amount": 500, "vol": 50000,
            "bid": [99.5, 3], "ask": [100.5, 4]
        }}),
    )]);
    let huobi = connector(&exchange, "");

    let ticker = huobi.get_ticker(&btc_usdt()).await.unwrap();
    assert_eq!(ticker.last, dec("100"));
    assert_eq!(ticker.low, dec("90"));
    assert_eq!(ticker.high, dec("110"));
    assert_eq!(ticker.vol, dec("500"));
    assert_eq!(ticker.buy, dec("99.5"));
    assert_eq!(ticker.sell, dec("100.5"));
    assert_eq!(ticker.date, 1_630_000_000_000);
}

#[tokio::test]
async fn test_depth_is_truncated_per_side() {
    let exchange = CannedExchange::new(vec![(
        "/market/depth",
        json!({"status": "ok", "ts": 1, "tick": {
            "bids": [[99, 1], [98, 2], [97, 3]],
            "asks": [[100, 1], [101, 2], [102, 3]]
        }}),
    )]);
    let huobi = connector(&exchange, "");

    let depth = huobi.get_depth(2, &btc_usdt()).await.unwrap();
    let asks: Vec<_> = depth.ask_list.iter().map(|l| l.price).collect();
    let bids: Vec<_> = depth.bid_list.iter().map(|l| l.price).collect();
    assert_eq!(asks, vec![dec("101"), dec("100")]);
    assert_eq!(bids, vec![dec("99"), dec("98")]);

    let params = exchange.params_of("/market/depth");
    assert!(params.contains(&("type".to_string(), "step0".to_string())));
}

#[tokio::test]
async fn test_kline_history() {
    let exchange = CannedExchange::new(vec![(
        "/market/history/kline",
        json!({"status": "ok", "data": [
            {"id": 1630000800, "open": 2, "close": 3, "high": 4, "low": 1, "vol": 10, "amount": 5},
            {"id": 1630000740, "open": 1, "close": 2, "high": 3, "low": 1, "vol": 8, "amount": 4}
        ]}),
    )]);
    let huobi = connector(&exchange, "");

    let klines = huobi
        .get_kline_records(&btc_usdt(), KlinePeriod::Min1, 2)
        .await
        .unwrap();
    assert_eq!(klines.len(), 2);
    assert_eq!(klines[0].timestamp, 1_630_000_800);
    assert_eq!(klines[0].close, dec("3"));

    let params = exchange.params_of("/market/history/kline");
    assert!(params.contains(&("period".to_string(), "1min".to_string())));
    assert!(params.contains(&("size".to_string(), "2".to_string())));
}

#[tokio::test]
async fn test_trade_history_dedups_ids() {
    let exchange = CannedExchange::new(vec![(
        "/market/history/trade",
        json!({"status": "ok", "data": [
            {"id": 1, "ts": 10, "data": [
                {"id": "102080928413587563418", "amount": 1, "price": 10, "ts": 10, "direction": "buy"},
                {"id": "102080928413587563418", "amount": 2, "price": 11, "ts": 10, "direction": "buy"}
            ]},
            {"id": 2, "ts": 9, "data": [
                {"id": 7, "amount": 3, "price": 9, "ts": 9, "direction": "sell"}
            ]}
        ]}),
    )]);
    let huobi = connector(&exchange, "");

    let trades = huobi.get_trades(&btc_usdt(), 2).await.unwrap();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].tid, "102080928413587563418");
    assert_eq!(trades[0].amount, dec("2"));
    assert_eq!(trades[1].side, TradeSide::Sell);
}

#[tokio::test]
async fn test_symbols_and_currencies() {
    let exchange = CannedExchange::new(vec![
        (
            "/v1/common/symbols",
            json!({"status": "ok", "data": [{
                "base-currency": "btc", "quote-currency": "usdt",
                "price-precision": 2, "amount-precision": 6,
                "symbol-partition": "main", "symbol": "btcusdt"
            }]}),
        ),
        (
            "/v1/common/currencys",
            json!({"status": "ok", "data": ["btc", "usdt", "ht"]}),
        ),
    ]);
    let huobi = connector(&exchange, "");

    let symbols = huobi.get_symbols().await.unwrap();
    assert_eq!(symbols[0].pair, btc_usdt());
    assert_eq!(symbols[0].price_precision, 2);
    assert_eq!(symbols[0].amount_precision, 6);
    assert_eq!(symbols[0].partition, "main");

    let currencies = huobi.get_currencies().await.unwrap();
    assert_eq!(currencies, vec!["btc", "usdt", "ht"]);
}

#[tokio::test]
async fn test_transport_errors_propagate() {
    let exchange = CannedExchange::default();
    let huobi = connector(&exchange, "");

    let err = huobi.get_ticker(&btc_usdt()).await.unwrap_err();
    assert!(matches!(err, ExchangeError::HttpStatus { status: 404, .. }));
}

#[test]
fn test_read_only_config_has_no_credentials() {
    assert!(!ExchangeConfig::read_only().has_credentials());
}
