use crate::core::types::conversion::{de, RawLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Entry of `GET /v1/account/accounts`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HuobiAccount {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub state: String,
}

/// `GET /v1/account/accounts/{id}/balance`
#[derive(Debug, Clone, Deserialize)]
pub struct HuobiBalance {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub account_type: String,
    pub state: String,
    #[serde(default)]
    pub list: Vec<HuobiBalanceItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HuobiBalanceItem {
    pub currency: String,
    /// `trade` (available) or `frozen`
    #[serde(rename = "type")]
    pub balance_type: String,
    #[serde(deserialize_with = "de::decimal")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HuobiOrder {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(deserialize_with = "de::decimal")]
    pub amount: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub price: Decimal,
    #[serde(alias = "filled-amount", deserialize_with = "de::decimal")]
    pub field_amount: Decimal,
    #[serde(alias = "filled-cash-amount", deserialize_with = "de::decimal")]
    pub field_cash_amount: Decimal,
    #[serde(alias = "filled-fees", deserialize_with = "de::decimal")]
    pub field_fees: Decimal,
    #[serde(deserialize_with = "de::int64")]
    pub created_at: i64,
    pub state: String,
}

/// `tick` of `market.<symbol>.detail`
#[derive(Debug, Clone, Deserialize)]
pub struct HuobiTickerTick {
    #[serde(deserialize_with = "de::decimal")]
    pub close: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub low: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub high: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub vol: Decimal,
}

/// `tick` of `GET /market/detail/merged`
#[derive(Debug, Clone, Deserialize)]
pub struct HuobiMergedTick {
    #[serde(deserialize_with = "de::decimal")]
    pub close: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub low: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub high: Decimal,
    /// Base currency volume; `vol` on this endpoint is quote volume
    #[serde(deserialize_with = "de::decimal")]
    pub amount: Decimal,
    pub bid: RawLevel,
    pub ask: RawLevel,
}

/// `tick` of depth snapshots, pushed and polled alike
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HuobiDepthTick {
    #[serde(default)]
    pub bids: Vec<RawLevel>,
    #[serde(default)]
    pub asks: Vec<RawLevel>,
}

/// One batch of fills; `tick` of `market.<symbol>.trade.detail`
#[derive(Debug, Clone, Deserialize)]
pub struct HuobiTradeTick {
    #[serde(default)]
    pub data: Vec<HuobiTrade>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HuobiTrade {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(deserialize_with = "de::decimal")]
    pub amount: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub price: Decimal,
    #[serde(deserialize_with = "de::int64")]
    pub ts: i64,
    pub direction: String,
}

/// Candle; `id` is the bucket start in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct HuobiKline {
    #[serde(deserialize_with = "de::int64")]
    pub id: i64,
    #[serde(deserialize_with = "de::decimal")]
    pub open: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub close: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub high: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub low: Decimal,
    #[serde(deserialize_with = "de::decimal")]
    pub vol: Decimal,
}

/// Entry of `GET /v1/common/symbols`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HuobiSymbol {
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(deserialize_with = "de::int64")]
    pub price_precision: i64,
    #[serde(deserialize_with = "de::int64")]
    pub amount_precision: i64,
    #[serde(default)]
    pub symbol_partition: String,
    pub symbol: String,
}

/// Outbound subscribe frame
#[derive(Debug, Clone, Serialize)]
pub struct HuobiSubRequest<'a> {
    pub id: u64,
    pub sub: &'a str,
}
