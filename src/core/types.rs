use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Typed errors for the types subsystem
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),
    #[error("Invalid kline period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Parsing error: {0}")]
    ParseError(String),
}

/// Currency code, stored upper-case (`BTC`, `USDT`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A base/quote currency pair such as `BTC_USDT`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a pair, rejecting empty currencies
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Result<Self, TypesError> {
        let pair = Self::from_parts(Currency::new(base), Currency::new(quote));
        if !pair.is_valid() {
            return Err(TypesError::InvalidPair(
                "Base and quote currencies cannot be empty".to_string(),
            ));
        }
        Ok(pair)
    }

    /// Build a pair without validation; either side may be empty
    pub fn from_parts(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// The placeholder pair used when a channel cannot be classified
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        !self.base.is_empty() && !self.quote.is_empty()
    }

    /// Exchange symbol: lower-case base followed by quote (`btcusdt`)
    pub fn to_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote).to_lowercase()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = TypesError;

    /// Parse `BTC_USDT`, `btc/usdt` or `BTC-USDT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once(|c: char| c == '_' || c == '/' || c == '-')
            .ok_or_else(|| TypesError::InvalidPair(s.to_string()))?;
        Self::new(base, quote)
    }
}

/// Candle bucket sizes supported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlinePeriod {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
    Day1,
    Week1,
    Month1,
    Year1,
}

impl KlinePeriod {
    pub const ALL: [Self; 9] = [
        Self::Min1,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Min60,
        Self::Day1,
        Self::Week1,
        Self::Month1,
        Self::Year1,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Min60 => "60min",
            Self::Day1 => "1day",
            Self::Week1 => "1week",
            Self::Month1 => "1mon",
            Self::Year1 => "1year",
        }
    }
}

impl fmt::Display for KlinePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KlinePeriod {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| TypesError::InvalidPeriod(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
    BuyMarket,
    SellMarket,
}

impl OrderSide {
    /// Exchange order type string used when placing orders
    pub const fn order_type(self) -> &'static str {
        match self {
            Self::Buy => "buy-limit",
            Self::Sell => "sell-limit",
            Self::BuyMarket => "buy-market",
            Self::SellMarket => "sell-market",
        }
    }

    pub const fn is_market(self) -> bool {
        matches!(self, Self::BuyMarket | Self::SellMarket)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Unfinished,
    PartiallyFinished,
    Finished,
    Canceled,
}

/// Immutable snapshot of an order as last reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub order_id_str: String,
    pub pair: CurrencyPair,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub deal_amount: Decimal,
    pub fee: Decimal,
    pub avg_price: Decimal,
    pub status: OrderStatus,
    pub order_time: i64,
}

/// Which order states an order listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStateFilter {
    Unfinished,
    History,
}

impl OrderStateFilter {
    pub const fn states(self) -> &'static str {
        match self {
            Self::Unfinished => "pre-submitted,submitted,partial-filled",
            Self::History => "partial-canceled,filled",
        }
    }
}

/// Pagination direction for order listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Prev,
    Next,
}

impl PageDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Next => "next",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ticker {
    pub pair: CurrencyPair,
    pub last: Decimal,
    pub buy: Decimal,
    pub sell: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub vol: Decimal,
    pub date: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Depth {
    pub pair: CurrencyPair,
    pub ask_list: Vec<DepthLevel>,
    pub bid_list: Vec<DepthLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange trade id, kept as text since it can exceed 64 bits
    pub tid: String,
    pub pair: CurrencyPair,
    pub side: TradeSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub date: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub pair: CurrencyPair,
    pub timestamp: i64,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub vol: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Spot,
    Point,
}

impl AccountType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Point => "point",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub account_type: AccountType,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubAccount {
    pub currency: Currency,
    pub amount: Decimal,
    pub frozen_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub exchange: String,
    pub account_id: String,
    pub sub_accounts: HashMap<Currency, SubAccount>,
}

/// Trading rules for one listed symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub pair: CurrencyPair,
    pub symbol: String,
    pub price_precision: u32,
    pub amount_precision: u32,
    pub partition: String,
}

/// Coercion helpers between loosely typed JSON and domain values
pub mod conversion {
    use super::{Decimal, FromStr, TypesError};
    use serde::{de::Error as _, Deserialize, Deserializer};
    use serde_json::Value;

    /// Parse a decimal, accepting plain and scientific notation
    pub fn parse_decimal(s: &str) -> Result<Decimal, TypesError> {
        let s = s.trim();
        Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|_| TypesError::InvalidNumber(s.to_string()))
    }

    /// Accept a JSON number or numeric string
    pub fn value_to_decimal(value: &Value) -> Result<Decimal, TypesError> {
        match value {
            // with arbitrary precision enabled this is the literal from the wire
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            other => Err(TypesError::InvalidNumber(other.to_string())),
        }
    }

    /// Identifiers stay textual so they never pass through a float
    pub fn value_to_id(value: &Value) -> Result<String, TypesError> {
        match value {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            other => Err(TypesError::ParseError(format!("invalid identifier: {}", other))),
        }
    }

    pub fn value_to_i64(value: &Value) -> Result<i64, TypesError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| TypesError::InvalidNumber(n.to_string())),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| TypesError::InvalidNumber(s.clone())),
            other => Err(TypesError::InvalidNumber(other.to_string())),
        }
    }

    /// `deserialize_with` adapters built on the coercions above
    pub mod de {
        use super::{value_to_decimal, value_to_i64, value_to_id, Decimal};
        use super::{Deserialize, Deserializer, Value};
        use serde::de::Error as _;

        pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            value_to_decimal(&value).map_err(D::Error::custom)
        }

        /// Missing or null fields become `None`; use with `#[serde(default)]`
        pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Value::deserialize(deserializer)? {
                Value::Null => Ok(None),
                value => value_to_decimal(&value).map(Some).map_err(D::Error::custom),
            }
        }

        pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            value_to_id(&value).map_err(D::Error::custom)
        }

        pub fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            value_to_i64(&value).map_err(D::Error::custom)
        }
    }

    /// A `[price, amount]` pair as sent in depth snapshots
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RawLevel(pub Decimal, pub Decimal);

    impl<'de> Deserialize<'de> for RawLevel {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let items = Vec::<Value>::deserialize(deserializer)?;
            match items.as_slice() {
                [price, amount, ..] => Ok(Self(
                    value_to_decimal(price).map_err(D::Error::custom)?,
                    value_to_decimal(amount).map_err(D::Error::custom)?,
                )),
                _ => Err(D::Error::custom(format!(
                    "depth level needs price and amount, got {} items",
                    items.len()
                ))),
            }
        }
    }
}
