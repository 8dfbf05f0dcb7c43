use super::types::{
    HuobiBalance, HuobiDepthTick, HuobiKline, HuobiMergedTick, HuobiOrder, HuobiSymbol,
    HuobiTickerTick, HuobiTrade,
};
use crate::core::errors::ExchangeError;
use crate::core::types::conversion::RawLevel;
use crate::core::types::{
    Account, Currency, CurrencyPair, Depth, DepthLevel, Kline, Order, OrderSide, OrderStatus,
    SubAccount, SymbolInfo, Ticker, Trade, TradeSide,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

pub const EXCHANGE_NAME: &str = "huobi.pro";
pub const ACCOUNT_WORKING: &str = "working";

/// Decode a loosely typed payload, naming what failed
pub fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value)
        .map_err(|e| ExchangeError::MalformedResponse(format!("{}: {}", what, e)))
}

pub fn convert_ticker(tick: HuobiTickerTick, pair: CurrencyPair, ts: u64) -> Ticker {
    Ticker {
        pair,
        last: tick.close,
        high: tick.high,
        low: tick.low,
        vol: tick.vol,
        date: ts,
        ..Ticker::default()
    }
}

pub fn convert_merged_ticker(tick: HuobiMergedTick, pair: CurrencyPair, ts: u64) -> Ticker {
    Ticker {
        pair,
        last: tick.close,
        buy: tick.bid.0,
        sell: tick.ask.0,
        high: tick.high,
        low: tick.low,
        vol: tick.amount,
        date: ts,
    }
}

/// Asks come back highest price first; bids keep the exchange order
pub fn convert_depth(tick: HuobiDepthTick, pair: CurrencyPair) -> Depth {
    let to_levels = |levels: Vec<RawLevel>| -> Vec<DepthLevel> {
        levels
            .into_iter()
            .map(|RawLevel(price, amount)| DepthLevel { price, amount })
            .collect()
    };

    let mut ask_list = to_levels(tick.asks);
    ask_list.sort_by(|a, b| b.price.cmp(&a.price));

    Depth {
        pair,
        ask_list,
        bid_list: to_levels(tick.bids),
    }
}

/// Keep the `size` best levels per side; zero keeps everything
pub fn truncate_depth(mut depth: Depth, size: usize) -> Depth {
    if size == 0 {
        return depth;
    }
    depth.bid_list.truncate(size);
    // best asks sit at the end of the descending list
    if depth.ask_list.len() > size {
        let excess = depth.ask_list.len() - size;
        depth.ask_list.drain(..excess);
    }
    depth
}

/// Normalize a batch of fills, collapsing repeated ids
///
/// A repeated id keeps the position of its first appearance and the fields of
/// its last one.
pub fn convert_trades(batch: Vec<HuobiTrade>, pair: &CurrencyPair) -> Vec<Trade> {
    let mut trades: Vec<Trade> = Vec::with_capacity(batch.len());
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(batch.len());

    for raw in batch {
        let trade = Trade {
            tid: raw.id,
            pair: pair.clone(),
            side: if raw.direction == "buy" {
                TradeSide::Buy
            } else {
                TradeSide::Sell
            },
            amount: raw.amount,
            price: raw.price,
            date: raw.ts,
        };

        match seen.get(&trade.tid) {
            Some(&index) => trades[index] = trade,
            None => {
                seen.insert(trade.tid.clone(), trades.len());
                trades.push(trade);
            }
        }
    }

    trades
}

pub fn convert_kline(raw: HuobiKline, pair: CurrencyPair) -> Kline {
    Kline {
        pair,
        timestamp: raw.id,
        open: raw.open,
        close: raw.close,
        high: raw.high,
        low: raw.low,
        vol: raw.vol,
    }
}

/// Order side from the exchange order type (`buy-limit`, `sell-market`, ...)
pub fn side_from_order_type(order_type: &str) -> Option<OrderSide> {
    let is_market = order_type.contains("market");
    if order_type.starts_with("buy") {
        Some(if is_market { OrderSide::BuyMarket } else { OrderSide::Buy })
    } else if order_type.starts_with("sell") {
        Some(if is_market { OrderSide::SellMarket } else { OrderSide::Sell })
    } else {
        None
    }
}

pub fn status_from_state(state: &str) -> OrderStatus {
    match state {
        "filled" => OrderStatus::Finished,
        "partial-filled" => OrderStatus::PartiallyFinished,
        "canceled" | "partial-canceled" => OrderStatus::Canceled,
        // submitted, pre-submitted and anything unknown
        _ => OrderStatus::Unfinished,
    }
}

pub fn convert_order(raw: HuobiOrder, pair: CurrencyPair) -> Result<Order, ExchangeError> {
    let order_id = raw.id.parse::<u64>().map_err(|_| {
        ExchangeError::MalformedResponse(format!("order id is not numeric: {}", raw.id))
    })?;
    let side = side_from_order_type(&raw.order_type).ok_or_else(|| {
        ExchangeError::MalformedResponse(format!("unknown order type: {}", raw.order_type))
    })?;

    let avg_price = if raw.field_amount > Decimal::ZERO {
        raw.field_cash_amount
            .checked_div(raw.field_amount)
            .unwrap_or_default()
    } else {
        Decimal::ZERO
    };

    Ok(Order {
        order_id,
        order_id_str: raw.id,
        pair,
        side,
        amount: raw.amount,
        price: raw.price,
        deal_amount: raw.field_amount,
        fee: raw.field_fees,
        avg_price,
        status: status_from_state(&raw.state),
        order_time: raw.created_at,
    })
}

/// Fold balance lines into one entry per currency
pub fn convert_account(balance: HuobiBalance) -> Result<Account, ExchangeError> {
    if balance.state != ACCOUNT_WORKING {
        return Err(ExchangeError::AccountState {
            account_id: balance.id,
            state: balance.state,
        });
    }

    let mut sub_accounts: HashMap<Currency, SubAccount> = HashMap::new();
    for item in balance.list {
        let currency = Currency::new(&item.currency);
        let entry = sub_accounts
            .entry(currency.clone())
            .or_insert_with(|| SubAccount {
                currency,
                ..SubAccount::default()
            });
        match item.balance_type.as_str() {
            "trade" => entry.amount = item.balance,
            "frozen" => entry.frozen_amount = item.balance,
            _ => {}
        }
    }

    Ok(Account {
        exchange: EXCHANGE_NAME.to_string(),
        account_id: balance.id,
        sub_accounts,
    })
}

pub fn convert_symbol(raw: HuobiSymbol) -> SymbolInfo {
    SymbolInfo {
        pair: CurrencyPair::from_parts(
            Currency::new(&raw.base_currency),
            Currency::new(&raw.quote_currency),
        ),
        symbol: raw.symbol,
        price_precision: u32::try_from(raw.price_precision).unwrap_or_default(),
        amount_precision: u32::try_from(raw.amount_precision).unwrap_or_default(),
        partition: raw.symbol_partition,
    }
}
