use crate::core::types::{Currency, CurrencyPair, KlinePeriod};

/// Quote currencies recognised at the end of a market symbol, checked in order
pub const QUOTE_SUFFIXES: [&str; 5] = ["usdt", "husd", "btc", "eth", "ht"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Ticker,
    Depth,
    Trade,
    Kline,
    OrderUpdate,
}

/// A channel name resolved to its category and market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: ChannelKind,
    pub symbol: String,
    pub pair: CurrencyPair,
}

struct ChannelPattern {
    prefix: &'static str,
    marker: &'static str,
    /// Whether the marker has to end the channel name
    terminal: bool,
    kind: ChannelKind,
}

// First match wins; trade must precede ticker since both end in `.detail`.
const PATTERNS: [ChannelPattern; 5] = [
    ChannelPattern {
        prefix: "market.",
        marker: ".kline.",
        terminal: false,
        kind: ChannelKind::Kline,
    },
    ChannelPattern {
        prefix: "market.",
        marker: ".depth.",
        terminal: false,
        kind: ChannelKind::Depth,
    },
    ChannelPattern {
        prefix: "market.",
        marker: ".trade.detail",
        terminal: true,
        kind: ChannelKind::Trade,
    },
    ChannelPattern {
        prefix: "market.",
        marker: ".detail",
        terminal: true,
        kind: ChannelKind::Ticker,
    },
    ChannelPattern {
        prefix: "orders.",
        marker: "",
        terminal: true,
        kind: ChannelKind::OrderUpdate,
    },
];

impl ChannelPattern {
    fn extract<'a>(&self, channel: &'a str) -> Option<&'a str> {
        let rest = channel.strip_prefix(self.prefix)?;
        let symbol = if self.marker.is_empty() {
            rest
        } else if self.terminal {
            rest.strip_suffix(self.marker)?
        } else {
            let at = rest.rfind(self.marker)?;
            if at + self.marker.len() == rest.len() {
                return None;
            }
            &rest[..at]
        };

        if symbol.is_empty() || symbol.contains('.') {
            None
        } else {
            Some(symbol)
        }
    }
}

/// Resolve a channel name, `None` when no known pattern matches
pub fn route(channel: &str) -> Option<Route> {
    PATTERNS.iter().find_map(|pattern| {
        pattern.extract(channel).map(|symbol| Route {
            kind: pattern.kind,
            symbol: symbol.to_string(),
            pair: split_symbol(symbol),
        })
    })
}

/// Market of a channel, or the empty pair when the channel is not recognised
pub fn pair_from_channel(channel: &str) -> CurrencyPair {
    route(channel).map_or_else(CurrencyPair::empty, |r| r.pair)
}

/// Split a lowercase market symbol into base and quote
///
/// An unknown quote leaves the whole symbol as base and an empty quote.
pub fn split_symbol(symbol: &str) -> CurrencyPair {
    let quote = QUOTE_SUFFIXES
        .iter()
        .find(|suffix| symbol.len() > suffix.len() && symbol.ends_with(*suffix))
        .copied()
        .unwrap_or("");
    let base = &symbol[..symbol.len() - quote.len()];

    CurrencyPair::from_parts(Currency::new(base), Currency::new(quote))
}

pub fn ticker_channel(pair: &CurrencyPair) -> String {
    format!("market.{}.detail", pair.to_symbol())
}

pub fn depth_channel(pair: &CurrencyPair) -> String {
    format!("market.{}.depth.step0", pair.to_symbol())
}

pub fn trade_channel(pair: &CurrencyPair) -> String {
    format!("market.{}.trade.detail", pair.to_symbol())
}

pub fn kline_channel(pair: &CurrencyPair, period: KlinePeriod) -> String {
    format!("market.{}.kline.{}", pair.to_symbol(), period.as_str())
}
