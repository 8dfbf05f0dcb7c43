use crate::core::types::{Depth, Kline, Ticker, Trade};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Channel name to callback, one per channel
pub struct HandlerRegistry<T> {
    handlers: RwLock<HashMap<String, Callback<T>>>,
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> HandlerRegistry<T> {
    /// Register a callback; returns true when it replaced an earlier one
    pub fn insert(&self, channel: impl Into<String>, callback: Callback<T>) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.into(), callback)
            .is_some()
    }

    /// Callback for an exact channel name
    ///
    /// The lock is released before returning so the caller can run the
    /// callback while other tasks register.
    pub fn get(&self, channel: &str) -> Option<Callback<T>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(channel)
    }

    pub fn channels(&self) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-category callback tables consulted by the session
#[derive(Default)]
pub struct SubscriptionRegistry {
    pub ticker: HandlerRegistry<Ticker>,
    pub depth: HandlerRegistry<Depth>,
    pub trade: HandlerRegistry<Trade>,
    pub kline: HandlerRegistry<Kline>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}
