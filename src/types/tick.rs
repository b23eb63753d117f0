use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;

use super::parse_price;

pub const DEFAULT_TICK_CAPACITY: usize = 60;

/// One external market price sample.
///
/// The ticker payload carries more fields (`bid`, `ask`, `volume`, ...);
/// only `time` and `price` are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: String,
    pub price: String,
}

impl Tick {
    #[cfg(test)]
    pub fn new(time: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            price: price.into(),
        }
    }

    pub fn price_f64(&self) -> Option<f64> {
        parse_price(&self.price)
    }

    pub fn price_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(self.price.replace('"', "").trim()).ok()
    }
}

/// Fixed-capacity FIFO ring of ticks. `len()` never exceeds the capacity.
#[derive(Debug, Clone)]
pub struct TickBuffer {
    ticks: VecDeque<Tick>,
    capacity: usize,
}

impl TickBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `tick`, evicting the oldest entry when full.
    pub fn push(&mut self, tick: Tick) -> Option<Tick> {
        let evicted = if self.ticks.len() >= self.capacity {
            self.ticks.pop_front()
        } else {
            None
        };
        self.ticks.push_back(tick);
        evicted
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn last(&self) -> Option<&Tick> {
        self.ticks.back()
    }

    pub fn to_vec(&self) -> Vec<Tick> {
        self.ticks.iter().cloned().collect()
    }

    pub fn times(&self) -> Vec<String> {
        self.ticks.iter().map(|t| t.time.clone()).collect()
    }

    /// Prices as floats; unparseable prices become NaN so positions line up with `times()`.
    pub fn prices(&self) -> Vec<f64> {
        self.ticks
            .iter()
            .map(|t| t.price_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

impl Default for TickBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_CAPACITY)
    }
}
