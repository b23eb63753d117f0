use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::SignalKind;

/// One `{time, price}` sample of a signal's price context.
///
/// The backend emits prices as strings (sometimes wrapped in literal quote
/// characters) or as plain numbers; both are kept as text and parsed on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: String,
    #[serde(deserialize_with = "deserialize_price_text")]
    pub price: String,
}

impl PricePoint {
    #[cfg(test)]
    pub fn new(time: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            price: price.into(),
        }
    }

    pub fn value(&self) -> Option<f64> {
        parse_price(&self.price)
    }
}

/// Strips embedded quotes and parses the remainder as a float.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.replace('"', "").trim().parse::<f64>().ok()
}

fn deserialize_price_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawPrice::deserialize(deserializer)? {
        RawPrice::Text(s) => s,
        RawPrice::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal: SignalKind,
    pub time: String,
    #[serde(default)]
    pub profit: Decimal,
    #[serde(default)]
    pub historical_prices: Vec<PricePoint>,
    #[serde(default)]
    pub future_prices: Vec<PricePoint>,
}

impl Signal {
    /// Profit column of the feed. Only a Sell carries a meaningful value.
    pub fn profit_label(&self) -> String {
        if self.signal == SignalKind::Sell {
            format!("{}%", self.profit.normalize())
        } else {
            "-".to_string()
        }
    }
}

/// `signal_data` as the backend sends it: a list, or a placeholder string
/// such as `"No Signals."` when nothing has been predicted yet.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignalData {
    List(Vec<Signal>),
    Placeholder(String),
}

/// Body of `GET /signals` and of every `/ws` frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalsResponse {
    #[serde(default)]
    pub signal_data: Option<SignalData>,
}

impl SignalsResponse {
    /// Signals newest-first. The backend orders them oldest-first.
    ///
    /// `None` when the payload carries no `signal_data` at all (status frames).
    pub fn into_display_order(self) -> Option<Vec<Signal>> {
        match self.signal_data? {
            SignalData::List(mut signals) => {
                signals.reverse();
                Some(signals)
            }
            SignalData::Placeholder(_) => Some(Vec::new()),
        }
    }
}
