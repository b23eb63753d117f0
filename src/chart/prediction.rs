use serde::Serialize;
use std::collections::BTreeSet;

use super::{min_max, padded_range};
use crate::types::{PricePoint, Signal};

pub const DEFAULT_TRUNCATE_TAIL: usize = 40;
pub const DEFAULT_PADDING_PCT: f64 = 5.0;

/// Two price series aligned on a shared, sorted time axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedSeries {
    pub times: Vec<String>,
    pub historic: Vec<Option<f64>>,
    pub future: Vec<Option<f64>>,
}

impl CombinedSeries {
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Joins the two lines at the seam: at the first gap in `historic`, the
    /// preceding historic value is copied into `future` so the dashed line
    /// starts where the solid one ends. Returns the index written, if any.
    pub fn bridge_seam(&mut self) -> Option<usize> {
        let gap = self.historic.iter().position(Option::is_none)?;
        if gap == 0 {
            return None;
        }
        let seam = gap - 1;
        self.future[seam] = self.historic[seam];
        Some(seam)
    }
}

/// Merges `historic` and `future` on the union of their timestamps.
///
/// Timestamps are sorted lexicographically; a series missing a timestamp
/// gets a gap there. The last `truncate_tail` points are dropped from all
/// three sequences.
pub fn combine_datasets(
    historic: &[PricePoint],
    future: &[PricePoint],
    truncate_tail: usize,
) -> CombinedSeries {
    let times: BTreeSet<&str> = historic
        .iter()
        .chain(future.iter())
        .map(|p| p.time.as_str())
        .collect();

    let keep = times.len().saturating_sub(truncate_tail);
    let times: Vec<String> = times.into_iter().take(keep).map(str::to_string).collect();

    let lookup = |series: &[PricePoint], time: &str| -> Option<f64> {
        series.iter().find(|p| p.time == time).and_then(PricePoint::value)
    };

    let historic_values = times.iter().map(|t| lookup(historic, t)).collect();
    let future_values = times.iter().map(|t| lookup(future, t)).collect();

    CombinedSeries {
        times,
        historic: historic_values,
        future: future_values,
    }
}

/// Everything the prediction line chart needs for one signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionChart {
    pub series: CombinedSeries,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl PredictionChart {
    pub fn build(
        historic: &[PricePoint],
        future: &[PricePoint],
        truncate_tail: usize,
        padding_pct: f64,
    ) -> Self {
        let mut series = combine_datasets(historic, future, truncate_tail);
        if series.is_empty() {
            return Self::default();
        }
        let range = min_max(&series.historic, &series.future)
            .map(|(lo, hi)| padded_range(lo, hi, padding_pct));
        series.bridge_seam();

        Self {
            series,
            y_min: range.map(|r| r.0),
            y_max: range.map(|r| r.1),
        }
    }

    /// Chart for the current (newest) signal, empty when there is none.
    pub fn for_current(signals: &[Signal], truncate_tail: usize, padding_pct: f64) -> Self {
        match signals.first() {
            Some(current) => Self::build(
                &current.historical_prices,
                &current.future_prices,
                truncate_tail,
                padding_pct,
            ),
            None => Self::default(),
        }
    }
}
