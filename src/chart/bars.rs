use serde::Serialize;

use crate::types::TickBuffer;

pub const DEFAULT_BAR_MIN: f64 = 10.0;
pub const DEFAULT_BAR_MAX: f64 = 100.0;

/// Linear min-max rescaling of `data` into `[new_min, new_max]`.
///
/// NaN inputs are ignored when finding the range. A series with zero
/// variance has no defined scale and maps every element to NaN.
pub fn normalize(data: &[f64], new_min: f64, new_max: f64) -> Vec<f64> {
    let (old_min, old_max) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    data.iter()
        .map(|&v| ((v - old_min) / (old_max - old_min)) * (new_max - new_min) + new_min)
        .collect()
}

/// Bar heights for the live tick chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickBars {
    pub times: Vec<String>,
    pub heights: Vec<f64>,
}

impl TickBars {
    pub fn from_buffer(buffer: &TickBuffer, bar_min: f64, bar_max: f64) -> Self {
        if buffer.is_empty() {
            return Self::default();
        }
        Self {
            times: buffer.times(),
            heights: normalize(&buffer.prices(), bar_min, bar_max),
        }
    }

    /// Heights with NaN replaced by `None`, which serializes as `null`.
    pub fn heights_or_gaps(&self) -> Vec<Option<f64>> {
        self.heights
            .iter()
            .map(|h| if h.is_finite() { Some(*h) } else { None })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tick;

    #[test]
    fn test_normalize_maps_extremes() {
        let data = vec![64010.0, 64000.0, 64025.5, 64005.0];
        let out = normalize(&data, DEFAULT_BAR_MIN, DEFAULT_BAR_MAX);

        assert_eq!(out.len(), data.len());
        assert!((out[1] - 10.0).abs() < 1e-9);
        assert!((out[2] - 100.0).abs() < 1e-9);
        assert!(out.iter().all(|v| *v >= 10.0 && *v <= 100.0));
    }

    #[test]
    fn test_normalize_arbitrary_range() {
        let out = normalize(&[0.0, 5.0, 10.0], -1.0, 1.0);
        assert_eq!(out, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normalize_zero_variance_is_nan() {
        let out = normalize(&[42.0, 42.0, 42.0], 10.0, 100.0);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(&[], 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_tick_bars_from_buffer() {
        let mut buffer = TickBuffer::new(5);
        buffer.push(Tick::new("t1", "100"));
        buffer.push(Tick::new("t2", "200"));

        let bars = TickBars::from_buffer(&buffer, DEFAULT_BAR_MIN, DEFAULT_BAR_MAX);

        assert_eq!(bars.times, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(bars.heights, vec![10.0, 100.0]);
        assert_eq!(bars.heights_or_gaps(), vec![Some(10.0), Some(100.0)]);
    }

    #[test]
    fn test_single_tick_renders_as_gap() {
        let mut buffer = TickBuffer::new(5);
        buffer.push(Tick::new("t1", "100"));
        let bars = TickBars::from_buffer(&buffer, DEFAULT_BAR_MIN, DEFAULT_BAR_MAX);
        assert_eq!(bars.heights_or_gaps(), vec![None]);
    }

    #[test]
    fn test_empty_buffer_has_no_bars() {
        let bars = TickBars::from_buffer(&TickBuffer::new(5), DEFAULT_BAR_MIN, DEFAULT_BAR_MAX);
        assert_eq!(bars, TickBars::default());
    }
}
