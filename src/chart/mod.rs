pub mod prediction;
pub mod bars;

pub use prediction::*;
pub use bars::*;

/// Smallest and largest non-gap value across both series.
pub fn min_max(a: &[Option<f64>], b: &[Option<f64>]) -> Option<(f64, f64)> {
    a.iter()
        .chain(b.iter())
        .filter_map(|v| *v)
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Widens `[min, max]` by `pct` percent of the span on each side.
pub fn padded_range(min: f64, max: f64, pct: f64) -> (f64, f64) {
    let pad = (pct / 100.0) * (max - min);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_skips_gaps() {
        let a = vec![Some(100.0), None, Some(90.0)];
        let b = vec![None, Some(120.0), None];
        assert_eq!(min_max(&a, &b), Some((90.0, 120.0)));
    }

    #[test]
    fn test_min_max_all_gaps() {
        assert_eq!(min_max(&[None, None], &[]), None);
        assert_eq!(min_max(&[], &[]), None);
    }

    #[test]
    fn test_padded_range_five_percent() {
        let (lo, hi) = padded_range(100.0, 200.0, 5.0);
        assert!((lo - 95.0).abs() < 1e-9);
        assert!((hi - 205.0).abs() < 1e-9);

        let (lo, hi) = padded_range(50.0, 50.0, 5.0);
        assert_eq!((lo, hi), (50.0, 50.0));
    }
}
