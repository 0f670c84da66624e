//! Generated bucket boundaries for server-side percentile aggregation

use once_cell::sync::Lazy;

/// Boundaries from 1 to `u64::MAX`: within each power-of-four band the step is
/// a third of the band's base, which keeps relative error roughly constant.
static PERCENTILE_BUCKETS: Lazy<Vec<u64>> = Lazy::new(|| {
    let mut buckets = vec![1, 2, 3];
    let mut exp = 2;
    while exp < 64 {
        let mut current: u64 = 1 << exp;
        let delta = current / 3;
        let Some(band_top) = current.checked_mul(4) else {
            break;
        };
        let next = band_top - delta;
        while current < next {
            buckets.push(current);
            current += delta;
        }
        exp += 2;
    }
    buckets.push(u64::MAX);
    buckets
});

/// Generated boundaries clamped to `[min, max]`
pub fn percentile_histogram_buckets(min: f64, max: f64) -> Vec<f64> {
    PERCENTILE_BUCKETS
        .iter()
        .map(|b| *b as f64)
        .filter(|b| *b >= min && *b <= max)
        .collect()
}
