//! Log-linear frequency sketch used for client-side percentile estimation
//!
//! Values are counted into buckets that split every power of two between the
//! minimum and maximum expected value into `8 << precision` equal slices.
//! Slot 0 catches everything below the range and the last slot everything
//! above it, so memory stays bounded regardless of the recorded values.

const MAX_OCTAVES: i32 = 128;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SketchLayout {
    min_exponent: i32,
    octaves: usize,
    sub_buckets: usize,
}

impl SketchLayout {
    pub fn new(min_expected: f64, max_expected: f64, precision: u32) -> Self {
        let min = if min_expected.is_finite() && min_expected > 0.0 {
            min_expected
        } else {
            1.0
        };
        let max = if max_expected.is_finite() && max_expected > min {
            max_expected
        } else {
            min * 2.0
        };
        let min_exponent = min.log2().floor() as i32;
        let max_exponent = max.log2().ceil() as i32;
        let octaves = (max_exponent - min_exponent).clamp(1, MAX_OCTAVES) as usize;

        Self {
            min_exponent,
            octaves,
            sub_buckets: 8usize << precision.min(5),
        }
    }

    /// Number of counting slots, including the two overflow slots
    pub fn len(&self) -> usize {
        self.octaves * self.sub_buckets + 2
    }

    fn lowest(&self) -> f64 {
        2f64.powi(self.min_exponent)
    }

    fn highest(&self) -> f64 {
        2f64.powi(self.min_exponent + self.octaves as i32)
    }

    pub fn index_of(&self, value: f64) -> usize {
        if value.is_nan() || value < self.lowest() {
            return 0;
        }
        if value >= self.highest() {
            return self.len() - 1;
        }
        let mut exponent = value.log2().floor() as i32;
        if 2f64.powi(exponent) > value {
            exponent -= 1;
        } else if 2f64.powi(exponent + 1) <= value {
            exponent += 1;
        }
        let octave = ((exponent - self.min_exponent).max(0) as usize).min(self.octaves - 1);
        let base = 2f64.powi(self.min_exponent + octave as i32);
        let fraction = (value / base - 1.0).clamp(0.0, 1.0);
        let sub = ((fraction * self.sub_buckets as f64) as usize).min(self.sub_buckets - 1);
        1 + octave * self.sub_buckets + sub
    }

    /// Lower and upper edge of a slot
    pub fn bounds(&self, index: usize) -> (f64, f64) {
        if index == 0 {
            return (0.0, self.lowest());
        }
        if index >= self.len() - 1 {
            return (self.highest(), f64::INFINITY);
        }
        let octave = (index - 1) / self.sub_buckets;
        let sub = (index - 1) % self.sub_buckets;
        let base = 2f64.powi(self.min_exponent + octave as i32);
        let step = base / self.sub_buckets as f64;
        (base + step * sub as f64, base + step * (sub + 1) as f64)
    }

    /// Estimate the value at `percentile` (0.0..=1.0) by interpolating inside
    /// the slot that holds the target rank. The estimate never exceeds `max`.
    pub fn value_at(&self, counts: &[u64], percentile: f64, max: f64) -> Option<f64> {
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return None;
        }
        let target = percentile.clamp(0.0, 1.0) * total as f64;
        let mut cumulative = 0u64;

        for (index, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            if (cumulative + count) as f64 >= target {
                let (low, high) = self.bounds(index);
                let low = low.min(max);
                let high = high.min(max);
                let fraction = ((target - cumulative as f64) / count as f64).clamp(0.0, 1.0);
                return Some((low + (high - low) * fraction).min(max));
            }
            cumulative += count;
        }
        Some(max)
    }
}
