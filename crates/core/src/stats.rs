/// Mean and sample standard deviation of a set of depths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
}

impl DepthStats {
    /// Two-pass sample statistics (divisor `n - 1`). Returns `None` for an
    /// empty input; a single value has a standard deviation of zero.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let iter = values.into_iter();
        let mut count = 0usize;
        let mut sum = 0.0;
        for value in iter.clone() {
            sum += value;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let mean = sum / count as f64;
        if count == 1 {
            return Some(Self {
                count,
                mean,
                std: 0.0,
            });
        }
        let sum_sq: f64 = iter.map(|value| (value - mean) * (value - mean)).sum();
        let std = (sum_sq / (count - 1) as f64).sqrt();
        Some(Self { count, mean, std })
    }
}
