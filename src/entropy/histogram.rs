/// Number of histogram bins
pub const N_BIN: usize = 1024;
/// Offset added to every bin probability
pub const EPSILON: f64 = 1e-12;

/// Fixed range histogram
///
/// Values outside the range are not counted but the bin probabilities are
/// normalized by the total number of samples.
#[derive(Debug, Clone)]
pub struct Histogram {
    counts: Vec<usize>,
    range: (f64, f64),
    n_sample: usize,
}
impl Histogram {
    pub fn new(range: (f64, f64)) -> Self {
        Self {
            counts: vec![0; N_BIN],
            range,
            n_sample: 0,
        }
    }
    /// Adds a sample
    ///
    /// The last bin is closed on the right side: `range.1` goes into it.
    pub fn push(&mut self, value: f64) {
        self.n_sample += 1;
        let (lo, hi) = self.range;
        if !(lo..=hi).contains(&value) {
            return;
        }
        let bin = ((value - lo) / (hi - lo) * N_BIN as f64) as usize;
        self.counts[bin.min(N_BIN - 1)] += 1;
    }
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
    pub fn n_sample(&self) -> usize {
        self.n_sample
    }
    /// Bin probabilities, offset by [`EPSILON`]
    pub fn probabilities(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.n_sample.max(1) as f64;
        self.counts.iter().map(move |&c| c as f64 / n + EPSILON)
    }
    /// Shannon entropy `-Σ p log2(p)` of the bin probabilities
    pub fn shannon_entropy(&self) -> f64 {
        -self.probabilities().map(|p| p * p.log2()).sum::<f64>()
    }
}
impl Extend<f64> for Histogram {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        iter.into_iter().for_each(|x| self.push(x));
    }
}
