use crate::model::Series;

/// Descriptive summary of one series' per-bin counts.
///
/// Only occupied bins take part; empty intervals are not zero-filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub bins: usize,
    pub total: u64,
    pub mean: f64,
    /// Sample (n-1) standard deviation; None with fewer than two bins.
    pub std_dev: Option<f64>,
}

impl SeriesStats {
    pub fn from_series(series: &Series) -> Option<Self> {
        Self::from_counts(series.bins.values().copied())
    }

    pub fn from_counts<I>(counts: I) -> Option<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let counts: Vec<u64> = counts.into_iter().collect();
        if counts.is_empty() {
            return None;
        }

        let n = counts.len();
        let total: u64 = counts.iter().sum();
        let mean = total as f64 / n as f64;

        let std_dev = (n > 1).then(|| {
            let ss: f64 = counts
                .iter()
                .map(|&c| {
                    let d = c as f64 - mean;
                    d * d
                })
                .sum();
            (ss / (n - 1) as f64).sqrt()
        });

        Some(Self {
            bins: n,
            total,
            mean,
            std_dev,
        })
    }

    /// Lower and upper edge of the ±1σ band, if defined.
    pub fn band(&self) -> Option<(f64, f64)> {
        self.std_dev.map(|sd| (self.mean - sd, self.mean + sd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equal_counts_have_zero_spread() {
        let stats = SeriesStats::from_counts([2, 2]).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std_dev, Some(0.0));
        assert_eq!(stats.band(), Some((2.0, 2.0)));
    }

    #[test]
    fn sample_standard_deviation() {
        // mean 5, squared deviations sum to 32, n-1 = 7
        let stats = SeriesStats::from_counts([2, 4, 4, 4, 5, 5, 7, 9]).unwrap();
        assert_eq!(stats.total, 40);
        assert_eq!(stats.mean, 5.0);
        let sd = stats.std_dev.unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_bin_has_no_spread() {
        let stats = SeriesStats::from_counts([3]).unwrap();
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.band(), None);
    }

    #[test]
    fn empty_has_no_stats() {
        assert_eq!(SeriesStats::from_counts(Vec::new()), None);
    }
}
