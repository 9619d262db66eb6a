use std::collections::HashMap;

use statrs::statistics::Statistics;
use tabml_core::NumericSummary;

/// Column-level descriptive statistics used by the dataset profiler.
pub struct SummaryStatistics;

impl SummaryStatistics {
    /// Min, max, mean and sample standard deviation of the finite values.
    /// Returns `None` when no finite value is present.
    pub fn numeric(values: &[f64]) -> Option<NumericSummary> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let std_dev = if finite.len() > 1 {
            Statistics::std_dev(&finite)
        } else {
            0.0
        };

        Some(NumericSummary {
            min: Statistics::min(&finite),
            max: Statistics::max(&finite),
            mean: Statistics::mean(&finite),
            std_dev,
            integral: finite.iter().all(|v| v.fract() == 0.0),
        })
    }

    /// Most frequent value; ties go to the value seen first.
    pub fn mode<'a, I>(values: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::frequencies(values).first().map(|&(value, _)| value)
    }

    /// Distinct values with their counts, most frequent first. Equal counts
    /// keep first-seen order.
    pub fn frequencies<'a, I>(values: I) -> Vec<(&'a str, usize)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<&'a str, (usize, usize)> = HashMap::new();
        for (index, value) in values.into_iter().enumerate() {
            counts.entry(value).or_insert((0, index)).0 += 1;
        }

        let mut ranked: Vec<(&'a str, usize, usize)> = counts
            .into_iter()
            .map(|(value, (count, first))| (value, count, first))
            .collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.into_iter().map(|(value, count, _)| (value, count)).collect()
    }
}
