//! Reduction functions collapsing one cell's gathered samples to a value.
//!
//! A [`Reducer`] receives the samples gathered for one coarse cell, with
//! masked samples as `None`, and returns a single value or `None` when it
//! has nothing to report (typically: every sample was missing). The
//! aggregator turns `None` into the caller's fill value.
//!
//! Built-in reducers are the variants of [`Reduction`]. Any
//! `Fn(&[Option<f64>]) -> Option<f64> + Send + Sync` closure is a reducer
//! as well.

use serde::{Deserialize, Serialize};

/// Collapse a cell's samples to one value.
pub trait Reducer: Send + Sync {
    /// Reduce `samples`; `None` entries are missing.
    fn reduce(&self, samples: &[Option<f64>]) -> Option<f64>;
}

impl<F> Reducer for F
where
    F: Fn(&[Option<f64>]) -> Option<f64> + Send + Sync,
{
    fn reduce(&self, samples: &[Option<f64>]) -> Option<f64> {
        self(samples)
    }
}

/// Built-in reductions. All ignore missing samples and return `None`
/// when no sample is present. A present `NaN` sample makes every built-in
/// return `NaN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Middle value; mean of the two middle values for an even count.
    #[default]
    Median,
    Mean,
    Sum,
    Min,
    Max,
}

impl Reduction {
    pub fn name(&self) -> &'static str {
        match self {
            Reduction::Median => "median",
            Reduction::Mean => "mean",
            Reduction::Sum => "sum",
            Reduction::Min => "min",
            Reduction::Max => "max",
        }
    }
}

impl Reducer for Reduction {
    fn reduce(&self, samples: &[Option<f64>]) -> Option<f64> {
        if samples.iter().flatten().any(|v| v.is_nan()) {
            return Some(f64::NAN);
        }
        let present = samples.iter().flatten().copied();
        match self {
            Reduction::Median => median(present.collect()),
            Reduction::Mean => {
                let (sum, n) = present.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                (n > 0).then(|| sum / n as f64)
            }
            Reduction::Sum => present.reduce(|a, b| a + b),
            Reduction::Min => present.reduce(f64::min),
            Reduction::Max => present.reduce(f64::max),
        }
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_median() {
        assert_eq!(Reduction::Median.reduce(&some(&[10.0, 30.0])), Some(20.0));
        assert_eq!(Reduction::Median.reduce(&some(&[3.0, 1.0, 2.0])), Some(2.0));
        assert_eq!(Reduction::Median.reduce(&[Some(5.0), None, Some(1.0), Some(9.0)]), Some(5.0));
    }

    #[test]
    fn test_mean_sum_min_max() {
        let samples = [Some(2.0), None, Some(4.0), Some(9.0)];
        assert_eq!(Reduction::Mean.reduce(&samples), Some(5.0));
        assert_eq!(Reduction::Sum.reduce(&samples), Some(15.0));
        assert_eq!(Reduction::Min.reduce(&samples), Some(2.0));
        assert_eq!(Reduction::Max.reduce(&samples), Some(9.0));
    }

    #[test]
    fn test_all_missing_is_none() {
        let samples = [None, None];
        for r in [
            Reduction::Median,
            Reduction::Mean,
            Reduction::Sum,
            Reduction::Min,
            Reduction::Max,
        ] {
            assert_eq!(r.reduce(&samples), None, "{}", r.name());
            assert_eq!(r.reduce(&[]), None, "{}", r.name());
        }
    }

    #[test]
    fn test_nan_propagates_for_every_reduction() {
        for r in [
            Reduction::Median,
            Reduction::Mean,
            Reduction::Sum,
            Reduction::Min,
            Reduction::Max,
        ] {
            let odd = r.reduce(&[Some(f64::NAN), Some(1.0), Some(2.0)]);
            assert!(odd.is_some_and(f64::is_nan), "{}", r.name());
            let even = r.reduce(&[Some(1.0), Some(f64::NAN)]);
            assert!(even.is_some_and(f64::is_nan), "{}", r.name());
            // a masked NaN is just missing
            assert_eq!(r.reduce(&[None, Some(3.0)]), Some(3.0), "{}", r.name());
        }
    }

    #[test]
    fn test_closure_reducer() {
        let count = |s: &[Option<f64>]| Some(s.iter().flatten().count() as f64);
        assert_eq!(count.reduce(&[Some(1.0), None, Some(1.0)]), Some(2.0));
    }

    #[test]
    fn test_reduction_serde_names() {
        let json = serde_json::to_string(&Reduction::Max).unwrap();
        assert_eq!(json, "\"max\"");
        let back: Reduction = serde_json::from_str("\"median\"").unwrap();
        assert_eq!(back, Reduction::Median);
    }
}
