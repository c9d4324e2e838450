//! Aggregation of fine arrays onto coarse cells.
//!
//! For every cell of an [`IndexMapping`], in cell order:
//! - empty index list → fill value
//! - otherwise gather the listed samples (masked ones as `None`) and hand
//!   them to the reducer; a `None` result (nothing present) → fill value
//!
//! Indices are not checked up front unless
//! [`AggregateConfig::validate_indices`] is set. An index past the end of
//! the fine array fails the whole call with
//! [`RegridError::IndexOutOfRange`]; no partial output is returned.

use crate::config::AggregateConfig;
use crate::error::{RegridError, Result};
use crate::mapping::IndexMapping;
use crate::masked::MaskedArray;
use crate::progress::{Progress, ProgressSink, Stage, TracingProgress};
use crate::reduce::{Reducer, Reduction};
use rayon::prelude::*;

/// Statistics collected during one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Coarse cells produced.
    pub cells: u64,

    /// Cells filled because their index list was empty.
    pub empty_cells: u64,

    /// Cells filled because the reducer found nothing present.
    pub missing_cells: u64,

    /// Fine samples gathered across all cells.
    pub samples_gathered: u64,
}

/// Result of aggregating one fine array.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    /// One value per coarse cell.
    pub values: Vec<f64>,
    pub stats: AggregateStats,
}

#[derive(Clone, Copy)]
enum CellOutcome {
    Reduced(f64),
    Empty,
    Missing,
}

/// Applies index mappings to fine arrays.
pub struct Aggregator {
    config: AggregateConfig,
    sink: Box<dyn ProgressSink>,
}

impl Aggregator {
    /// Create an aggregator reporting progress through `tracing`.
    pub fn new(config: AggregateConfig) -> Self {
        Self {
            config,
            sink: Box::new(TracingProgress),
        }
    }

    /// Deliver progress notifications to `sink` instead of `tracing`.
    pub fn with_progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Reduce `fine` onto the cells of `mapping`.
    pub fn aggregate<R: Reducer + ?Sized>(
        &self,
        mapping: &IndexMapping,
        fine: &MaskedArray,
        reducer: &R,
        fill_value: f64,
    ) -> Result<Vec<f64>> {
        Ok(self
            .aggregate_with_stats(mapping, fine, reducer, fill_value)?
            .values)
    }

    /// Like [`Aggregator::aggregate`], also returning statistics.
    pub fn aggregate_with_stats<R: Reducer + ?Sized>(
        &self,
        mapping: &IndexMapping,
        fine: &MaskedArray,
        reducer: &R,
        fill_value: f64,
    ) -> Result<AggregateResult> {
        self.config.validate()?;

        let span = tracing::info_span!(
            "regrid_aggregate",
            cells = mapping.size(),
            fine_len = fine.len(),
            parallel = self.config.parallel
        );
        let _guard = span.enter();

        if self.config.validate_indices {
            mapping.validate_for_len(fine.len())?;
        }

        let progress = Progress::new(
            Stage::Aggregation,
            mapping.size(),
            self.config.progress_interval,
            self.sink.as_ref(),
        );

        let outcomes: Vec<CellOutcome> = if self.config.parallel {
            mapping
                .cells()
                .par_iter()
                .enumerate()
                .map_init(Vec::new, |buf, (cell, indices)| {
                    let outcome = reduce_cell(cell, indices, fine, reducer, buf);
                    progress.tick();
                    outcome
                })
                .collect::<Result<_>>()?
        } else {
            let mut buf = Vec::new();
            let mut outcomes = Vec::with_capacity(mapping.size());
            for (cell, indices) in mapping.iter().enumerate() {
                outcomes.push(reduce_cell(cell, indices, fine, reducer, &mut buf)?);
                progress.tick();
            }
            outcomes
        };
        progress.finish();

        let mut stats = AggregateStats {
            cells: outcomes.len() as u64,
            samples_gathered: mapping.total_indices() as u64,
            ..AggregateStats::default()
        };
        let values = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                CellOutcome::Reduced(v) => v,
                CellOutcome::Empty => {
                    stats.empty_cells += 1;
                    fill_value
                }
                CellOutcome::Missing => {
                    stats.missing_cells += 1;
                    fill_value
                }
            })
            .collect();

        tracing::debug!(
            cells = stats.cells,
            empty = stats.empty_cells,
            missing = stats.missing_cells,
            "Aggregation finished"
        );

        Ok(AggregateResult { values, stats })
    }

    /// Reduce several fine arrays through the same mapping.
    ///
    /// Fails on the first array that does not fit the mapping.
    pub fn aggregate_many<R: Reducer + ?Sized>(
        &self,
        mapping: &IndexMapping,
        arrays: &[MaskedArray],
        reducer: &R,
        fill_value: f64,
    ) -> Result<Vec<Vec<f64>>> {
        arrays
            .iter()
            .map(|fine| self.aggregate(mapping, fine, reducer, fill_value))
            .collect()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregateConfig::default())
    }
}

/// Reduce `fine` onto `mapping` with the median and default settings.
pub fn aggregate_median(
    mapping: &IndexMapping,
    fine: &MaskedArray,
    fill_value: f64,
) -> Result<Vec<f64>> {
    Aggregator::default().aggregate(mapping, fine, &Reduction::Median, fill_value)
}

fn reduce_cell<R: Reducer + ?Sized>(
    cell: usize,
    indices: &[usize],
    fine: &MaskedArray,
    reducer: &R,
    buf: &mut Vec<Option<f64>>,
) -> Result<CellOutcome> {
    if indices.is_empty() {
        return Ok(CellOutcome::Empty);
    }

    buf.clear();
    for &index in indices {
        let sample = fine.get(index).ok_or(RegridError::IndexOutOfRange {
            cell,
            index,
            len: fine.len(),
        })?;
        buf.push(sample);
    }

    Ok(match reducer.reduce(buf) {
        Some(v) => CellOutcome::Reduced(v),
        None => CellOutcome::Missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_median_two_cells() {
        let mapping = IndexMapping::from(vec![vec![0, 2], vec![1]]);
        let fine = MaskedArray::new(vec![10.0, 20.0, 30.0]);
        let coarse = aggregate_median(&mapping, &fine, -999.0).unwrap();
        assert_eq!(coarse, vec![20.0, 20.0]);
    }

    #[test]
    fn test_empty_cell_gets_fill() {
        let mapping = IndexMapping::from(vec![vec![0], vec![]]);
        let fine = MaskedArray::new(vec![5.0]);
        let coarse = aggregate_median(&mapping, &fine, -1.0).unwrap();
        assert_eq!(coarse, vec![5.0, -1.0]);
    }

    #[test]
    fn test_empty_cell_fill_for_any_reducer() {
        let mapping = IndexMapping::from(vec![vec![], vec![0]]);
        let fine = MaskedArray::new(vec![3.0]);
        let always = |_: &[Option<f64>]| Some(42.0);

        let agg = Aggregator::default();
        assert_eq!(agg.aggregate(&mapping, &fine, &always, -7.0).unwrap(), vec![-7.0, 42.0]);
        for r in [Reduction::Sum, Reduction::Max, Reduction::Mean] {
            assert_eq!(agg.aggregate(&mapping, &fine, &r, -7.0).unwrap()[0], -7.0);
        }
    }

    #[test]
    fn test_all_missing_gets_fill() {
        let mapping = IndexMapping::from(vec![vec![0, 1], vec![2]]);
        let fine = MaskedArray::with_mask(vec![1.0, 2.0, 3.0], vec![true, true, false]).unwrap();

        let result = Aggregator::default()
            .aggregate_with_stats(&mapping, &fine, &Reduction::Mean, 0.5)
            .unwrap();
        assert_eq!(result.values, vec![0.5, 3.0]);
        assert_eq!(result.stats.missing_cells, 1);
        assert_eq!(result.stats.empty_cells, 0);
    }

    #[test]
    fn test_partially_masked() {
        let mapping = IndexMapping::from(vec![vec![0, 1, 2]]);
        let fine = MaskedArray::from_options([Some(1.0), None, Some(5.0)]);
        let coarse = aggregate_median(&mapping, &fine, -1.0).unwrap();
        assert_eq!(coarse, vec![3.0]);
    }

    #[test]
    fn test_out_of_range_is_error() {
        let mapping = IndexMapping::from(vec![vec![0], vec![1, 3]]);
        let fine = MaskedArray::new(vec![1.0, 2.0]);

        match aggregate_median(&mapping, &fine, 0.0) {
            Err(RegridError::IndexOutOfRange { cell, index, len }) => {
                assert_eq!((cell, index, len), (1, 3, 2));
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }

        let parallel = Aggregator::new(AggregateConfig::new().with_parallel(true));
        assert!(matches!(
            parallel.aggregate(&mapping, &fine, &Reduction::Median, 0.0),
            Err(RegridError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_eager_validation_runs_before_reducing() {
        let mapping = IndexMapping::from(vec![vec![0], vec![9]]);
        let fine = MaskedArray::new(vec![1.0]);
        let calls = Mutex::new(0usize);
        let counting = |s: &[Option<f64>]| {
            *calls.lock().unwrap() += 1;
            s[0]
        };

        let agg = Aggregator::new(AggregateConfig::new().with_validate_indices(true));
        let err = agg.aggregate(&mapping, &fine, &counting, 0.0);
        assert!(matches!(err, Err(RegridError::IndexOutOfRange { index: 9, .. })));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let cells: Vec<Vec<usize>> = (0..200)
            .map(|i| if i % 7 == 0 { Vec::new() } else { (i..i + 5).collect() })
            .collect();
        let mapping = IndexMapping::from(cells);
        let values: Vec<f64> = (0..205).map(|i| (i * 37 % 101) as f64).collect();
        let mask: Vec<bool> = (0..205).map(|i| i % 11 == 0).collect();
        let fine = MaskedArray::with_mask(values, mask).unwrap();

        let serial = Aggregator::default()
            .aggregate(&mapping, &fine, &Reduction::Median, -1.0)
            .unwrap();
        let parallel = Aggregator::new(AggregateConfig::new().with_parallel(true))
            .aggregate(&mapping, &fine, &Reduction::Median, -1.0)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_aggregate_many() {
        let mapping = IndexMapping::from(vec![vec![0, 1], vec![]]);
        let arrays = vec![
            MaskedArray::new(vec![1.0, 3.0]),
            MaskedArray::new(vec![10.0, 30.0]),
        ];
        let out = Aggregator::default()
            .aggregate_many(&mapping, &arrays, &Reduction::Sum, f64::NAN)
            .unwrap();
        assert_eq!(out[0][0], 4.0);
        assert_eq!(out[1][0], 40.0);
        assert!(out[0][1].is_nan() && out[1][1].is_nan());
    }

    #[test]
    fn test_dyn_reducer() {
        let mapping = IndexMapping::from(vec![vec![0, 1]]);
        let fine = MaskedArray::new(vec![2.0, 8.0]);
        let reducer: Box<dyn Reducer> = Box::new(Reduction::Min);
        let coarse = Aggregator::default()
            .aggregate(&mapping, &fine, reducer.as_ref(), 0.0)
            .unwrap();
        assert_eq!(coarse, vec![2.0]);
    }

    #[test]
    fn test_progress_keyed_on_cells() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);

        let mapping = IndexMapping::from(vec![vec![0]; 3]);
        Aggregator::new(AggregateConfig::new().with_progress_interval(1))
            .with_progress_sink(move |e: crate::progress::ProgressEvent| {
                sink_events.lock().unwrap().push(e.completed)
            })
            .aggregate(&mapping, &MaskedArray::new(vec![1.0]), &Reduction::Median, 0.0)
            .unwrap();

        assert_eq!(*events.lock().unwrap(), vec![1, 2, 3]);
    }
}
