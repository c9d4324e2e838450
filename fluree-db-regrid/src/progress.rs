//! Progress notifications for long mapping builds and aggregations.
//!
//! Notifications are advisory: they never change results. A [`Progress`]
//! counts processed cells and notifies its sink after every `interval`
//! cells and once more on completion. The counter is atomic, so parallel
//! workers can share one `Progress`; in that case notifications may arrive
//! out of order.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which pass is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building the index mapping (counts polygons).
    Mapping,
    /// Aggregating a fine array (counts coarse cells).
    Aggregation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Mapping => f.write_str("mapping"),
            Stage::Aggregation => f.write_str("aggregation"),
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// Cells processed so far.
    pub completed: usize,
    /// Total cells in this pass.
    pub total: usize,
}

impl ProgressEvent {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Receiver of progress notifications.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Default sink: one `tracing` info event per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn notify(&self, event: ProgressEvent) {
        if event.is_complete() {
            tracing::info!(stage = %event.stage, total = event.total, "Regrid pass completed");
        } else {
            tracing::info!(
                stage = %event.stage,
                completed = event.completed,
                total = event.total,
                "Regrid progress"
            );
        }
    }
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn notify(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Interval-gated progress counter for one pass.
pub(crate) struct Progress<'a> {
    stage: Stage,
    total: usize,
    interval: Option<usize>,
    done: AtomicUsize,
    sink: &'a dyn ProgressSink,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(
        stage: Stage,
        total: usize,
        interval: Option<usize>,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            stage,
            total,
            interval,
            done: AtomicUsize::new(0),
            sink,
        }
    }

    /// Record one processed cell.
    pub(crate) fn tick(&self) {
        let Some(interval) = self.interval else {
            return;
        };
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % interval == 0 && done < self.total {
            self.emit(done);
        }
    }

    /// Final notification for the pass.
    pub(crate) fn finish(&self) {
        if self.interval.is_some() {
            self.emit(self.total);
        }
    }

    fn emit(&self, completed: usize) {
        self.sink.notify(ProgressEvent {
            stage: self.stage,
            completed,
            total: self.total,
        });
    }
}
