use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A single item that did not make it into the output set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub name: String,
    pub message: String,
}

/// Batch processing report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn record_failure(&mut self, name: impl Into<String>, error: &Error) {
        let name = name.into();
        warn!("Error processing {}: {}", name, error);
        self.errors += 1;
        self.failures.push(ItemFailure {
            name,
            message: error.to_string(),
        });
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.failures.extend(other.failures);
    }
}

/// Single observer of batch progress. Called from worker threads.
pub trait ProgressObserver: Sync {
    fn on_start(&self, _total: usize) {}
    fn on_item(&self, done: usize, total: usize, name: &str, ok: bool);
    fn on_finish(&self, _report: &BatchReport) {}
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_item(&self, _done: usize, _total: usize, _name: &str, _ok: bool) {}
}

/// Emits progress as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_start(&self, total: usize) {
        info!("Starting batch of {} items", total);
    }

    fn on_item(&self, done: usize, total: usize, name: &str, ok: bool) {
        if ok {
            info!("Processed {}/{}: {}", done, total, name);
        } else {
            warn!("Failed {}/{}: {}", done, total, name);
        }
    }

    fn on_finish(&self, report: &BatchReport) {
        info!(
            "Batch complete: processed={} skipped={} errors={}",
            report.processed, report.skipped, report.errors
        );
    }
}

/// Something a batch can name in progress messages and failure reports.
pub trait BatchItem: Send + Sync {
    fn name(&self) -> String;
}

impl BatchItem for String {
    fn name(&self) -> String {
        self.clone()
    }
}

/// Runs `work` over `items` on a pool of `workers` threads.
///
/// Every item runs to completion or to its own failure; one failure never
/// cancels its siblings. Results are returned in input order, paired with the
/// item they came from.
pub fn run_pool<I, T, F>(
    items: Vec<I>,
    workers: usize,
    observer: &dyn ProgressObserver,
    work: F,
) -> Result<Vec<(I, Result<T>)>>
where
    I: BatchItem,
    T: Send,
    F: Fn(&I) -> Result<T> + Sync,
{
    if workers == 0 {
        return Err(Error::InvalidConfiguration(
            "worker count must be at least 1".to_string(),
        ));
    }

    let total = items.len();
    let done = AtomicUsize::new(0);
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("canvasfit-worker-{i}"))
        .build()
        .map_err(Error::external)?;

    debug!("Running {} items on {} workers", total, workers);

    let results = pool.install(|| {
        items
            .into_par_iter()
            .map(|item| {
                let outcome = work(&item);
                let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                observer.on_item(n, total, &item.name(), outcome.is_ok());
                (item, outcome)
            })
            .collect::<Vec<_>>()
    });

    Ok(results)
}

/// Folds pool results into a report, keeping only successful outputs.
pub fn partition_results<I, T>(results: Vec<(I, Result<T>)>) -> (Vec<(I, T)>, BatchReport)
where
    I: BatchItem,
{
    let mut report = BatchReport::default();
    let mut ok = Vec::with_capacity(results.len());
    for (item, outcome) in results {
        match outcome {
            Ok(value) => {
                report.processed += 1;
                ok.push((item, value));
            }
            Err(e) => report.record_failure(item.name(), &e),
        }
    }
    (ok, report)
}
