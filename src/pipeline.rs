//! Split, scan in parallel, merge, report.
//!
//! One named thread is spawned per part. Each sends exactly one
//! `Result<AggregationTable>` back over a crossbeam channel. The first failure
//! raises a shared cancellation flag that the other workers poll, and is the
//! error returned once every worker has been joined.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Receiver;
use memmap2::Mmap;
use tracing::{info, warn};

use crate::config::{Config, ReadStrategy, Reduction};
use crate::error::{Error, Result};
use crate::merge::{merge_tree, Merger};
use crate::report::Report;
use crate::split::{split_file, split_slice, Part};
use crate::table::AggregationTable;
use crate::worker::ChunkWorker;

enum Source {
    File(PathBuf),
    Mapped(Arc<Mmap>),
}

impl Source {
    fn scan(&self, worker: &ChunkWorker, cancel: &AtomicBool) -> Result<AggregationTable> {
        match self {
            Source::File(path) => worker.run_file(path, cancel),
            Source::Mapped(map) => worker.run_mapped(&map[..], cancel),
        }
    }
}

/// Aggregates every record of the file at `path` into one table.
pub fn aggregate(path: &Path, config: &Config) -> Result<AggregationTable> {
    config.validate()?;
    let started = Instant::now();
    let workers = config.workers.get();

    let (parts, mapping) = match config.strategy {
        ReadStrategy::Seek => (split_file(path, workers, config.window)?, None),
        ReadStrategy::Mapped => {
            let file = File::open(path).map_err(|e| Error::io("open", path, e))?;
            // SAFETY: the input is only read, and is not expected to change
            // while the run is in progress.
            let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::io("map", path, e))?;
            let parts = split_slice(&map, workers, config.window)?;
            (parts, Some(Arc::new(map)))
        }
    };
    let size = parts.last().map_or(0, Part::end);
    info!(
        path = %path.display(),
        size,
        parts = parts.len(),
        strategy = ?config.strategy,
        "starting aggregation"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = crossbeam_channel::bounded::<(usize, Result<AggregationTable>)>(parts.len());
    let mut handles = Vec::with_capacity(parts.len());
    for (id, part) in parts.iter().copied().enumerate() {
        let worker = ChunkWorker::new(id, part);
        let source = match &mapping {
            Some(map) => Source::Mapped(Arc::clone(map)),
            None => Source::File(path.to_path_buf()),
        };
        let tx = tx.clone();
        let cancel_flag = Arc::clone(&cancel);
        let spawned = thread::Builder::new()
            .name(format!("chunk-worker-{id}"))
            .spawn(move || {
                let result = source.scan(&worker, &cancel_flag);
                // The receiver outlives every worker.
                let _ = tx.send((id, result));
            });
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                cancel.store(true, Ordering::Relaxed);
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(Error::io("spawn a worker for", path, e));
            }
        }
    }
    drop(tx);

    let table = collect(rx, handles, &cancel, config.reduction)?;
    info!(
        keys = table.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "aggregation finished"
    );
    Ok(table)
}

/// Receives one result per worker, merges the tables and joins every thread.
///
/// The first failure raises `cancel` and becomes the returned error once all
/// workers are joined. `Cancelled` results from the other workers are
/// dropped. `handles` must be indexed by worker id.
fn collect(
    rx: Receiver<(usize, Result<AggregationTable>)>,
    handles: Vec<JoinHandle<()>>,
    cancel: &AtomicBool,
    reduction: Reduction,
) -> Result<AggregationTable> {
    let mut merger = Merger::new();
    let mut collected = Vec::new();
    let mut failure: Option<Error> = None;
    for (id, result) in rx.iter() {
        match result {
            Ok(table) if failure.is_none() => match reduction {
                Reduction::Serial => merger.push(table),
                Reduction::Tree => collected.push(table),
            },
            Ok(_) | Err(Error::Cancelled) => {}
            Err(e) => {
                if failure.is_none() {
                    warn!(worker = id, error = %e, "worker failed, cancelling run");
                    cancel.store(true, Ordering::Relaxed);
                    failure = Some(Error::Worker {
                        worker: id,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
    for (id, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() && failure.is_none() {
            failure = Some(Error::WorkerPanicked(id));
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(match reduction {
        Reduction::Serial => merger.finish(),
        Reduction::Tree => merge_tree(collected),
    })
}

/// Aggregates the file at `path` and returns the sorted report.
pub fn run(path: &Path, config: &Config) -> Result<Report> {
    aggregate(path, config).map(Report::new)
}
