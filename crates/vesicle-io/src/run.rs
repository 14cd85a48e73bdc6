//! Batch execution shared by every stage.
//!
//! A stage is a list of micrograph base names plus a per-micrograph
//! job. [`run_batch`] runs the jobs on a dedicated rayon pool, isolates
//! failures (a micrograph that errors or panics is logged and counted,
//! never fatal) and
//! stops starting new jobs once the [`CancelToken`] trips.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use vesicle_pipeline::PipelineError;

use crate::config::ConfigError;
use crate::mrc::MrcError;
use crate::store::StoreError;

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been tripped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder to stop starting new work.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancelToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options common to every stage.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Recompute micrographs whose output already exists.
    pub force: bool,
    /// Stop flag.
    pub cancel: CancelToken,
}

/// What happened to one micrograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An output file was written.
    Written,
    /// The stage produced nothing to persist; no file was written.
    Empty,
}

/// Per-micrograph failure. Logged and counted; the batch continues.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The micrograph could not be read or decoded.
    #[error(transparent)]
    Mrc(#[from] MrcError),

    /// A mask file could not be read, decoded or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Preprocessing or segmentation rejected the input.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Writing an output file failed.
    #[error("{path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The display panel could not be encoded.
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure that stops a whole stage before any micrograph runs.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Invalid or missing parameter.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input directory of the stage could not be listed.
    #[error("cannot list {path}: {source}")]
    Listing {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Counts for one stage invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Output files written.
    pub written: usize,
    /// Micrographs with nothing to persist.
    pub empty: usize,
    /// Micrographs skipped because their output already existed.
    pub skipped: usize,
    /// Micrographs that failed.
    pub failed: usize,
    /// Micrographs not started because of cancellation.
    pub cancelled: usize,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} empty, {} skipped, {} failed, {} cancelled",
            self.written, self.empty, self.skipped, self.failed, self.cancelled
        )
    }
}

/// Split `bases` into work and already-done names, then apply `limit`
/// to the work list.
#[must_use]
pub fn plan(
    bases: Vec<String>,
    limit: Option<usize>,
    force: bool,
    is_done: impl Fn(&str) -> bool,
) -> (Vec<String>, usize) {
    let (mut todo, done): (Vec<String>, Vec<String>) = if force {
        (bases, Vec::new())
    } else {
        bases.into_iter().partition(|b| !is_done(b.as_str()))
    };
    if let Some(limit) = limit {
        todo.truncate(limit);
    }
    (todo, done.len())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[derive(Clone, Copy)]
enum Tally {
    Done(Outcome),
    Failed,
    Cancelled,
}

/// Run `job` for every name on a pool of `workers` threads.
///
/// `skipped` is carried into the report unchanged.
///
/// # Errors
///
/// Returns [`RunError::Pool`] if the thread pool cannot be built.
pub fn run_batch<F>(
    stage: &str,
    names: &[String],
    skipped: usize,
    workers: usize,
    cancel: &CancelToken,
    job: F,
) -> Result<StageReport, RunError>
where
    F: Fn(&str) -> Result<Outcome, StageError> + Sync,
{
    log::info!(
        "{stage}: {} micrographs to process, {skipped} already done",
        names.len()
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("vesicle-worker-{i}"))
        .build()?;

    let tallies: Vec<Tally> = pool.install(|| {
        names
            .par_iter()
            .map(|name| {
                if cancel.is_cancelled() {
                    return Tally::Cancelled;
                }
                match panic::catch_unwind(AssertUnwindSafe(|| job(name))) {
                    Ok(Ok(outcome)) => {
                        log::debug!("{stage}: {name}: {outcome:?}");
                        Tally::Done(outcome)
                    }
                    Ok(Err(e)) => {
                        log::warn!("{stage}: {name}: {e}");
                        Tally::Failed
                    }
                    Err(payload) => {
                        log::warn!("{stage}: {name}: panicked: {}", panic_message(&*payload));
                        Tally::Failed
                    }
                }
            })
            .collect()
    });

    let mut report = StageReport {
        skipped,
        ..StageReport::default()
    };
    for tally in tallies {
        match tally {
            Tally::Done(Outcome::Written) => report.written += 1,
            Tally::Done(Outcome::Empty) => report.empty += 1,
            Tally::Failed => report.failed += 1,
            Tally::Cancelled => report.cancelled += 1,
        }
    }
    log::info!("{stage}: {report}");
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("mic_{i:03}")).collect()
    }

    #[test]
    fn failures_are_isolated() {
        let report = run_batch("test", &names(10), 2, 3, &CancelToken::new(), |name| {
            if name.ends_with('3') {
                Err(StageError::Pipeline(PipelineError::Segmentation(
                    "boom".to_string(),
                )))
            } else if name.ends_with('5') {
                Ok(Outcome::Empty)
            } else {
                Ok(Outcome::Written)
            }
        })
        .unwrap();
        assert_eq!(
            report,
            StageReport {
                written: 8,
                empty: 1,
                skipped: 2,
                failed: 1,
                cancelled: 0
            }
        );
    }

    #[test]
    #[allow(clippy::panic)]
    fn panicking_job_counts_as_failed() {
        let report = run_batch("test", &names(4), 0, 2, &CancelToken::new(), |name| {
            if name == "mic_002" {
                panic!("allocation failed");
            }
            Ok(Outcome::Written)
        })
        .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.written, 3);
    }

    #[test]
    fn cancelled_batch_starts_nothing() {
        let cancel = CancelToken::new();
        cancel.clone().cancel();
        let report = run_batch("test", &names(4), 0, 2, &cancel, |_| Ok(Outcome::Written)).unwrap();
        assert_eq!(report.cancelled, 4);
        assert_eq!(report.written, 0);
    }

    #[test]
    fn plan_skips_done_then_limits() {
        let all = names(6);
        let (todo, skipped) = plan(all.clone(), Some(2), false, |b| b == "mic_000" || b == "mic_001");
        assert_eq!(todo, vec!["mic_002", "mic_003"]);
        assert_eq!(skipped, 2);

        let (todo, skipped) = plan(all, None, true, |_| true);
        assert_eq!(todo.len(), 6);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn report_display() {
        let report = StageReport {
            written: 3,
            ..StageReport::default()
        };
        assert_eq!(
            report.to_string(),
            "3 written, 0 empty, 0 skipped, 0 failed, 0 cancelled"
        );
    }
}
