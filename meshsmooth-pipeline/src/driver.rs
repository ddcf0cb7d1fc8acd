//! Iterative refinement
//!
//! Runs the reduction `iterations` times, each pass reading the file the
//! previous one wrote. Progress goes to a caller-supplied sink; cancellation
//! is checked between passes only, so a running pass always completes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use meshsmooth_core::{Error, Result};
use meshsmooth_io::MeshStore;
use meshsmooth_reconstruction::{MeshCleaner, SurfaceReconstructor};
use tracing::{error, info, info_span};

use crate::config::RefinementConfig;
use crate::reduce::Reducer;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Notification emitted while a refinement runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Overall completion, never decreasing
    Percent(u8),
    /// A pass wrote this file
    FileProduced(PathBuf),
    /// Terminal: the last file written
    Finished(PathBuf),
    /// Terminal: cancelled or failed
    Aborted,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Finished(_) | ProgressEvent::Aborted)
    }
}

/// How a refinement run ended
#[derive(Debug)]
pub enum RefinementOutcome {
    Finished { path: PathBuf },
    /// Stopped before pass `completed + 1` started
    Cancelled { completed: usize },
    /// Pass `iteration` (1-based) failed; 0 means setup failed before any pass
    Failed { iteration: usize, error: Error },
}

impl RefinementOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, RefinementOutcome::Finished { .. })
    }

    /// Convert into a `Result`, treating cancellation as success without a path
    pub fn into_result(self) -> Result<Option<PathBuf>> {
        match self {
            RefinementOutcome::Finished { path } => Ok(Some(path)),
            RefinementOutcome::Cancelled { .. } => Ok(None),
            RefinementOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Drives repeated reduce-and-reconstruct passes over files
pub struct RefinementDriver<S, R, C> {
    config: RefinementConfig,
    store: S,
    reducer: Reducer<R, C>,
}

impl<S, R, C> RefinementDriver<S, R, C>
where
    S: MeshStore,
    R: SurfaceReconstructor,
    C: MeshCleaner,
{
    pub fn new(config: RefinementConfig, store: S, reconstructor: R, cleaner: C) -> Self {
        let reducer = Reducer::new(config.reduction.clone(), reconstructor, cleaner);
        Self {
            config,
            store,
            reducer,
        }
    }

    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    /// Run every pass on the calling thread, reporting to `sink`.
    pub fn run(
        &self,
        token: &CancellationToken,
        sink: &mut dyn FnMut(ProgressEvent),
    ) -> RefinementOutcome {
        if let Err(error) = self.prepare() {
            error!("Refinement not started: {}", error);
            sink(ProgressEvent::Aborted);
            return RefinementOutcome::Failed { iteration: 0, error };
        }

        let total = self.config.iterations;
        let mut input = self.config.input.clone();
        sink(ProgressEvent::Percent(0));

        for iteration in 1..=total {
            if token.is_cancelled() {
                info!("Refinement cancelled after {} of {} iterations", iteration - 1, total);
                sink(ProgressEvent::Aborted);
                return RefinementOutcome::Cancelled {
                    completed: iteration - 1,
                };
            }

            let span = info_span!("iteration", index = iteration);
            let _guard = span.enter();

            let output = self.config.output_path(iteration, self.store.extension());
            let cloud_dump = self.config.cloud_dump_path(iteration);
            if let Err(error) = self.reducer.reduce_file_with_dump(
                &self.store,
                &input,
                &output,
                cloud_dump.as_deref(),
            ) {
                error!("Iteration {} failed: {}", iteration, error);
                sink(ProgressEvent::Aborted);
                return RefinementOutcome::Failed { iteration, error };
            }

            sink(ProgressEvent::FileProduced(output.clone()));
            sink(ProgressEvent::Percent((100 * iteration / total) as u8));
            input = output;
        }

        info!("Refinement finished: {}", input.display());
        sink(ProgressEvent::Finished(input.clone()));
        RefinementOutcome::Finished { path: input }
    }

    /// Validate parameters and make sure the output directory exists
    fn prepare(&self) -> Result<()> {
        self.config.validate()?;
        if !self.config.output_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.config.output_dir)?;
        }
        Ok(())
    }
}

impl<S, R, C> RefinementDriver<S, R, C>
where
    S: MeshStore + Send + 'static,
    R: SurfaceReconstructor + Send + 'static,
    C: MeshCleaner + Send + 'static,
{
    /// Run on a background thread, streaming events over a channel
    pub fn spawn(self) -> RefinementHandle {
        let (sender, events) = flume::unbounded();
        let token = CancellationToken::new();
        let thread_token = token.clone();

        let thread = thread::spawn(move || {
            self.run(&thread_token, &mut |event: ProgressEvent| {
                // A dropped receiver only means nobody is listening
                let _ = sender.send(event);
            })
        });

        RefinementHandle {
            events,
            token,
            thread,
        }
    }
}

/// Handle on a background refinement
pub struct RefinementHandle {
    events: flume::Receiver<ProgressEvent>,
    token: CancellationToken,
    thread: JoinHandle<RefinementOutcome>,
}

impl RefinementHandle {
    pub fn events(&self) -> &flume::Receiver<ProgressEvent> {
        &self.events
    }

    /// Request a stop before the next pass starts
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for the run to end. Panics inside the worker are re-raised here.
    pub fn join(self) -> RefinementOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}
