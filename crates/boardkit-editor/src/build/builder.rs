use boardkit_core::StateId;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{BuildError, BuilderKind};

/// Work a [`BackgroundBuilder`] runs on its worker thread
pub trait BuildJob: Send + 'static {
    type Output: Send + 'static;

    fn run(self, ctx: &JobContext) -> Result<Self::Output, BuildError>;
}

enum Update {
    Progress(u8),
    Status(String),
}

/// Handle a running job reports through
pub struct JobContext {
    cancel: Arc<AtomicBool>,
    progress: AtomicU8,
    report: Box<dyn Fn(Update) + Send + Sync>,
}

impl JobContext {
    /// A context that reports nowhere, for running a job inline.
    pub fn detached() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            progress: AtomicU8::new(0),
            report: Box::new(|_| {}),
        }
    }

    /// Reports progress in percent. Values above 100 are clamped and
    /// values below the last report are ignored.
    pub fn progress(&self, percent: u8) {
        let percent = percent.min(100);
        if self.progress.fetch_max(percent, Ordering::SeqCst) < percent {
            (self.report)(Update::Progress(percent));
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        (self.report)(Update::Status(text.into()));
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn check_canceled(&self) -> Result<(), BuildError> {
        if self.is_canceled() {
            Err(BuildError::Canceled)
        } else {
            Ok(())
        }
    }
}

enum Message<T> {
    Started,
    Update(Update),
    Finished(Result<T, BuildError>),
}

/// Notification of the current run, delivered by [`BackgroundBuilder::poll`]
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderEvent<T> {
    Started {
        generation: u64,
    },
    Progress {
        generation: u64,
        percent: u8,
    },
    Status {
        generation: u64,
        text: String,
    },
    Finished {
        generation: u64,
        /// State id the job's snapshot was taken at
        state_id: StateId,
        result: Result<T, BuildError>,
    },
}

struct ActiveRun {
    generation: u64,
    state_id: StateId,
    cancel: Arc<AtomicBool>,
}

/// Runs one job at a time on a worker thread
///
/// Every start increments the generation. Messages of older generations
/// are dropped, which is how a canceled run that still completes is kept
/// from overwriting newer results.
pub struct BackgroundBuilder<J: BuildJob> {
    kind: BuilderKind,
    generation: u64,
    active: Option<ActiveRun>,
    tx: Sender<(u64, Message<J::Output>)>,
    rx: Receiver<(u64, Message<J::Output>)>,
    pending: VecDeque<(u64, Message<J::Output>)>,
    synthesized: VecDeque<BuilderEvent<J::Output>>,
}

impl<J: BuildJob> BackgroundBuilder<J> {
    pub fn new(kind: BuilderKind) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            kind,
            generation: 0,
            active: None,
            tx,
            rx,
            pending: VecDeque::new(),
            synthesized: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> BuilderKind {
        self.kind
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Generation of the most recent start.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts `job` on a new worker. Returns false while a run is active.
    pub fn start(&mut self, job: J, state_id: StateId) -> bool {
        if self.is_busy() {
            tracing::debug!("{} builder busy, start rejected", self.kind);
            return false;
        }
        let generation = self.generation + 1;
        let cancel = Arc::new(AtomicBool::new(false));

        let tx = self.tx.clone();
        let report_tx = self.tx.clone();
        let ctx = JobContext {
            cancel: cancel.clone(),
            progress: AtomicU8::new(0),
            report: Box::new(move |update| {
                let _ = report_tx.send((generation, Message::Update(update)));
            }),
        };

        let spawned = std::thread::Builder::new()
            .name(format!("{}-builder", self.kind))
            .spawn(move || {
                let _ = tx.send((generation, Message::Started));
                let result = catch_unwind(AssertUnwindSafe(|| job.run(&ctx)))
                    .unwrap_or_else(|panic| Err(BuildError::Panicked(panic_message(&*panic))));
                let _ = tx.send((generation, Message::Finished(result)));
            });

        match spawned {
            Ok(_) => {
                self.generation = generation;
                self.active = Some(ActiveRun {
                    generation,
                    state_id,
                    cancel,
                });
                tracing::debug!("{} builder started generation {}", self.kind, generation);
                true
            }
            Err(e) => {
                tracing::error!("Failed to spawn {} builder: {}", self.kind, e);
                false
            }
        }
    }

    /// Asks the worker to stop and frees the builder right away.
    ///
    /// The next poll reports the run as canceled; whatever the worker still
    /// sends is discarded.
    pub fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            run.cancel.store(true, Ordering::SeqCst);
            tracing::debug!("{} builder canceled generation {}", self.kind, run.generation);
            self.synthesized.push_back(BuilderEvent::Finished {
                generation: run.generation,
                state_id: run.state_id,
                result: Err(BuildError::Canceled),
            });
        }
    }

    /// Drains the worker's messages in order, dropping stale generations.
    pub fn poll(&mut self) -> Vec<BuilderEvent<J::Output>> {
        let mut events: Vec<_> = self.synthesized.drain(..).collect();
        while let Ok(msg) = self.rx.try_recv() {
            self.pending.push_back(msg);
        }
        while let Some((generation, message)) = self.pending.pop_front() {
            let Some(run) = self.active.as_ref().filter(|r| r.generation == generation) else {
                tracing::trace!("{} builder dropped message of generation {}", self.kind, generation);
                continue;
            };
            let event = match message {
                Message::Started => BuilderEvent::Started { generation },
                Message::Update(Update::Progress(percent)) => {
                    BuilderEvent::Progress { generation, percent }
                }
                Message::Update(Update::Status(text)) => BuilderEvent::Status { generation, text },
                Message::Finished(result) => {
                    let state_id = run.state_id;
                    self.active = None;
                    BuilderEvent::Finished {
                        generation,
                        state_id,
                        result,
                    }
                }
            };
            events.push(event);
        }
        events
    }

    /// Blocks until the active run sent its result or `timeout` elapsed.
    ///
    /// The result stays queued for the next [`poll`](Self::poll). Returns
    /// true if nothing is left running.
    pub fn wait_for_finished(&mut self, timeout: Duration) -> bool {
        let Some(current) = self.active.as_ref().map(|r| r.generation) else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        loop {
            let finished = self
                .pending
                .iter()
                .any(|(g, m)| *g == current && matches!(m, Message::Finished(_)));
            if finished {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => self.pending.push_back(msg),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}

impl<J: BuildJob> Drop for BackgroundBuilder<J> {
    fn drop(&mut self) {
        if let Some(run) = &self.active {
            run.cancel.store(true, Ordering::SeqCst);
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
