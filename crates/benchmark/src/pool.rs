//! A resizable pool of burn workers.
//!
//! Each worker is an independent OS process that only ever receives a
//! one-way stop signal. Stopping is graceful first: signal, wait up to
//! [`GRACEFUL_STOP_WAIT`], then kill whatever is still alive. Child processes
//! are spawned with `kill_on_drop`, so dropping the pool also reaps them.

use std::future::Future;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::burn::WORKER_FLAG;

/// How long stopped workers get to exit on their own.
pub const GRACEFUL_STOP_WAIT: Duration = Duration::from_secs(2);

/// Number of cores available to this process (at least one).
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

// ---------------------------------------------------------------------------
// Worker seam
// ---------------------------------------------------------------------------

/// A running worker owned by the pool.
pub trait Worker: Send {
    /// Deliver the one-way stop signal. Must not block.
    fn signal_stop(&mut self);

    /// Wait up to `grace` for the worker to exit; `true` if it did.
    fn wait_exit(&mut self, grace: Duration) -> impl Future<Output = bool> + Send;

    /// Forcefully terminate the worker.
    fn kill(&mut self) -> impl Future<Output = ()> + Send;
}

/// Starts new workers.
pub trait WorkerLauncher {
    type Worker: Worker;

    fn launch(&mut self) -> std::io::Result<Self::Worker>;
}

// ---------------------------------------------------------------------------
// Process-backed workers
// ---------------------------------------------------------------------------

/// A burn worker running as a child process. Closing its stdin stops it.
#[derive(Debug)]
pub struct ChildWorker {
    child: Child,
}

impl Worker for ChildWorker {
    fn signal_stop(&mut self) {
        drop(self.child.stdin.take());
    }

    async fn wait_exit(&mut self, grace: Duration) -> bool {
        matches!(
            tokio::time::timeout(grace, self.child.wait()).await,
            Ok(Ok(_))
        )
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(pid = ?self.child.id(), error = %e, "Failed to kill burn worker");
        }
    }
}

/// Re-executes a binary in burn-worker mode.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Launch workers from the currently running executable.
    pub fn current_exe() -> std::io::Result<Self> {
        std::env::current_exe().map(Self::new)
    }
}

impl WorkerLauncher for ProcessLauncher {
    type Worker = ChildWorker;

    fn launch(&mut self) -> std::io::Result<ChildWorker> {
        let child = Command::new(&self.program)
            .arg(WORKER_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        tracing::debug!(pid = ?child.id(), "Started burn worker");
        Ok(ChildWorker { child })
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Between zero and `max_workers` live workers.
pub struct WorkerPool<L: WorkerLauncher> {
    launcher: L,
    workers: Vec<L::Worker>,
    max_workers: usize,
    grace: Duration,
}

impl<L: WorkerLauncher> WorkerPool<L> {
    pub fn new(launcher: L, max_workers: usize) -> Self {
        Self {
            launcher,
            workers: Vec::new(),
            max_workers,
            grace: GRACEFUL_STOP_WAIT,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Grow or shrink to `target`, clamped to `max_workers`, and return the
    /// live count. A call at the current size does nothing.
    ///
    /// If a launch fails the pool stops growing and reports what it has.
    pub async fn set_worker_count(&mut self, target: usize) -> usize {
        let target = target.min(self.max_workers);
        let current = self.workers.len();

        if target > current {
            for _ in current..target {
                match self.launcher.launch() {
                    Ok(worker) => self.workers.push(worker),
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            running = self.workers.len(),
                            target,
                            "Failed to start burn worker",
                        );
                        break;
                    }
                }
            }
        } else if target < current {
            let excess = self.workers.split_off(target);
            self.stop_all(excess).await;
        }

        self.workers.len()
    }

    /// Stop every worker. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        let workers = std::mem::take(&mut self.workers);
        tracing::info!(count = workers.len(), "Stopping burn workers");
        self.stop_all(workers).await;
    }

    /// Signal all of `workers` at once, then give them one shared grace
    /// period before killing the stragglers.
    async fn stop_all(&mut self, mut workers: Vec<L::Worker>) {
        for worker in &mut workers {
            worker.signal_stop();
        }

        let deadline = Instant::now() + self.grace;
        for worker in &mut workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !worker.wait_exit(remaining).await {
                tracing::warn!("Burn worker ignored stop signal, killing it");
                worker.kill().await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory launcher for pool and runner tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Debug, Default)]
    pub struct Counters {
        pub launched: AtomicUsize,
        pub signalled: AtomicUsize,
        pub killed: AtomicUsize,
    }

    impl Counters {
        pub fn launched(&self) -> usize {
            self.launched.load(Ordering::SeqCst)
        }
        pub fn signalled(&self) -> usize {
            self.signalled.load(Ordering::SeqCst)
        }
        pub fn killed(&self) -> usize {
            self.killed.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeLauncher {
        pub counters: Arc<Counters>,
        /// Workers ignore the stop signal and must be killed.
        pub stubborn: bool,
        /// Launches allowed before every further launch fails.
        pub capacity: Option<usize>,
    }

    pub struct FakeWorker {
        counters: Arc<Counters>,
        stubborn: bool,
        stopped: bool,
    }

    impl Worker for FakeWorker {
        fn signal_stop(&mut self) {
            self.stopped = true;
            self.counters.signalled.fetch_add(1, Ordering::SeqCst);
        }

        async fn wait_exit(&mut self, _grace: Duration) -> bool {
            self.stopped && !self.stubborn
        }

        async fn kill(&mut self) {
            self.counters.killed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl WorkerLauncher for FakeLauncher {
        type Worker = FakeWorker;

        fn launch(&mut self) -> std::io::Result<FakeWorker> {
            if self.capacity.is_some_and(|cap| self.counters.launched() >= cap) {
                return Err(std::io::Error::other("fork failed"));
            }
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            Ok(FakeWorker {
                counters: Arc::clone(&self.counters),
                stubborn: self.stubborn,
                stopped: false,
            })
        }
    }
}
