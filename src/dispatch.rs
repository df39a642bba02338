//! Task scheduling for producers and presentation.
//!
//! The source pattern this crate distills pairs "do the work on a background
//! pool" with "deliver the result on the one context the presentation layer
//! lives on". Here that pair is explicit: producer futures run on the tokio
//! pool via [`Dispatcher::spawn`], and anything that must reach presentation
//! code (container mutations included, so their synchronous notifications
//! fire there) is posted to the [`MainContext`] and executed in order by its
//! [`MainLoop`].

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Job = Box<dyn FnOnce() + Send>;

/// Handle to the single designated "main" execution context.
///
/// Cheap to clone; jobs posted from any task run on the main loop in posting
/// order.
#[derive(Clone)]
pub struct MainContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainContext {
    /// Creates the context handle together with the loop that serves it.
    /// The loop must be driven (`main_loop.run().await`) somewhere for posted
    /// jobs to execute.
    pub fn new() -> (Self, MainLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, MainLoop { rx })
    }

    /// Enqueues `job` for execution on the main loop. Never blocks.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            log::warn!("MainContext::post - main loop is gone, dropping job");
        }
    }
}

/// Driver for a [`MainContext`]: drains the job queue in order until every
/// context handle has been dropped.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainLoop {
    pub async fn run(mut self) {
        log::info!("main_loop - start");
        while let Some(job) = self.rx.recv().await {
            job();
        }
        log::info!("main_loop - finished");
    }
}

/// Pairs the background pool producer work runs on with the [`MainContext`]
/// completion work is delivered to.
#[derive(Clone)]
pub struct Dispatcher {
    main: MainContext,
    background: tokio::runtime::Handle,
}

impl Dispatcher {
    /// Builds a dispatcher backed by the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like
    /// [`Handle::current`](tokio::runtime::Handle::current).
    pub fn new(main: MainContext) -> Self {
        Self::with_handle(main, tokio::runtime::Handle::current())
    }

    pub fn with_handle(main: MainContext, background: tokio::runtime::Handle) -> Self {
        Self { main, background }
    }

    /// The context presentation-facing work must be posted to.
    pub fn main(&self) -> &MainContext {
        &self.main
    }

    /// Runs producer work on the background pool.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.background.spawn(fut)
    }
}
