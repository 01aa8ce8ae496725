//! The UI execution context.
//!
//! Exactly one thread owns the [`ViewHost`]; every UI effect is a job
//! submitted to it through a [`UiHandle`]. [`UiHandle::run`] resolves only
//! once the job has finished, which is what lets a handler send its
//! response strictly after the effect is visible.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use codeless_core::ViewHost;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

type UiJob = Box<dyn FnOnce(&mut dyn ViewHost) + Send>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UiError {
    /// The UI thread is gone.
    #[error("UI context has stopped")]
    Stopped,

    /// The job was accepted but did not complete.
    #[error("UI job did not complete")]
    Abandoned,
}

/// Submission side of the UI context. Cheap to clone.
///
/// The UI thread exits once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct UiHandle {
    jobs: mpsc::UnboundedSender<UiJob>,
}

impl UiHandle {
    /// Start the UI thread, moving `host` onto it.
    pub fn spawn(name: &str, mut host: Box<dyn ViewHost>) -> io::Result<UiHandle> {
        let (jobs, mut rx) = mpsc::unbounded_channel::<UiJob>();

        thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!("UI context started");
            while let Some(job) = rx.blocking_recv() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(host.as_mut())));
                if outcome.is_err() {
                    error!("UI job panicked");
                }
            }
            debug!("UI context stopped");
        })?;

        Ok(UiHandle { jobs })
    }

    /// Run `f` on the UI thread and wait for its result.
    pub async fn run<R, F>(&self, f: F) -> Result<R, UiError>
    where
        F: FnOnce(&mut dyn ViewHost) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: UiJob = Box::new(move |host| {
            let _ = tx.send(f(host));
        });
        self.jobs.send(job).map_err(|_| UiError::Stopped)?;
        rx.await.map_err(|_| UiError::Abandoned)
    }
}
