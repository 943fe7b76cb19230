//! FIFO job queue with a bounded pool of concurrently running jobs.

use std::future::Future;

use tokio::{sync::mpsc, task::JoinSet};
use tracing::*;

use crate::cancel::CancellationToken;

/// Producer side of the job queue.
#[derive(Debug)]
pub(crate) struct JobSender<J> {
    tx: mpsc::UnboundedSender<J>,
}

impl<J> Clone for JobSender<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<J> JobSender<J> {
    /// Appends a job to the queue, handing it back if the queue is closed.
    pub(crate) fn put(&self, job: J) -> Result<(), J> {
        self.tx.send(job).map_err(|e| e.0)
    }
}

pub(crate) fn job_queue<J>() -> (JobSender<J>, mpsc::UnboundedReceiver<J>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (JobSender { tx }, rx)
}

/// Runs jobs from the queue in arrival order, with at most
/// `max_concurrent_jobs` of them in flight at once.
///
/// Returns once `stop` is tripped or every sender is gone and the queue has
/// been drained.  Jobs still running at that point are awaited, jobs still
/// queued are dropped.
pub(crate) async fn process_job_queue<J, H, F>(
    mut jobs: mpsc::UnboundedReceiver<J>,
    max_concurrent_jobs: usize,
    handler: H,
    stop: CancellationToken,
) where
    J: Send + 'static,
    H: Fn(J) -> F,
    F: Future<Output = ()> + Send + 'static,
{
    let max_concurrent_jobs = max_concurrent_jobs.max(1);
    let mut running = JoinSet::new();
    let mut open = true;

    loop {
        if !open && running.is_empty() {
            debug!("job queue closed and drained");
            break;
        }

        tokio::select! {
            biased;

            _ = stop.cancelled() => {
                debug!(in_flight = running.len(), "job queue stopping");
                break;
            }

            Some(res) = running.join_next(), if !running.is_empty() => {
                log_join_result(res);
            }

            job = jobs.recv(), if open && running.len() < max_concurrent_jobs => {
                match job {
                    Some(job) => {
                        running.spawn(handler(job));
                    }
                    None => open = false,
                }
            }
        }
    }

    jobs.close();
    while let Some(res) = running.join_next().await {
        log_join_result(res);
    }
}

fn log_join_result(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        error!(%e, "proving job task failed");
    }
}
