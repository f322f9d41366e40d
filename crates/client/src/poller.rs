//! Cancellable periodic refresh
//!
//! Refreshes run one after another on a single task, so at most one is in
//! flight. Stopping (or dropping the handle) cancels the loop and any
//! refresh still running.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{ClientError, Result};

pub struct Poller;

impl Poller {
    /// Run `refresh` now and then every `period` until stopped.
    ///
    /// A zero period is rejected up front rather than panicking inside the
    /// spawned task.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut refresh: F) -> Result<PollHandle>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(ClientError::Config(format!(
                "{} period must be greater than zero",
                name
            )));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(poller = name, ?period, "Poller started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        debug!(poller = name, "Poll tick");
                        tokio::select! {
                            _ = &mut stop_rx => break,
                            _ = refresh() => {}
                        }
                    }
                }
            }

            info!(poller = name, "Poller stopped");
        });

        Ok(PollHandle {
            stop_tx: Some(stop_tx),
            task,
        })
    }
}

/// Owner of a running [`Poller`]; dropping it stops the loop
#[derive(Debug)]
pub struct PollHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the loop and wait for it to wind down
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}
