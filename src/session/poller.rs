//! Background status polling
//!
//! A single task queries the relay status on a fixed interval and forwards
//! each successful reading to the session owner over a channel. The task
//! never touches session state itself.
//!
//! Stopping is cooperative: the stop flag is checked before and after every
//! status call and raced against the interval tick, so a stop request waits
//! for at most one in-flight tool invocation.

use crate::relay::{ChannelStates, CommandRunner, RelayClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Readings buffered between the poller and the session owner
pub const UPDATE_BUFFER: usize = 8;

/// Handle to a running status poller
#[derive(Debug)]
pub struct StatusPoller {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    /// Start polling `client` every `interval`, sending readings to `updates`
    pub fn spawn<R>(
        client: Arc<RelayClient<R>>,
        interval: Duration,
        updates: mpsc::Sender<ChannelStates>,
    ) -> Self
    where
        R: CommandRunner + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            poll_task(client, interval, updates, stop_rx).await;
        });

        Self { stop_tx, handle }
    }

    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Request a stop and wait for the task to exit
    pub async fn stop(self) {
        // The receiver is gone if the task already exited.
        let _ = self.stop_tx.send(true);

        if let Err(e) = self.handle.await {
            warn!("Status poller ended abnormally: {}", e);
        }
    }
}

async fn poll_task<R: CommandRunner>(
    client: Arc<RelayClient<R>>,
    interval: Duration,
    updates: mpsc::Sender<ChannelStates>,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!("Status monitoring started (every {:?})", interval);
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    debug!("Poller stop handle dropped");
                    break;
                }
            }
        }

        if *stop_rx.borrow() {
            break;
        }

        let reading = client.query_channel_states().await;

        if *stop_rx.borrow() {
            break;
        }

        let Some(reading) = reading else {
            debug!("Status poll failed, skipping cycle");
            continue;
        };

        match updates.try_send(reading) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Session is not draining updates, dropping reading");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Update receiver dropped");
                break;
            }
        }
    }

    info!("Status monitoring stopped");
}
