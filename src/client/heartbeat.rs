//! Heartbeat sends on a fixed interval.

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use bytes::Bytes;
use tokio::{select, time::MissedTickBehavior};
use tracing::Level;

use super::{
    Client,
    runtime::{Inner, lock},
};

impl Client {
    /// Send `package` as a heartbeat.
    ///
    /// A zero `interval` performs a single immediate send. Otherwise a task
    /// sends `package` now and then every `interval`, replacing any previous
    /// heartbeat task. Sends are skipped while paused or disconnected.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn heartbeat(&self, package: impl Into<Bytes>, interval: Duration) {
        if self.inner.shutdown.is_cancelled() {
            tracing::debug!("client stopped; heartbeat ignored");
            return;
        }
        let package = package.into();
        let inner = Arc::clone(&self.inner);

        if interval.is_zero() {
            self.inner.tasks.spawn(async move { beat(&inner, &package).await });
            return;
        }

        let token = self.inner.shutdown.child_token();
        let previous = lock(&self.inner.heartbeat).replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        self.inner.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                select! {
                    biased;

                    () = token.cancelled() => break,
                    _ = ticker.tick() => beat(&inner, &package).await,
                }
            }
        });
    }

    /// Suppress heartbeat sends without cancelling the timer.
    pub fn pause_heartbeat(&self) { self.inner.heartbeat_paused.store(true, Ordering::Release); }

    /// Resume heartbeat sends on the next tick.
    pub fn resume_heartbeat(&self) {
        self.inner.heartbeat_paused.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_heartbeat_paused(&self) -> bool {
        self.inner.heartbeat_paused.load(Ordering::Acquire)
    }
}

async fn beat(inner: &Inner, package: &Bytes) {
    if inner.heartbeat_paused.load(Ordering::Acquire) || inner.current_link().is_none() {
        return;
    }
    if let Err(err) = inner.send(package.clone()).await {
        inner.log(Level::WARN, &format!("heartbeat send failed: {err}"));
    }
}
