use std::time::Duration;

use async_trait::async_trait;

/// Capability to wait for a duration.
///
/// The poller and the executor wait through this trait so tests can observe
/// or skip the waits instead of sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and records every requested duration
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub waits: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Sleeper driven by the test: every `sleep` announces itself and then
/// blocks until `fire` releases it.
///
/// Because the ticker loop only sleeps between ticks, an announcement also
/// means the previous tick has finished.
#[cfg(test)]
pub struct ManualSleeper {
    permits: tokio::sync::Semaphore,
    waiting_tx: tokio::sync::mpsc::UnboundedSender<Duration>,
    waiting_rx: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<Duration>>,
}

#[cfg(test)]
impl ManualSleeper {
    pub fn new() -> Self {
        let (waiting_tx, waiting_rx) = tokio::sync::mpsc::unbounded_channel();
        Self {
            permits: tokio::sync::Semaphore::new(0),
            waiting_tx,
            waiting_rx: tokio::sync::Mutex::new(waiting_rx),
        }
    }

    /// Wait until something is blocked in `sleep`, returning the duration it asked for.
    pub async fn next_wait(&self) -> Duration {
        self.waiting_rx
            .lock()
            .await
            .recv()
            .await
            .expect("sender lives as long as the sleeper")
    }

    /// Whether a `sleep` call announced itself and has not been collected yet.
    pub async fn has_pending_wait(&self) -> bool {
        !self.waiting_rx.lock().await.is_empty()
    }

    /// Release one blocked `sleep`.
    pub fn fire(&self) {
        self.permits.add_permits(1);
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for ManualSleeper {
    async fn sleep(&self, duration: Duration) {
        let _ = self.waiting_tx.send(duration);
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}
