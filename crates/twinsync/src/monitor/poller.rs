//! Timed observe / diff / publish loop.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::diff::diff_population;
use super::observer::ObserveError;
use super::observer::Observer;
use super::publisher::Publisher;
use super::store::SnapshotStore;
use super::store::SnapshotStoreError;
use crate::asset::timestamp_now;
use crate::asset::AssetChangeEvent;
use crate::asset::AssetObservationEvent;
use crate::asset::AssetSnapshot;
use crate::asset::Population;
use crate::time::Sleeper;
use crate::time::TokioSleeper;

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("failed to observe baseline: {0}")]
    Baseline(#[source] ObserveError),

    #[error("failed to persist baseline: {0}")]
    Persist(#[source] SnapshotStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PollerState {
    Stopped,
    Running,
    /// Logically running, but no ticks are scheduled
    Paused,
}

#[derive(Default)]
struct Schedule {
    running: bool,
    /// Dropping the sender cancels the ticker task.
    ticker: Option<oneshot::Sender<()>>,
}

struct Shared<O, P> {
    observer: O,
    publisher: P,
    store: SnapshotStore,
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
    /// Held for the whole of a tick, so ticks never overlap.
    previous: tokio::sync::Mutex<Option<Population>>,
    schedule: Mutex<Schedule>,
}

/// Polls a gateway on a fixed interval and publishes what changed.
///
/// The last observed population is kept in memory and in the snapshot store,
/// so a restart diffs against what was seen before the restart instead of
/// reporting every device as added.
pub struct Poller<O, P> {
    shared: Arc<Shared<O, P>>,
}

impl<O, P> Poller<O, P>
where
    O: Observer + 'static,
    P: Publisher + 'static,
{
    pub fn new(observer: O, publisher: P, store: SnapshotStore, interval: Duration) -> Self {
        Self::with_sleeper(observer, publisher, store, interval, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        observer: O,
        publisher: P,
        store: SnapshotStore,
        interval: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                observer,
                publisher,
                store,
                sleeper,
                interval,
                previous: tokio::sync::Mutex::new(None),
                schedule: Mutex::new(Schedule::default()),
            }),
        }
    }

    /// Establish the baseline and start ticking.
    ///
    /// The baseline comes from the snapshot store, or from one observation
    /// that is persisted before the poller counts as running. If that fails
    /// the poller stays stopped. A freshly observed baseline is also
    /// published as a snapshot so consumers can seed from it; failing to
    /// publish it is only logged.
    pub async fn start(&self) -> Result<(), PollerError> {
        let mut previous = self.shared.previous.lock().await;
        if self.shared.schedule().running {
            warn!("Poller is already running");
            return Ok(());
        }

        let baseline = match self.shared.store.load().await {
            Some(population) => {
                info!(
                    "Loaded baseline of {} assets from {}",
                    population.len(),
                    self.shared.store.path().display()
                );
                population
            }
            None => {
                let population = self.shared.observer.observe().await.map_err(|e| {
                    error!("Failed to observe baseline: {}", e);
                    PollerError::Baseline(e)
                })?;
                self.shared.store.save(&population).await.map_err(|e| {
                    error!("Failed to persist baseline: {}", e);
                    PollerError::Persist(e)
                })?;
                info!("Established baseline of {} assets", population.len());
                self.publish_baseline(&population).await;
                population
            }
        };
        *previous = Some(baseline);
        drop(previous);

        let mut schedule = self.shared.schedule();
        schedule.running = true;
        Shared::spawn_ticker(&self.shared, &mut schedule);
        info!(
            "Poller started, polling every {}ms",
            self.shared.interval.as_millis()
        );
        Ok(())
    }

    async fn publish_baseline(&self, population: &Population) {
        let event = AssetObservationEvent::Snapshot(AssetSnapshot::new(
            timestamp_now(),
            population.clone(),
        ));
        match self.shared.publisher.publish(&event).await {
            Ok(()) => info!(count = population.len(), "Published baseline snapshot"),
            Err(e) => error!("Failed to publish baseline snapshot: {}", e),
        }
    }

    /// Cancel future ticks and transition to stopped. A tick already in
    /// progress runs to completion.
    pub fn stop(&self) {
        let mut schedule = self.shared.schedule();
        schedule.ticker = None;
        if std::mem::take(&mut schedule.running) {
            info!("Poller stopped");
        }
    }

    /// Suspend ticking. Returns whether a running poller was paused.
    pub fn pause(&self) -> bool {
        let mut schedule = self.shared.schedule();
        if !schedule.running {
            return false;
        }
        if schedule.ticker.take().is_some() {
            debug!("Poller paused");
        }
        true
    }

    /// Reschedule ticks after `pause`. Does nothing if the poller is stopped
    /// or already scheduled.
    pub fn resume(&self) {
        let mut schedule = self.shared.schedule();
        if schedule.running && schedule.ticker.is_none() {
            Shared::spawn_ticker(&self.shared, &mut schedule);
            debug!("Poller resumed");
        }
    }

    pub fn state(&self) -> PollerState {
        let schedule = self.shared.schedule();
        match (schedule.running, schedule.ticker.is_some()) {
            (false, _) => PollerState::Stopped,
            (true, true) => PollerState::Running,
            (true, false) => PollerState::Paused,
        }
    }

    /// Observe the full population once, without touching the diff state.
    pub async fn snapshot(&self) -> Result<AssetSnapshot, ObserveError> {
        let population = self.shared.observer.observe().await.inspect_err(|e| {
            error!("Failed to observe snapshot: {}", e);
        })?;
        Ok(AssetSnapshot::new(timestamp_now(), population))
    }
}

impl<O, P> Drop for Poller<O, P> {
    fn drop(&mut self) {
        self.shared.schedule().ticker = None;
    }
}

impl<O, P> Shared<O, P> {
    fn schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O, P> Shared<O, P>
where
    O: Observer + 'static,
    P: Publisher + 'static,
{
    fn spawn_ticker(this: &Arc<Self>, schedule: &mut Schedule) {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        schedule.ticker = Some(cancel_tx);

        let shared = Arc::clone(this);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = shared.sleeper.sleep(shared.interval) => shared.tick().await,
                }
            }
            debug!("Poller ticker exited");
        });
    }

    async fn tick(&self) {
        let mut previous = self.previous.lock().await;
        let Some(baseline) = previous.as_ref() else {
            warn!("Skipping poll without a baseline");
            return;
        };

        let current = match self.observer.observe().await {
            Ok(population) => population,
            Err(e) => {
                warn!("Poll failed, skipping: {}", e);
                return;
            }
        };

        let changes = diff_population(baseline, &current);
        if !changes.is_empty() {
            let count = changes.len();
            let event = AssetObservationEvent::Changes(AssetChangeEvent {
                timestamp: timestamp_now(),
                changes,
            });
            if let Err(e) = self.publisher.publish(&event).await {
                error!(count, "Failed to publish changes: {}", e);
                return;
            }
            info!(count, "Detected {} change(s)", count);
        }

        if let Err(e) = self.store.save(&current).await {
            error!("Failed to persist polled state: {}", e);
        }
        *previous = Some(current);
    }
}
