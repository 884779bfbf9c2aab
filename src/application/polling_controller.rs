// Polling controller - Connect/disconnect lifecycle around a single polling task
use crate::application::source_provider::SourceProvider;
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::telemetry::SourceMode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

/// Both provider variants for one device kind
#[derive(Clone)]
pub struct Providers {
    pub simulated: Arc<dyn SourceProvider>,
    pub live: Arc<dyn SourceProvider>,
}

impl Providers {
    pub fn select(&self, mode: SourceMode) -> Arc<dyn SourceProvider> {
        match mode {
            SourceMode::Simulated => self.simulated.clone(),
            SourceMode::Live => self.live.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    /// History window fetched once on connect; 0 disables the backfill
    pub backfill: usize,
}

/// Disconnected while `stop_signal` is empty, Connected while it holds the
/// sender half wired to the running polling task.
pub struct PollingController {
    store: Arc<TelemetryStore>,
    providers: Providers,
    schedule: PollSchedule,
    stop_signal: Mutex<Option<oneshot::Sender<()>>>,
}

impl PollingController {
    pub(in crate::application) fn new(
        store: Arc<TelemetryStore>,
        providers: Providers,
        schedule: PollSchedule,
    ) -> Self {
        Self {
            store,
            providers,
            schedule,
            stop_signal: Mutex::new(None),
        }
    }

    pub fn store(&self) -> Arc<TelemetryStore> {
        self.store.clone()
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Start polling. A no-op while already connected.
    ///
    /// Must be called from within a Tokio runtime. Observers are notified
    /// after the controller lock is released, so they may call back into
    /// `connect`/`disconnect`.
    pub fn connect(&self) {
        {
            let mut stop_signal = self.lock_stop_signal();
            if stop_signal.is_some() {
                tracing::debug!(device = %self.store.kind(), "connect ignored, already polling");
                return;
            }

            let (stop_tx, stop_rx) = oneshot::channel();
            *stop_signal = Some(stop_tx);
            // Marked under the lock so the store flag tracks `stop_signal`
            self.store.record_connected(true);

            let cycle = PollCycle {
                store: self.store.clone(),
                providers: self.providers.clone(),
                backfill: self.schedule.backfill,
            };
            tokio::spawn(run_polling(cycle, self.schedule.interval, stop_rx));
        }

        tracing::info!(
            device = %self.store.kind(),
            interval_secs = self.schedule.interval.as_secs_f64(),
            "polling started"
        );
        self.store.flush_notifications();
    }

    /// Stop scheduling ticks. A fetch already in flight still completes and
    /// is applied. A no-op while disconnected.
    pub fn disconnect(&self) {
        {
            let mut stop_signal = self.lock_stop_signal();
            let Some(stop_tx) = stop_signal.take() else {
                tracing::debug!(device = %self.store.kind(), "disconnect ignored, not polling");
                return;
            };

            // The task may already be gone; nothing to stop in that case
            let _ = stop_tx.send(());
            self.store.record_connected(false);
        }

        tracing::info!(device = %self.store.kind(), "polling stopped");
        self.store.flush_notifications();
    }

    /// Switch the provider used by fetches issued from now on
    pub fn toggle_source_mode(&self) -> SourceMode {
        let mode = self.store.toggle_source_mode();
        tracing::info!(device = %self.store.kind(), mode = ?mode, "source mode switched");
        mode
    }

    fn lock_stop_signal(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.stop_signal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
struct PollCycle {
    store: Arc<TelemetryStore>,
    providers: Providers,
    backfill: usize,
}

impl PollCycle {
    fn provider(&self) -> Arc<dyn SourceProvider> {
        self.providers.select(self.store.source_mode())
    }

    async fn backfill(&self) {
        if self.backfill == 0 {
            return;
        }
        match self.provider().fetch_history(self.backfill).await {
            Ok(readings) => {
                tracing::debug!(
                    device = %self.store.kind(),
                    count = readings.len(),
                    "history backfilled"
                );
                self.store.replace_history(readings);
            }
            Err(e) => {
                tracing::warn!(device = %self.store.kind(), error = %e, "history backfill failed");
            }
        }
    }

    async fn tick(&self) {
        match self.provider().fetch_latest().await {
            Ok(reading) => self.store.add_reading(reading),
            Err(e) => {
                tracing::warn!(device = %self.store.kind(), error = %e, "poll tick skipped");
            }
        }
    }
}

async fn run_polling(cycle: PollCycle, interval: Duration, mut stop: oneshot::Receiver<()>) {
    cycle.backfill().await;

    // First tick of a tokio interval completes immediately
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }
        // Not raced against `stop`: an in-flight fetch always lands
        cycle.tick().await;
    }
}
