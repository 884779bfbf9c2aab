// Telemetry store - Reactive per-device state with an explicit observer list
use crate::domain::device::DeviceKind;
use crate::domain::reading::Reading;
use crate::domain::telemetry::{HISTORY_CAPACITY, SourceMode, TelemetryState};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Observer = dyn Fn(&TelemetryState) + Send + Sync;

struct ObserverEntry {
    id: u64,
    active: AtomicBool,
    callback: Box<Observer>,
}

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    entries: Vec<Arc<ObserverEntry>>,
}

/// Snapshots awaiting delivery, in mutation order
#[derive(Default)]
struct Outbox {
    pending: VecDeque<TelemetryState>,
    draining: bool,
}

/// State is only ever touched through these methods. No method blocks on
/// I/O or fails; observers run with no store lock held.
///
/// Observers see every mutation in the order it was applied. One thread
/// delivers at a time: a mutation made while another thread (or an
/// observer) is delivering is handed to that delivery run, so the
/// mutating call may return before its observers have run.
pub struct TelemetryStore {
    state: Mutex<TelemetryState>,
    observers: Arc<Mutex<ObserverList>>,
    outbox: Mutex<Outbox>,
}

/// Handle returned by [`TelemetryStore::subscribe`]. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes its observer"]
pub struct Subscription {
    entry: Arc<ObserverEntry>,
    observers: Weak<Mutex<ObserverList>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelemetryStore {
    pub(in crate::application) fn new(kind: DeviceKind, source_mode: SourceMode) -> Self {
        Self {
            state: Mutex::new(TelemetryState::new(kind, source_mode)),
            observers: Arc::new(Mutex::new(ObserverList::default())),
            outbox: Mutex::new(Outbox::default()),
        }
    }

    pub fn snapshot(&self) -> TelemetryState {
        lock(&self.state).clone()
    }

    pub fn kind(&self) -> DeviceKind {
        lock(&self.state).kind
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    pub fn source_mode(&self) -> SourceMode {
        lock(&self.state).source_mode
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        lock(&self.observers).entries.len()
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&TelemetryState) + Send + Sync + 'static,
    {
        let mut list = lock(&self.observers);
        let entry = Arc::new(ObserverEntry {
            id: list.next_id,
            active: AtomicBool::new(true),
            callback: Box::new(observer),
        });
        list.next_id += 1;
        list.entries.push(entry.clone());

        Subscription {
            entry,
            observers: Arc::downgrade(&self.observers),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.mutate(|state| state.connected = connected);
    }

    /// Like `set_connected` but leaves delivery to [`Self::flush_notifications`],
    /// so callers can mark the store while holding their own locks.
    pub(in crate::application) fn record_connected(&self, connected: bool) {
        self.record(|state| state.connected = connected);
    }

    /// Flip Simulated <-> Live and return the new mode
    pub fn toggle_source_mode(&self) -> SourceMode {
        self.mutate(|state| {
            state.source_mode = state.source_mode.toggled();
            state.source_mode
        })
    }

    pub fn add_reading(&self, reading: Reading) {
        self.mutate(|state| {
            if state.history.len() == HISTORY_CAPACITY {
                state.history.pop_front();
            }
            state.history.push_back(reading.clone());
            state.latest = reading;
        });
    }

    /// Discard the history and install `readings`, keeping the newest
    /// `HISTORY_CAPACITY`. `latest` moves to the newest element, if any.
    pub fn replace_history(&self, readings: Vec<Reading>) {
        self.mutate(|state| {
            let skip = readings.len().saturating_sub(HISTORY_CAPACITY);
            state.history = readings.into_iter().skip(skip).collect();
            if let Some(newest) = state.history.back() {
                state.latest = newest.clone();
            }
        });
    }

    fn mutate<R>(&self, apply: impl FnOnce(&mut TelemetryState) -> R) -> R {
        let result = self.record(apply);
        self.flush_notifications();
        result
    }

    fn record<R>(&self, apply: impl FnOnce(&mut TelemetryState) -> R) -> R {
        let mut state = lock(&self.state);
        let result = apply(&mut *state);
        if self.has_observers() {
            // Queued under the state lock so the outbox follows mutation order
            lock(&self.outbox).pending.push_back(state.clone());
        }
        result
    }

    /// Deliver queued snapshots unless another delivery run is active
    pub(in crate::application) fn flush_notifications(&self) {
        {
            let mut outbox = lock(&self.outbox);
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        let _reset = DrainReset(&self.outbox);

        loop {
            let next = {
                let mut outbox = lock(&self.outbox);
                let next = outbox.pending.pop_front();
                if next.is_none() {
                    outbox.draining = false;
                }
                next
            };
            let Some(snapshot) = next else {
                break;
            };
            self.notify(&snapshot);
        }
    }

    fn has_observers(&self) -> bool {
        !lock(&self.observers).entries.is_empty()
    }

    fn notify(&self, snapshot: &TelemetryState) {
        // Work on a copy so observers may unsubscribe while being notified
        let observers = lock(&self.observers).entries.clone();
        for observer in observers {
            if observer.active.load(Ordering::Acquire) {
                (observer.callback)(snapshot);
            }
        }
    }
}

/// Releases the delivery slot if an observer panics mid-run
struct DrainReset<'a>(&'a Mutex<Outbox>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.0).draining = false;
        }
    }
}

impl Subscription {
    /// Idempotent; safe to call from inside an observer
    pub fn unsubscribe(&self) {
        if !self.entry.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(observers) = self.observers.upgrade() {
            let id = self.entry.id;
            lock(&observers).entries.retain(|e| e.id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::FieldValue;
    use chrono::{Duration, Utc};
    use std::sync::atomic::AtomicUsize;

    fn reading(seq: usize) -> Reading {
        Reading::new(
            Utc::now() + Duration::seconds(seq as i64),
            [("temperature", FieldValue::Number(seq as f64))],
        )
    }

    fn temperatures(state: &TelemetryState) -> Vec<f64> {
        state
            .history
            .iter()
            .filter_map(|r| r.number("temperature"))
            .collect()
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        for seq in 0..45 {
            store.add_reading(reading(seq));
            assert!(store.snapshot().history.len() <= HISTORY_CAPACITY);
        }

        let state = store.snapshot();
        let expected: Vec<f64> = (15..45).map(|s| s as f64).collect();
        assert_eq!(temperatures(&state), expected);
        assert_eq!(state.latest.number("temperature"), Some(44.0));
        assert_eq!(state.history.back(), Some(&state.latest));
    }

    #[test]
    fn test_replace_with_empty_keeps_latest() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        store.add_reading(reading(7));
        let before = store.snapshot().latest;

        store.replace_history(Vec::new());

        let state = store.snapshot();
        assert!(state.history.is_empty());
        assert_eq!(state.latest, before);
    }

    #[test]
    fn test_replace_discards_and_sets_latest() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        store.add_reading(reading(100));

        store.replace_history((0..40).map(reading).collect());

        let state = store.snapshot();
        assert_eq!(state.history.len(), HISTORY_CAPACITY);
        assert_eq!(temperatures(&state).first(), Some(&10.0));
        assert_eq!(state.latest.number("temperature"), Some(39.0));
    }

    #[test]
    fn test_default_latest_is_baseline() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Live);
        let state = store.snapshot();
        assert!(!state.connected);
        assert_eq!(state.source_mode, SourceMode::Live);
        assert_eq!(state.latest.number("temperature"), Some(15.30));
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_toggle_does_not_touch_history() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        store.add_reading(reading(1));
        store.add_reading(reading(2));
        let before = store.snapshot().history;

        assert_eq!(store.toggle_source_mode(), SourceMode::Live);

        let state = store.snapshot();
        assert_eq!(state.history, before);
        assert_eq!(state.source_mode, SourceMode::Live);
    }

    #[test]
    fn test_observers_notified_in_subscription_order() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first_calls = calls.clone();
        let _first = store.subscribe(move |state| {
            first_calls.lock().unwrap().push(("first", state.connected));
        });
        let second_calls = calls.clone();
        let _second = store.subscribe(move |state| {
            second_calls.lock().unwrap().push(("second", state.connected));
        });

        store.set_connected(true);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![("first", true), ("second", true)]
        );
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.add_reading(reading(1));
        subscription.unsubscribe();
        subscription.unsubscribe();
        store.add_reading(reading(2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        drop(store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.set_connected(true);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_during_notification() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let victim_calls = Arc::new(AtomicUsize::new(0));

        let slot = victim_slot.clone();
        let _killer = store.subscribe(move |_| {
            if let Some(victim) = slot.lock().unwrap().as_ref() {
                victim.unsubscribe();
            }
        });
        let counter = victim_calls.clone();
        let victim = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *victim_slot.lock().unwrap() = Some(victim);

        store.set_connected(true);
        store.set_connected(false);

        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_notifications_follow_mutation_order_across_threads() {
        for _ in 0..50 {
            let store = Arc::new(TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated));
            let seen = Arc::new(Mutex::new(Vec::new()));

            let sink = seen.clone();
            let _subscription = store.subscribe(move |state| {
                // Uneven observer latency widens the window between writers
                let pause = (state.history.len() % 4) as u64 * 75;
                std::thread::sleep(std::time::Duration::from_micros(pause));
                sink.lock().unwrap().push((state.source_mode, state.history.len()));
            });

            let adder = {
                let store = store.clone();
                std::thread::spawn(move || {
                    for seq in 0..25 {
                        store.add_reading(reading(seq));
                    }
                })
            };
            let toggler = {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.toggle_source_mode();
                    }
                })
            };
            adder.join().unwrap();
            toggler.join().unwrap();

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 50);
            // History only grows here, so a shorter one means a stale delivery
            assert!(seen.windows(2).all(|pair| pair[0].1 <= pair[1].1));
            let last = store.snapshot();
            assert_eq!(seen.last(), Some(&(last.source_mode, last.history.len())));
        }
    }

    #[test]
    fn test_mutation_from_observer_is_delivered_after_current() {
        let store = Arc::new(TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated));
        let order = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&store);
        let _reactor = store.subscribe(move |state| {
            if state.connected && state.history.is_empty() {
                if let Some(store) = weak.upgrade() {
                    store.add_reading(reading(1));
                }
            }
        });
        let log = order.clone();
        let _recorder = store.subscribe(move |state| {
            log.lock().unwrap().push((state.connected, state.history.len()));
        });

        store.set_connected(true);

        assert_eq!(*order.lock().unwrap(), vec![(true, 0), (true, 1)]);
    }

    #[test]
    fn test_recorded_change_waits_for_flush() {
        let store = TelemetryStore::new(DeviceKind::Soil, SourceMode::Simulated);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let _subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.record_connected(true);
        assert!(store.is_connected());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        store.flush_notifications();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
