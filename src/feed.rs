//! Async event driver.
//!
//! GPS fixes, feed errors, ticks and user commands all arrive on one bounded
//! channel and are applied to a [`RunStore`] in arrival order by a single
//! task, so the store never needs a lock. Events that were already queued
//! when the user paused are applied after the pause and dropped by the
//! tracker's state gate.
//!
//! ```no_run
//! # async fn demo() -> stride_engine::Result<()> {
//! use std::time::Duration;
//! use stride_engine::{spawn_ticker, EventDriver, MemoryStore, RunStore, TrackerEvent};
//!
//! let store = RunStore::open(MemoryStore::new());
//! let (driver, events) = EventDriver::new(store, 64);
//! let driver = tokio::spawn(driver.run());
//! let ticker = spawn_ticker(events.clone(), Duration::from_secs(1));
//!
//! events.send(TrackerEvent::Start).await.ok();
//! // ... forward fixes from the location provider ...
//! events.send(TrackerEvent::Stop).await.ok();
//!
//! ticker.abort();
//! drop(events);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::persistence::KeyValueStore;
use crate::{ActivityKind, GeoSample, RunStore};

/// Everything that can happen to a tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A raw fix from the location provider
    Fix(GeoSample),
    /// The location provider reported an error
    FeedError(String),
    /// One second of wall time elapsed
    Tick,
    Start,
    StartKind(ActivityKind),
    Pause,
    Resume,
    Stop,
    Discard,
}

/// Drains [`TrackerEvent`]s into a store until every sender is dropped.
pub struct EventDriver<S: KeyValueStore> {
    store: RunStore<S>,
    events: mpsc::Receiver<TrackerEvent>,
}

impl<S: KeyValueStore> EventDriver<S> {
    /// Create a driver and the sender that feeds it.
    ///
    /// `capacity` bounds the queue; producers wait when it is full.
    pub fn new(store: RunStore<S>, capacity: usize) -> (Self, mpsc::Sender<TrackerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { store, events: rx }, tx)
    }

    /// Process events until the channel closes, then hand the store back.
    pub async fn run(mut self) -> RunStore<S> {
        info!("[EventDriver] Started");
        while let Some(event) = self.events.recv().await {
            self.apply(event);
        }
        if let Err(e) = self.store.flush() {
            warn!("[EventDriver] Final flush failed: {}", e);
        }
        info!("[EventDriver] Channel closed, {} activities in history", self.store.history().len());
        self.store
    }

    /// Apply one event. Errors are logged, never fatal to the loop.
    pub fn apply(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::Fix(sample) => match self.store.ingest(sample) {
                Ok(outcome) => debug!("[EventDriver] Fix: {:?}", outcome),
                Err(e) => warn!("[EventDriver] Rejected fix: {}", e),
            },
            TrackerEvent::FeedError(message) => self.store.report_feed_error(&message),
            TrackerEvent::Tick => {
                self.store.tick();
            }
            TrackerEvent::Start => self.start(ActivityKind::OutdoorRun),
            TrackerEvent::StartKind(kind) => self.start(kind),
            TrackerEvent::Pause => {
                self.store.pause();
            }
            TrackerEvent::Resume => {
                self.store.resume();
            }
            TrackerEvent::Stop => {
                if let Err(e) = self.store.stop() {
                    warn!("[EventDriver] Stop not persisted: {}", e);
                }
            }
            TrackerEvent::Discard => {
                self.store.discard();
            }
        }
    }

    fn start(&mut self, kind: ActivityKind) {
        if let Err(e) = self.store.start_with_kind(kind) {
            warn!("[EventDriver] Start refused: {}", e);
        }
    }

    pub fn store(&self) -> &RunStore<S> {
        &self.store
    }
}

/// Send [`TrackerEvent::Tick`] every `period` until the receiver goes away.
///
/// The first tick fires one full period after spawning.
pub fn spawn_ticker(events: mpsc::Sender<TrackerEvent>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if events.send(TrackerEvent::Tick).await.is_err() {
                debug!("[Ticker] Receiver dropped, stopping");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryStore, SignalStatus, TrackerConfig, TrackerState};

    fn store() -> RunStore<MemoryStore> {
        RunStore::open_with(MemoryStore::new(), TrackerConfig::default(), FixedClock::new(60_000))
    }

    #[tokio::test]
    async fn test_driver_applies_events_in_order() {
        let (driver, events) = EventDriver::new(store(), 16);
        let handle = tokio::spawn(driver.run());

        events.send(TrackerEvent::Start).await.unwrap();
        events
            .send(TrackerEvent::Fix(GeoSample::new(34.0, -118.0, 0, 5.0)))
            .await
            .unwrap();
        events
            .send(TrackerEvent::Fix(GeoSample::new(34.0001, -118.0, 1_000, 5.0)))
            .await
            .unwrap();
        for _ in 0..3 {
            events.send(TrackerEvent::Tick).await.unwrap();
        }
        events.send(TrackerEvent::Pause).await.unwrap();
        // Queued behind the pause, must be dropped
        events.send(TrackerEvent::Tick).await.unwrap();
        events.send(TrackerEvent::Stop).await.unwrap();
        drop(events);

        let store = handle.await.unwrap();
        assert_eq!(store.state(), TrackerState::Idle);
        assert_eq!(store.history().len(), 1);

        let run = &store.history().as_slice()[0];
        assert_eq!(run.duration_seconds, 3);
        assert_eq!(run.route.len(), 2);
    }

    #[tokio::test]
    async fn test_feed_error_marks_signal_weak() {
        let (mut driver, _events) = EventDriver::new(store(), 4);
        driver.apply(TrackerEvent::Start);
        driver.apply(TrackerEvent::FeedError("permission denied".to_string()));

        assert_eq!(driver.store().signal_status(), SignalStatus::Weak);
        assert_eq!(driver.store().state(), TrackerState::Running);
    }

    #[tokio::test]
    async fn test_invalid_fix_does_not_stop_the_loop() {
        let (mut driver, _events) = EventDriver::new(store(), 4);
        driver.apply(TrackerEvent::StartKind(ActivityKind::Trail));
        driver.apply(TrackerEvent::Fix(GeoSample::new(123.0, 0.0, 0, 5.0)));
        driver.apply(TrackerEvent::Tick);

        assert_eq!(driver.store().current_stats().elapsed_seconds, 1);
        assert!(driver.store().current_stats().trace.is_empty());
    }

    #[tokio::test]
    async fn test_ticker_sends_ticks() {
        let (tx, mut rx) = mpsc::channel(8);
        let ticker = spawn_ticker(tx, Duration::from_millis(5));

        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap();
            assert_eq!(event, Some(TrackerEvent::Tick));
        }

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), ticker)
            .await
            .unwrap()
            .unwrap();
    }
}
