//! Timer-driven era chain.
//!
//! Each era is an independent actor: one recurring task purges its
//! expired buckets, and one recurring task per adjacent pair rolls the
//! finer era's averaged output forward on the coarser era's cadence. All
//! tasks are owned here and aborted on shutdown so no timer handle
//! leaks.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::era::{ERA_CHAIN, Era, HistorySample, roll_forward};

/// One era's samples as surfaced to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EraSeries {
    /// Stable era name.
    pub era: String,
    /// Bucket width in milliseconds.
    pub interval_ms: i64,
    /// In-window buckets, newest-bounded.
    pub samples: Vec<HistorySample>,
}

/// Owner of the chained eras and their timers.
pub struct HistoryService {
    eras: Vec<Arc<Mutex<Era>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl HistoryService {
    /// Build the standard era chain and start its timers.
    #[must_use]
    pub fn start() -> Self {
        let eras: Vec<Arc<Mutex<Era>>> = ERA_CHAIN
            .iter()
            .map(|config| Arc::new(Mutex::new(Era::new(*config))))
            .collect();

        let mut tasks = Vec::new();
        for era in &eras {
            let config = *lock(era).config();
            if config.retention_ms.is_none() {
                continue;
            }
            let era = Arc::clone(era);
            tasks.push(tokio::spawn(async move {
                let mut timer = tokio::time::interval(millis(config.interval_ms));
                timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    timer.tick().await;
                    lock(&era).clean_old(now_ms());
                }
            }));
        }

        for pair in eras.windows(2) {
            let source = Arc::clone(&pair[0]);
            let target = Arc::clone(&pair[1]);
            let cadence = lock(&target).config().interval_ms;
            let target_name = lock(&target).config().name;
            tasks.push(tokio::spawn(async move {
                let mut timer = tokio::time::interval(millis(cadence));
                timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick fires immediately; skip it so the source
                // era has a full cadence worth of buckets to average.
                timer.tick().await;
                loop {
                    timer.tick().await;
                    let now = now_ms();
                    let source_era = lock(&source);
                    let mut target_era = lock(&target);
                    roll_forward(&source_era, &mut target_era, now);
                    debug!(era = target_name, "rolled history forward");
                }
            }));
        }

        Self { eras, tasks }
    }

    /// Record one global rate sample into the finest era.
    pub fn record(&self, upload_rate: f64, download_rate: f64) {
        if let Some(finest) = self.eras.first() {
            lock(finest).add_data(upload_rate, download_rate, now_ms());
        }
    }

    /// Current series for every era, finest first.
    #[must_use]
    pub fn series(&self) -> Vec<EraSeries> {
        let now = now_ms();
        self.eras
            .iter()
            .map(|era| {
                let era = lock(era);
                let config = era.config();
                EraSeries {
                    era: config.name.to_string(),
                    interval_ms: config.interval_ms,
                    samples: era.series(now),
                }
            })
            .collect()
    }

    /// Stop all era timers. Idempotent.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for HistoryService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(era: &Arc<Mutex<Era>>) -> std::sync::MutexGuard<'_, Era> {
    era.lock().expect("era mutex poisoned")
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or(u64::MAX))
}

fn now_ms() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recorded_samples_appear_in_the_finest_series() {
        let mut service = HistoryService::start();
        service.record(1_000.0, 100.0);
        service.record(2_000.0, 200.0);

        let series = service.series();
        assert_eq!(series.len(), ERA_CHAIN.len());
        let finest = &series[0];
        assert_eq!(finest.era, "five_second");
        assert_eq!(finest.samples.len(), 1);
        assert_eq!(finest.samples[0].sample_count, 2);
        assert!((finest.samples[0].upload_rate - 1_500.0).abs() < 1e-9);

        service.shutdown();
    }

    #[tokio::test]
    async fn shutdown_stops_all_timers() {
        let mut service = HistoryService::start();
        let task_count = service.tasks.len();
        assert!(task_count > 0);
        service.shutdown();
        assert!(service.tasks.is_empty());
        // A second shutdown is a no-op.
        service.shutdown();
    }
}
