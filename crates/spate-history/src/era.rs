//! Single-era bucket store and roll-forward math.

use std::collections::VecDeque;

use serde::Serialize;

/// Tolerance absorbing scheduler jitter at bucket boundaries.
///
/// Fixed at 500 ms; the era chaining math downstream is validated only
/// against this value.
pub const BUFFER_SLACK_MS: i64 = 500;

/// Newest-bounded cap on samples returned per era series.
pub const MAX_SERIES_SAMPLES: usize = 60;

/// One aggregated rate bucket.
///
/// `sample_count` lets the era fold further same-bucket writes into the
/// running average without re-reading prior raw data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistorySample {
    /// Bucket start, unix milliseconds.
    pub timestamp: i64,
    /// Average upload rate over the bucket, bytes per second.
    pub upload_rate: f64,
    /// Average download rate over the bucket, bytes per second.
    pub download_rate: f64,
    /// Number of raw writes folded into this bucket.
    pub sample_count: u32,
}

/// Static shape of one era in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraConfig {
    /// Stable name used in series payloads.
    pub name: &'static str,
    /// Bucket width in milliseconds.
    pub interval_ms: i64,
    /// How long buckets are retained; `None` keeps them forever.
    pub retention_ms: Option<i64>,
}

/// The era chain, finest to coarsest.
pub const ERA_CHAIN: [EraConfig; 7] = [
    EraConfig {
        name: "five_second",
        interval_ms: 5_000,
        retention_ms: Some(5 * 60 * 1_000),
    },
    EraConfig {
        name: "twenty_second",
        interval_ms: 20 * 1_000,
        retention_ms: Some(30 * 60 * 1_000),
    },
    EraConfig {
        name: "fifteen_minute",
        interval_ms: 15 * 60 * 1_000,
        retention_ms: Some(24 * 60 * 60 * 1_000),
    },
    EraConfig {
        name: "hourly",
        interval_ms: 60 * 60 * 1_000,
        retention_ms: Some(30 * 24 * 60 * 60 * 1_000),
    },
    EraConfig {
        name: "four_hour",
        interval_ms: 4 * 60 * 60 * 1_000,
        retention_ms: Some(24 * 7 * 24 * 60 * 60 * 1_000),
    },
    EraConfig {
        name: "twelve_hour",
        interval_ms: 12 * 60 * 60 * 1_000,
        retention_ms: Some(365 * 24 * 60 * 60 * 1_000),
    },
    EraConfig {
        name: "weekly",
        interval_ms: 7 * 24 * 60 * 60 * 1_000,
        retention_ms: None,
    },
];

/// Fixed-resolution, fixed-retention bucket store.
///
/// All methods take the current time explicitly; timers live in the
/// [`crate::service::HistoryService`], keeping the bucket math
/// deterministic under test.
#[derive(Debug)]
pub struct Era {
    config: EraConfig,
    buckets: VecDeque<HistorySample>,
}

impl Era {
    /// Construct an empty era.
    #[must_use]
    pub fn new(config: EraConfig) -> Self {
        Self {
            config,
            buckets: VecDeque::new(),
        }
    }

    /// Static shape of this era.
    #[must_use]
    pub fn config(&self) -> &EraConfig {
        &self.config
    }

    /// Record one rate sample at `now_ms`.
    ///
    /// A new bucket starts when the elapsed time since the current
    /// bucket's start exceeds `interval - BUFFER_SLACK_MS`; otherwise the
    /// sample folds into the current bucket via a running-count weighted
    /// average.
    pub fn add_data(&mut self, upload_rate: f64, download_rate: f64, now_ms: i64) {
        let boundary = self.config.interval_ms - BUFFER_SLACK_MS;
        match self.buckets.back_mut() {
            Some(last) if now_ms - last.timestamp <= boundary => {
                let n = f64::from(last.sample_count);
                last.upload_rate = last.upload_rate.mul_add(n, upload_rate) / (n + 1.0);
                last.download_rate = last.download_rate.mul_add(n, download_rate) / (n + 1.0);
                last.sample_count += 1;
            }
            _ => self.buckets.push_back(HistorySample {
                timestamp: now_ms,
                upload_rate,
                download_rate,
                sample_count: 1,
            }),
        }
    }

    /// Purge buckets older than the retention window.
    pub fn clean_old(&mut self, now_ms: i64) {
        let Some(retention) = self.config.retention_ms else {
            return;
        };
        while let Some(front) = self.buckets.front() {
            if now_ms - front.timestamp > retention {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    /// Arithmetic mean of the in-window buckets, if any.
    #[must_use]
    pub fn window_mean(&self, now_ms: i64) -> Option<(f64, f64)> {
        let mut count = 0_u32;
        let mut upload = 0.0;
        let mut download = 0.0;
        for bucket in self.in_window(now_ms) {
            upload += bucket.upload_rate;
            download += bucket.download_rate;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let count = f64::from(count);
        Some((upload / count, download / count))
    }

    /// In-window buckets, newest-bounded to [`MAX_SERIES_SAMPLES`].
    #[must_use]
    pub fn series(&self, now_ms: i64) -> Vec<HistorySample> {
        let samples: Vec<HistorySample> = self.in_window(now_ms).copied().collect();
        let skip = samples.len().saturating_sub(MAX_SERIES_SAMPLES);
        samples[skip..].to_vec()
    }

    /// Number of buckets currently held, including out-of-window ones
    /// awaiting cleanup.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no buckets are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn in_window(&self, now_ms: i64) -> impl Iterator<Item = &HistorySample> {
        let cutoff = self
            .config
            .retention_ms
            .map(|retention| now_ms - retention);
        self.buckets
            .iter()
            .filter(move |bucket| cutoff.is_none_or(|cutoff| bucket.timestamp >= cutoff))
    }
}

/// Fold the source era's averaged output into the next coarser era.
///
/// This is how a five-second era eventually populates a seven-day era
/// without ever storing raw five-second data long-term.
pub fn roll_forward(source: &Era, target: &mut Era, now_ms: i64) {
    if let Some((upload, download)) = source.window_mean(now_ms) {
        target.add_data(upload, download, now_ms);
    }
}
