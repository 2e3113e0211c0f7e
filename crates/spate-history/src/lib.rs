//! Cascading transfer-rate history.
//!
//! A chain of fixed-size time buckets ("eras") records rate samples at
//! increasing granularity and decreasing retention: the finest era holds
//! five-second buckets for five minutes, the coarsest holds seven-day
//! buckets forever. Each era periodically folds its own averaged output
//! into the next coarser era, so fine-grained raw data never needs to be
//! kept long-term.

pub mod era;
pub mod service;

pub use era::{
    BUFFER_SLACK_MS, ERA_CHAIN, Era, EraConfig, HistorySample, MAX_SERIES_SAMPLES, roll_forward,
};
pub use service::{EraSeries, HistoryService};
