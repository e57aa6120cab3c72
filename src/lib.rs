//! floorcap: NFT collection floor-price and market-cap tracker
//!
//! Samples a collection's floor price on a cadence, keeps the series in an
//! append-only store, and serves a cleaned history with percent changes over
//! configurable lookback windows.

pub mod api;
pub mod backfill;
pub mod config;
pub mod error;
pub mod history;
pub mod ingestion;
pub mod provider;
pub mod rates;
pub mod scheduler;
pub mod store;

pub use error::{TrackerError, TrackerResult};
