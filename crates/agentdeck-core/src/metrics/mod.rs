//! Metric summaries and the live push channel.

pub mod aggregator;
pub mod hub;
