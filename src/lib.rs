//! Monthly workforce turnover KPIs and classifier threshold selection.
//!
//! [`metrics::compute_metrics`] enriches a monthly headcount series;
//! [`thresholds::evaluate`] picks an operating point for a scored batch. The
//! [`pipeline`] module wires both to CSV input and the exported artifacts.

pub mod config;
pub mod error;
pub mod io;
pub mod junit;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod thresholds;
