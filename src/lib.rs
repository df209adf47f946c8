//! Core library for the report-consolidator command line application.
//!
//! Tabular business reports are read by the adapters under [`io`], mapped
//! onto one canonical schema by [`normalize`], merged by [`consolidate`],
//! turned into indicators by [`indicators`], and aggregated by [`report`].
//! [`pipeline`] wires the stages together for the CLI and the tests.

pub mod config;
pub mod consolidate;
pub mod error;
pub mod indicators;
pub mod io;
pub mod log;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod report;

pub use error::{RecordLocation, ReportError, Result};
