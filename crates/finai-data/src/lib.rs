//! Source document loaders for finai
//!
//! This crate turns the raw inputs of an analysis into typed structures:
//!
//! - [`extract_metrics`]: segment workbook → [`MetricTable`]
//! - [`load_macro_series`]: macro indicator CSV → [`MacroSeries`]
//! - [`read_text`]: worked examples and notes
//!
//! Loaders are pure functions of the file they read. [`DataSource`] puts them
//! behind a trait, and [`CachedDataSource`] memoises them per file snapshot.

pub mod error;
pub mod macro_series;
pub mod metrics;
pub mod period;
pub mod source;
pub mod text;
pub mod workbook;

pub use error::{DataLoadError, Result};
pub use macro_series::{MacroRow, MacroSeries, load_macro_series};
pub use metrics::{MetricSeries, MetricTable, MetricValue, SegmentMetrics, normalize_metric_name};
pub use period::{Granularity, Period, PeriodKey};
pub use source::{CachedDataSource, DataSource, FileDataSource, SnapshotKey};
pub use text::read_text;
pub use workbook::{Cell, SheetMatcher, extract_metrics, flatten_sheet};
