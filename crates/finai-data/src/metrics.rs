//! Metric tables extracted from the segment workbook

use crate::period::{Granularity, Period};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// One cell of a metric series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value; numeric text (decimal comma accepted) is parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(text) => parse_number(text),
        }
    }
}

/// Parse `95,4`, `1.234` or `-12.5` style numbers, ignoring surrounding blanks
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalised = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.replace(',', "")
    };
    normalised.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Values of one metric, ordered chronologically by period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSeries(BTreeMap<Period, MetricValue>);

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; a later value for the same period replaces the earlier one
    pub fn insert(&mut self, period: Period, value: MetricValue) {
        self.0.insert(period, value);
    }

    pub fn get(&self, period: &Period) -> Option<&MetricValue> {
        self.0.get(period)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Period, MetricValue> {
        self.0.iter()
    }

    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finest granularity among the series' periods
    pub fn granularity(&self) -> Option<Granularity> {
        self.0.keys().map(Period::granularity).max()
    }
}

impl FromIterator<(Period, MetricValue)> for MetricSeries {
    fn from_iter<I: IntoIterator<Item = (Period, MetricValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MetricSeries {
    type Item = (&'a Period, &'a MetricValue);
    type IntoIter = btree_map::Iter<'a, Period, MetricValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Metric key → series for one segment
pub type SegmentMetrics = BTreeMap<String, MetricSeries>;

/// Segment display name → metrics of that segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable(BTreeMap<String, SegmentMetrics>);

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics of a segment, looked up by display name
    pub fn segment(&self, name: &str) -> Option<&SegmentMetrics> {
        self.0.get(name)
    }

    /// Series of one metric of one segment
    pub fn series(&self, segment: &str, metric: &str) -> Option<&MetricSeries> {
        self.0.get(segment)?.get(metric)
    }

    /// Merge metrics into a segment; metrics already present are replaced
    pub fn extend_segment(&mut self, name: impl Into<String>, metrics: SegmentMetrics) {
        self.0.entry(name.into()).or_default().extend(metrics);
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Turn a workbook row caption into a metric key
///
/// `Provision for credit losses (in bps of average loans)` becomes
/// `provision_for_credit_losses_bps_avg_loans`.
pub fn normalize_metric_name(name: &str) -> String {
    let lowered = name.to_lowercase().replace(['(', ')'], " ");

    let words: Vec<String> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !matches!(*w, "in" | "of" | "the"))
        .map(|w| if w == "average" { "avg".to_string() } else { w.to_string() })
        .collect();

    words.join("_")
}
