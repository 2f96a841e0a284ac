//! Chart payload for the web front end
//!
//! The payload mirrors a line-chart configuration: one label axis and one or
//! more datasets whose `data` align 1:1 with the labels. Chart preparation is
//! best-effort and never fails; any problem yields [`ChartPayload::empty`].

use finai_data::{MacroSeries, MetricTable, PeriodKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One line of the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    pub border_color: String,
    pub background_color: String,
    #[serde(rename = "yAxisID", skip_serializing_if = "Option::is_none", default)]
    pub y_axis_id: Option<String>,
}

/// Labels plus aligned datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Legend text and colours
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub metric_label: String,
    pub metric_border: String,
    pub metric_background: String,
    pub macro_border: String,
    pub macro_background: String,
    /// Macro indicator column to plot; the first column when `None`
    pub macro_column: Option<String>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            metric_label: crate::config::DEFAULT_CHART_LABEL.to_string(),
            metric_border: "#4285F4".to_string(),
            metric_background: "rgba(66, 133, 244, 0.2)".to_string(),
            macro_border: "#34A853".to_string(),
            macro_background: "rgba(52, 168, 83, 0.2)".to_string(),
            macro_column: None,
        }
    }
}

impl ChartPayload {
    /// No labels and a single zero-length metric dataset
    pub fn empty(style: &ChartStyle) -> Self {
        Self {
            labels: Vec::new(),
            datasets: vec![Dataset {
                label: style.metric_label.clone(),
                data: Vec::new(),
                border_color: style.metric_border.clone(),
                background_color: style.metric_background.clone(),
                y_axis_id: None,
            }],
        }
    }

    /// Every dataset has exactly one point per label
    pub fn is_aligned(&self) -> bool {
        self.datasets
            .iter()
            .all(|dataset| dataset.data.len() == self.labels.len())
    }
}

#[derive(Default)]
struct Point {
    label: String,
    metric: Option<f64>,
    macro_value: Option<f64>,
}

/// Build the chart for one metric of one segment, optionally with a macro line
pub fn prepare_chart(
    metric_table: &MetricTable,
    segment_name: &str,
    metric_key: &str,
    macro_series: Option<&MacroSeries>,
    include_macro: bool,
    style: &ChartStyle,
) -> ChartPayload {
    let macro_series = macro_series.filter(|_| include_macro);

    match try_prepare(metric_table, segment_name, metric_key, macro_series, style) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(segment = segment_name, metric = metric_key, %reason, "chart unavailable");
            ChartPayload::empty(style)
        }
    }
}

fn try_prepare(
    metric_table: &MetricTable,
    segment_name: &str,
    metric_key: &str,
    macro_series: Option<&MacroSeries>,
    style: &ChartStyle,
) -> Result<ChartPayload, String> {
    let series = metric_table
        .segment(segment_name)
        .ok_or_else(|| format!("segment '{segment_name}' not in workbook"))?
        .get(metric_key)
        .ok_or_else(|| format!("metric '{metric_key}' not found"))?;
    let granularity = series
        .granularity()
        .ok_or_else(|| "metric has no periods".to_string())?;

    let mut points: BTreeMap<PeriodKey, Point> = BTreeMap::new();
    for (period, value) in series {
        let point = points.entry(period.key()).or_default();
        point.label = period.label().to_string();
        point.metric = value.as_f64();
    }

    let mut macro_label = None;
    if let Some(macro_series) = macro_series {
        let index = match &style.macro_column {
            Some(name) => macro_series
                .column_index(name)
                .ok_or_else(|| format!("macro column '{name}' not found"))?,
            None => 0,
        };
        let column = macro_series
            .columns()
            .get(index)
            .ok_or_else(|| "macro series has no columns".to_string())?;
        macro_label = Some(format!("IFO {column}"));

        for (period, value) in macro_series.column(index) {
            let (Some(bucket), Some(value)) = (period.coarsen(granularity), value) else {
                continue;
            };
            let point = points.entry(bucket.key()).or_insert_with(|| Point {
                label: bucket.label().to_string(),
                ..Point::default()
            });
            point.macro_value = Some(value);
        }
        debug!(column = %column, ?granularity, "macro series aligned");
    }

    if points.is_empty() {
        return Err("no plottable periods".to_string());
    }

    let mut datasets = vec![Dataset {
        label: style.metric_label.clone(),
        data: points.values().map(|p| p.metric).collect(),
        border_color: style.metric_border.clone(),
        background_color: style.metric_background.clone(),
        y_axis_id: None,
    }];
    if let Some(label) = macro_label {
        datasets.push(Dataset {
            label,
            data: points.values().map(|p| p.macro_value).collect(),
            border_color: style.macro_border.clone(),
            background_color: style.macro_background.clone(),
            y_axis_id: Some("y1".to_string()),
        });
    }

    Ok(ChartPayload {
        labels: points.into_values().map(|p| p.label).collect(),
        datasets,
    })
}
