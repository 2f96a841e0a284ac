//! Prompt context assembly

use crate::error::ConfigError;
use crate::segment::{MacroKpi, SegmentResolution, SegmentTable};
use finai_data::{MacroSeries, MetricTable, SegmentMetrics};
use serde::Serialize;

/// Placeholder standing in for the PMI report, which travels as an attachment
pub const PMI_PLACEHOLDER: &str = "Please find the PMI data in the PDF report.";

/// Named values fed to the instruction template
///
/// Every field is always serialized; absent optional inputs become `none`
/// in the template rather than undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptContext {
    /// Segment display name
    pub segment: String,
    pub domain: String,
    pub product_type: String,
    /// Metric key → period label → value for the segment
    pub bank_data: SegmentMetrics,
    pub ifo_data: Option<String>,
    pub pmi_data: Option<String>,
    pub user_comments: String,
    pub example: String,
}

/// Configuration-derived inputs of [`build_context`]
#[derive(Debug, Clone, Copy)]
pub struct ContextDefaults<'a> {
    pub segments: &'a SegmentTable,
    pub resolution: SegmentResolution,
    pub domain: &'a str,
    pub product_type: &'a str,
}

/// Assemble the prompt context
///
/// The segment is resolved through `defaults.segments`; in strict mode an
/// unknown code is an error, in lenient mode it falls back to the default
/// segment. A segment absent from `metric_table` (or a missing table) yields
/// empty `bank_data`.
pub fn build_context(
    segment: &str,
    selected_macro_kpis: &[MacroKpi],
    user_comments: &str,
    metric_table: Option<&MetricTable>,
    macro_series: Option<&MacroSeries>,
    example: &str,
    defaults: &ContextDefaults<'_>,
) -> Result<PromptContext, ConfigError> {
    let segment = defaults.segments.resolve(segment, defaults.resolution)?;
    let segment_name = segment.display_name();

    let bank_data = metric_table
        .and_then(|table| table.segment(segment_name))
        .cloned()
        .unwrap_or_default();

    let ifo_data = selected_macro_kpis
        .contains(&MacroKpi::Ifo)
        .then_some(macro_series)
        .flatten()
        .map(MacroSeries::to_text_table);

    let pmi_data = selected_macro_kpis
        .contains(&MacroKpi::Pmi)
        .then(|| PMI_PLACEHOLDER.to_string());

    Ok(PromptContext {
        segment: segment_name.to_string(),
        domain: defaults.domain.to_string(),
        product_type: defaults.product_type.to_string(),
        bank_data,
        ifo_data,
        pmi_data,
        user_comments: user_comments.to_string(),
        example: example.to_string(),
    })
}
