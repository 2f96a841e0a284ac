//! Request and response envelopes of the analysis pipeline

use crate::chart::ChartPayload;
use crate::segment::MacroKpi;
use serde::{Deserialize, Serialize};

pub const VARIANCE_TITLE: &str = "Variance Analysis";
pub const TREND_TITLE: &str = "Trend Analysis";
pub const TREND_SUMMARY: &str =
    "The AI has analyzed trends based on the provided data and macro indicators.";
pub const SUCCESS_MESSAGE: &str = "Analysis completed successfully";

/// Body of `POST /api/analyze`; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Front-end segment name (`Retail`, `Corporate`, `Investment`, `Total`) or code
    pub segment: Option<String>,
    /// Selected macro KPIs (`Ifo`, `PMI`)
    pub kpis: Vec<String>,
    pub comments: String,
    /// Uploaded document references; accepted and logged, not read
    pub main_documents: Vec<serde_json::Value>,
    pub additional_documents: Vec<serde_json::Value>,
}

/// Command-line invocation
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Segment code
    pub segment: String,
    pub macro_kpis: Vec<MacroKpi>,
    pub user_comments: String,
}

/// Rendered prompt and backend answer of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceAnalysis {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub title: String,
    pub summary: String,
}

/// The `result` object returned to the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub variance_analysis: VarianceAnalysis,
    pub trend_analysis: TrendAnalysis,
    pub chart: ChartPayload,
}

impl AnalysisReport {
    pub fn new(content: impl Into<String>, chart: ChartPayload) -> Self {
        Self {
            variance_analysis: VarianceAnalysis {
                title: VARIANCE_TITLE.to_string(),
                content: content.into(),
            },
            trend_analysis: TrendAnalysis {
                title: TREND_TITLE.to_string(),
                summary: TREND_SUMMARY.to_string(),
            },
            chart,
        }
    }
}

/// Successful response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub message: String,
    pub result: AnalysisReport,
}

impl AnalysisResult {
    pub fn completed(result: AnalysisReport) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            result,
        }
    }
}
