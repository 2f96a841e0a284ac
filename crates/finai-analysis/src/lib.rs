//! Analysis pipeline for finai
//!
//! Ties the loaders, the prompt renderer and the generation client together:
//!
//! - [`AppConfig`]: paths, backend settings and the segment table
//! - [`build_context`]: the named values of the instruction template
//! - [`prepare_chart`]: metric and macro lines for the front end
//! - [`Analyzer`]: the lenient web flow and the strict batch flow

pub mod analyzer;
pub mod chart;
pub mod config;
pub mod context;
pub mod error;
pub mod result;
pub mod segment;

pub use analyzer::{Analyzer, BatchPrompt, PreparedAnalysis};
pub use chart::{ChartPayload, ChartStyle, Dataset, prepare_chart};
pub use config::{
    AppConfig, AppConfigBuilder, DEFAULT_CHART_LABEL, DEFAULT_CHART_METRIC, GenerationConfig,
    ProviderKind,
};
pub use context::{ContextDefaults, PMI_PLACEHOLDER, PromptContext, build_context};
pub use error::{AnalysisError, ConfigError, Result};
pub use result::{
    AnalysisReport, AnalysisRequest, AnalysisResult, BatchOutput, BatchRequest, TrendAnalysis,
    VarianceAnalysis,
};
pub use segment::{MacroKpi, Segment, SegmentResolution, SegmentTable};
