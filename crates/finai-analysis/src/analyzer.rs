//! Analysis pipeline
//!
//! Two entry points share the same steps (resolve segment, load sources,
//! build the context, render, generate) but differ in how failures are
//! handled:
//!
//! - [`Analyzer::analyze`] serves the web front end. Unknown segments fall back
//!   to the default, missing sources become empty inputs, and a rendering or
//!   generation failure becomes the analysis text.
//! - [`Analyzer::run_batch`] serves the command line. Every failure propagates.

use crate::chart::{ChartStyle, prepare_chart};
use crate::config::AppConfig;
use crate::context::{ContextDefaults, PromptContext, build_context};
use crate::error::Result;
use crate::result::{AnalysisReport, AnalysisRequest, AnalysisResult, BatchOutput, BatchRequest};
use crate::segment::{MacroKpi, Segment, SegmentResolution};
use finai_data::{CachedDataSource, DataSource, FileDataSource, MacroSeries, MetricTable};
use finai_llm::GenerationClient;
use finai_prompt::PromptRenderer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Inputs gathered for one lenient analysis
#[derive(Debug, Clone)]
pub struct PreparedAnalysis {
    pub segment: Segment,
    pub macro_kpis: Vec<MacroKpi>,
    pub context: PromptContext,
    /// Document sent next to the prompt (the PMI report)
    pub attachment: Option<PathBuf>,
    pub metrics: Arc<MetricTable>,
    pub macro_series: Option<Arc<MacroSeries>>,
}

/// Rendered prompt of a batch run, before generation
#[derive(Debug, Clone)]
pub struct BatchPrompt {
    pub prompt: String,
    pub attachment: Option<PathBuf>,
}

/// Runs analyses against a data source, a template directory and a backend
pub struct Analyzer {
    config: Arc<AppConfig>,
    data: Arc<dyn DataSource>,
    renderer: PromptRenderer,
    generator: GenerationClient,
}

impl Analyzer {
    pub fn new(
        config: Arc<AppConfig>,
        data: Arc<dyn DataSource>,
        generator: GenerationClient,
    ) -> Self {
        let renderer = PromptRenderer::new(&config.template_dir)
            .with_instruction_template(&config.template_name);

        Self {
            config,
            data,
            renderer,
            generator,
        }
    }

    /// Files read through a snapshot cache
    pub fn with_generator(config: Arc<AppConfig>, generator: GenerationClient) -> Self {
        let files = FileDataSource::new(config.segments.sheet_matcher());
        let data = Arc::new(CachedDataSource::new(files, config.cache_ttl));
        Self::new(config, data, generator)
    }

    /// Files read through a snapshot cache; an unconfigured backend fails per call
    pub fn with_cached_files(config: Arc<AppConfig>) -> Self {
        let generator = config.generation.build_client_lenient();
        Self::with_generator(config, generator)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn renderer(&self) -> &PromptRenderer {
        &self.renderer
    }

    fn chart_style(&self) -> ChartStyle {
        ChartStyle {
            metric_label: self.config.chart_label.clone(),
            macro_column: self.config.macro_chart_column.clone(),
            ..ChartStyle::default()
        }
    }

    fn context_defaults(&self, resolution: SegmentResolution) -> ContextDefaults<'_> {
        ContextDefaults {
            segments: &self.config.segments,
            resolution,
            domain: &self.config.domain,
            product_type: &self.config.product_type,
        }
    }

    fn attachment_for(&self, kpis: &[MacroKpi]) -> Option<PathBuf> {
        kpis.contains(&MacroKpi::Pmi)
            .then(|| self.config.pmi_pdf.clone())
    }

    /// Resolve and load everything the lenient flow needs
    #[instrument(skip(self, request), fields(segment = ?request.segment, kpis = ?request.kpis))]
    pub async fn prepare(&self, request: &AnalysisRequest) -> Result<PreparedAnalysis> {
        let requested = request.segment.as_deref().unwrap_or_default();
        let segment = self
            .config
            .segments
            .resolve(requested, SegmentResolution::Lenient)?;
        let macro_kpis = MacroKpi::parse_list(&request.kpis, SegmentResolution::Lenient)?;

        let documents = request.main_documents.len() + request.additional_documents.len();
        if documents > 0 {
            debug!(documents, "request lists uploaded documents");
        }

        let macro_series = if macro_kpis.contains(&MacroKpi::Ifo) {
            match self.data.macro_series(&self.config.macro_csv).await {
                Ok(series) => Some(series),
                Err(err) => {
                    warn!(error = %err, "continuing without macro series");
                    None
                }
            }
        } else {
            None
        };

        let metrics = match self.data.metric_table(&self.config.workbook).await {
            Ok(table) => table,
            Err(err) => {
                warn!(error = %err, "continuing without workbook metrics");
                Arc::new(MetricTable::new())
            }
        };

        let example = match self.data.text(&self.config.examples).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "continuing without examples");
                Arc::from("")
            }
        };

        let context = build_context(
            requested,
            &macro_kpis,
            &request.comments,
            Some(&metrics),
            macro_series.as_deref(),
            &example,
            &self.context_defaults(SegmentResolution::Lenient),
        )?;

        Ok(PreparedAnalysis {
            segment,
            attachment: self.attachment_for(&macro_kpis),
            macro_kpis,
            context,
            metrics,
            macro_series,
        })
    }

    async fn render_and_generate(
        &self,
        context: &PromptContext,
        attachment: Option<&Path>,
    ) -> Result<String> {
        let prompt = self.renderer.render_instruction_prompt(context)?;
        Ok(self.generator.generate_response(&prompt, attachment).await?)
    }

    /// Lenient analysis for the web front end
    #[instrument(skip(self, request))]
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult> {
        let prepared = self.prepare(&request).await?;

        let content = match self
            .render_and_generate(&prepared.context, prepared.attachment.as_deref())
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "analysis text unavailable");
                format!("Error generating analysis: {err}")
            }
        };

        let include_macro = prepared.macro_kpis.contains(&MacroKpi::Ifo);
        let chart = prepare_chart(
            &prepared.metrics,
            prepared.segment.display_name(),
            &self.config.chart_metric,
            prepared.macro_series.as_deref(),
            include_macro,
            &self.chart_style(),
        );

        info!(
            segment = %prepared.segment,
            labels = chart.labels.len(),
            "analysis completed"
        );
        Ok(AnalysisResult::completed(AnalysisReport::new(content, chart)))
    }

    /// Strict loading and rendering for the command line
    #[instrument(skip(self, request), fields(segment = %request.segment))]
    pub async fn prepare_batch(&self, request: &BatchRequest) -> Result<BatchPrompt> {
        let segment = self
            .config
            .segments
            .resolve(&request.segment, SegmentResolution::Strict)?;

        let macro_series = if request.macro_kpis.contains(&MacroKpi::Ifo) {
            Some(self.data.macro_series(&self.config.macro_csv).await?)
        } else {
            None
        };
        let metrics = self.data.metric_table(&self.config.workbook).await?;
        let example = self.data.text(&self.config.examples).await?;

        let context = build_context(
            segment.code(),
            &request.macro_kpis,
            &request.user_comments,
            Some(&metrics),
            macro_series.as_deref(),
            &example,
            &self.context_defaults(SegmentResolution::Strict),
        )?;
        let prompt = self.renderer.render_instruction_prompt(&context)?;

        Ok(BatchPrompt {
            prompt,
            attachment: self.attachment_for(&request.macro_kpis),
        })
    }

    /// Send a prepared batch prompt to the backend
    pub async fn generate(&self, prompt: &BatchPrompt) -> Result<String> {
        Ok(self
            .generator
            .generate_response(&prompt.prompt, prompt.attachment.as_deref())
            .await?)
    }

    /// Strict end-to-end run: prompt and response
    pub async fn run_batch(&self, request: BatchRequest) -> Result<BatchOutput> {
        let prompt = self.prepare_batch(&request).await?;
        let response = self.generate(&prompt).await?;
        Ok(BatchOutput {
            prompt: prompt.prompt,
            response,
        })
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("template", &self.renderer.instruction_template())
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, ConfigError};
    use async_trait::async_trait;
    use finai_data::DataLoadError;
    use finai_llm::providers::{GeminiConfig, GeminiProvider};
    use finai_llm::{
        CompletionRequest, CompletionResponse, GenerationSettings, LLMError, LLMProvider,
        Message, StopReason, TokenUsage,
    };
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    const TEMPLATE: &str = "\
Segment: {{ segment }} ({{ domain }}/{{ product_type }})
Data: {{ bank_data }}
IFO: {% if ifo_data %}{{ ifo_data }}{% else %}n/a{% endif %}
PMI: {{ pmi_data or 'n/a' }}
Comments: {{ user_comments }}
Example: {{ example }}
";

    /// Answers with a fixed text and remembers the prompt it saw
    struct EchoProvider {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(&self, request: CompletionRequest) -> finai_llm::Result<CompletionResponse> {
            let prompt = request.messages[0].text_content();
            self.seen.lock().unwrap().push(prompt);
            Ok(CompletionResponse {
                message: Message::assistant("Provisions are stable."),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    struct Fixture {
        dir: TempDir,
        config: Arc<AppConfig>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("data")).unwrap();
        std::fs::create_dir_all(root.join("prompts")).unwrap();
        std::fs::write(root.join("prompts/instruction_prompt.jinja"), TEMPLATE).unwrap();
        std::fs::write(
            root.join("data/202504_ifo_gsk_prepared.csv"),
            "Monat;Geschäftsklima\n11/2024;85,6\n12/2024;84,7\n",
        )
        .unwrap();
        std::fs::write(root.join("data/examples.txt"), "Example analysis").unwrap();

        let config = AppConfig::builder().project_root(root).build().unwrap();
        Fixture {
            dir,
            config: Arc::new(config),
        }
    }

    fn analyzer_with(config: Arc<AppConfig>, provider: Arc<dyn LLMProvider>) -> Analyzer {
        let data = Arc::new(FileDataSource::new(config.segments.sheet_matcher()));
        Analyzer::new(config, data, GenerationClient::new(provider, GenerationSettings::default()))
    }

    fn echo() -> Arc<EchoProvider> {
        Arc::new(EchoProvider {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_total_without_kpis() {
        let fx = fixture();
        let analyzer = analyzer_with(fx.config.clone(), echo());

        let request = AnalysisRequest {
            segment: Some("Total".to_string()),
            ..AnalysisRequest::default()
        };
        let prepared = analyzer.prepare(&request).await.unwrap();

        assert_eq!(prepared.context.segment, "Financial Summary");
        assert!(prepared.context.ifo_data.is_none());
        assert!(prepared.context.pmi_data.is_none());
        assert!(prepared.attachment.is_none());
        assert_eq!(prepared.context.example, "Example analysis");
    }

    #[tokio::test]
    async fn test_retail_with_ifo() {
        let fx = fixture();
        let provider = echo();
        let analyzer = analyzer_with(fx.config.clone(), provider.clone());

        let request = AnalysisRequest {
            segment: Some("Retail".to_string()),
            kpis: vec!["Ifo".to_string()],
            comments: "Watch provisions".to_string(),
            ..AnalysisRequest::default()
        };
        let prepared = analyzer.prepare(&request).await.unwrap();
        assert_eq!(prepared.macro_kpis, [MacroKpi::Ifo]);
        assert_eq!(prepared.context.segment, "Private Bank");
        assert!(prepared.context.ifo_data.as_deref().unwrap().contains("84.7"));

        let result = analyzer.analyze(request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.result.variance_analysis.content, "Provisions are stable.");
        assert!(result.result.chart.is_aligned());

        let prompt = provider.seen.lock().unwrap()[0].clone();
        assert!(prompt.contains("Segment: Private Bank (Banking/Loans)"));
        assert!(prompt.contains("Comments: Watch provisions"));
        assert!(prompt.contains("PMI: n/a"));
    }

    #[tokio::test]
    async fn test_missing_macro_csv_still_succeeds() {
        let fx = fixture();
        std::fs::remove_file(&fx.config.macro_csv).unwrap();
        let analyzer = analyzer_with(fx.config.clone(), echo());

        let request = AnalysisRequest {
            segment: Some("Corporate".to_string()),
            kpis: vec!["Ifo".to_string()],
            ..AnalysisRequest::default()
        };
        let prepared = analyzer.prepare(&request).await.unwrap();
        assert!(prepared.context.ifo_data.is_none());

        let result = analyzer.analyze(request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.result.chart.datasets.len(), 1);
        assert!(result.result.chart.is_aligned());
    }

    #[tokio::test]
    async fn test_network_error_becomes_content() {
        let fx = fixture();
        let provider = GeminiProvider::with_config(
            GeminiConfig::new("test-key").with_api_base("http://127.0.0.1:1"),
        )
        .unwrap();
        let analyzer = analyzer_with(fx.config.clone(), Arc::new(provider));

        let result = analyzer.analyze(AnalysisRequest::default()).await.unwrap();
        assert!(result.success);
        assert!(
            result
                .result
                .variance_analysis
                .content
                .starts_with("Error generating analysis:")
        );
    }

    #[tokio::test]
    async fn test_missing_template_becomes_content() {
        let fx = fixture();
        std::fs::remove_file(fx.dir.path().join("prompts/instruction_prompt.jinja")).unwrap();
        let analyzer = analyzer_with(fx.config.clone(), echo());

        let result = analyzer.analyze(AnalysisRequest::default()).await.unwrap();
        assert!(
            result
                .result
                .variance_analysis
                .content
                .starts_with("Error generating analysis:")
        );
    }

    #[tokio::test]
    async fn test_pmi_attachment_path() {
        let fx = fixture();
        let analyzer = analyzer_with(fx.config.clone(), echo());

        let request = AnalysisRequest {
            kpis: vec!["PMI".to_string()],
            ..AnalysisRequest::default()
        };
        let prepared = analyzer.prepare(&request).await.unwrap();
        assert_eq!(prepared.attachment.as_deref(), Some(fx.config.pmi_pdf.as_path()));
        assert!(prepared.context.pmi_data.is_some());
    }

    #[tokio::test]
    async fn test_batch_is_strict() {
        let fx = fixture();
        let analyzer = analyzer_with(fx.config.clone(), echo());

        let err = analyzer
            .run_batch(BatchRequest {
                segment: "Retail".to_string(),
                macro_kpis: vec![MacroKpi::Ifo],
                user_comments: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Config(ConfigError::UnknownSegment(_))
        ));

        // The workbook fixture does not exist, which is fatal in batch mode
        let err = analyzer
            .run_batch(BatchRequest {
                segment: "PB".to_string(),
                macro_kpis: vec![MacroKpi::Ifo],
                user_comments: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Data(DataLoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_generation_error_propagates() {
        struct Failing;

        #[async_trait]
        impl LLMProvider for Failing {
            async fn complete(&self, _r: CompletionRequest) -> finai_llm::Result<CompletionResponse> {
                Err(LLMError::Timeout(Duration::from_secs(1)))
            }

            fn name(&self) -> &'static str {
                "failing"
            }
        }

        let fx = fixture();
        let data = Arc::new(StubWorkbook);
        let analyzer = Analyzer::new(
            fx.config.clone(),
            data,
            GenerationClient::new(Arc::new(Failing), GenerationSettings::default()),
        );

        let request = BatchRequest {
            segment: "IB".to_string(),
            macro_kpis: vec![],
            user_comments: "note".to_string(),
        };
        let prompt = analyzer.prepare_batch(&request).await.unwrap();
        assert!(prompt.prompt.contains("Segment: Investment Bank"));
        assert!(prompt.prompt.contains("Comments: note"));

        let err = analyzer.run_batch(request).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Generation(LLMError::Timeout(_))));
    }

    /// Empty workbook, real text files
    struct StubWorkbook;

    #[async_trait]
    impl DataSource for StubWorkbook {
        async fn metric_table(&self, _path: &Path) -> finai_data::Result<Arc<MetricTable>> {
            Ok(Arc::new(MetricTable::new()))
        }

        async fn macro_series(&self, path: &Path) -> finai_data::Result<Arc<MacroSeries>> {
            finai_data::load_macro_series(path).map(Arc::new)
        }

        async fn text(&self, path: &Path) -> finai_data::Result<Arc<str>> {
            finai_data::read_text(path).map(Arc::from)
        }
    }
}
