//! Application configuration
//!
//! [`AppConfig`] is built once at start-up, from the environment or with the
//! builder, and handed to every component behind an `Arc`. Paths that are not
//! set explicitly are derived from the project root and data directory.

use crate::error::ConfigError;
use crate::segment::SegmentTable;
use async_trait::async_trait;
use finai_llm::providers::{GeminiConfig, GeminiProvider, OpenAIConfig, OpenAIProvider};
use finai_llm::{
    CompletionRequest, CompletionResponse, GenerationClient, GenerationSettings, LLMError,
    LLMProvider,
};
use finai_prompt::DEFAULT_INSTRUCTION_TEMPLATE;
use finai_utils::{EnvLookup, ProcessEnv, parse_bool, parse_var};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CHART_METRIC: &str = "provision_for_credit_losses_bps_avg_loans";
pub const DEFAULT_CHART_LABEL: &str = "Provision for Credit Losses (bps of Avg Loans)";

/// Generation backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Google Gemini `generateContent`
    #[default]
    Gemini,
    /// OpenAI Chat Completions or a compatible server
    OpenAI,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAI => "gpt-4o",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Settings of the generation backend
#[derive(Clone)]
pub struct GenerationConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    /// Provider default when `None`
    pub api_base: Option<String>,
    pub timeout: Duration,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: ProviderKind::Gemini.default_model().to_string(),
            api_key: None,
            api_base: None,
            timeout: Duration::from_secs(120),
            max_tokens: 8192,
            temperature: None,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GenerationConfig {
    fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt.clone(),
            timeout: self.timeout,
        }
    }

    fn provider(&self) -> Result<Arc<dyn LLMProvider>, LLMError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            LLMError::ConfigurationError(format!(
                "{} environment variable not set",
                self.provider.api_key_var()
            ))
        })?;
        let timeout_secs = self.timeout.as_secs().max(1);

        Ok(match self.provider {
            ProviderKind::Gemini => {
                let mut config = GeminiConfig::new(api_key).with_timeout(timeout_secs);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base);
                }
                Arc::new(GeminiProvider::with_config(config)?)
            }
            ProviderKind::OpenAI => {
                let mut config = OpenAIConfig::new(api_key).with_timeout(timeout_secs);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base);
                }
                Arc::new(OpenAIProvider::with_config(config)?)
            }
        })
    }

    /// Build a client, failing when the backend cannot be set up
    pub fn build_client(&self) -> Result<GenerationClient, LLMError> {
        Ok(GenerationClient::new(self.provider()?, self.settings()))
    }

    /// Build a client; a backend that cannot be set up fails each call instead
    pub fn build_client_lenient(&self) -> GenerationClient {
        match self.provider() {
            Ok(provider) => GenerationClient::new(provider, self.settings()),
            Err(err) => {
                warn!(error = %err, "generation backend unavailable");
                GenerationClient::new(
                    Arc::new(UnavailableProvider {
                        reason: err.to_string(),
                    }),
                    self.settings(),
                )
            }
        }
    }
}

/// Stands in for a backend whose configuration is incomplete
struct UnavailableProvider {
    reason: String,
}

#[async_trait]
impl LLMProvider for UnavailableProvider {
    async fn complete(&self, _request: CompletionRequest) -> finai_llm::Result<CompletionResponse> {
        Err(LLMError::ConfigurationError(self.reason.clone()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Immutable application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub macro_csv: PathBuf,
    pub pmi_pdf: PathBuf,
    pub workbook: PathBuf,
    pub examples: PathBuf,
    pub template_dir: PathBuf,
    pub template_name: String,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub domain: String,
    pub product_type: String,
    pub chart_metric: String,
    pub chart_label: String,
    /// First indicator column when `None`
    pub macro_chart_column: Option<String>,
    pub cache_ttl: Duration,
    pub generation: GenerationConfig,
    pub bind_addr: SocketAddr,
    /// Include the error chain in HTTP 500 bodies
    pub expose_error_details: bool,
    pub segments: SegmentTable,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfigBuilder::default().assemble()
    }
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    /// Load from any variable source
    pub fn from_lookup(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let path = |key: &str| env.get(key).map(PathBuf::from);

        let provider = match env.get("FINAI_PROVIDER") {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };
        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            provider,
            model: env
                .get("FINAI_MODEL")
                .unwrap_or_else(|| provider.default_model().to_string()),
            api_key: env.get(provider.api_key_var()),
            api_base: env.get("FINAI_API_BASE"),
            timeout: parse_var::<u64>(env, "FINAI_TIMEOUT_SECS")?
                .map_or(defaults.timeout, Duration::from_secs),
            max_tokens: parse_var(env, "FINAI_MAX_TOKENS")?.unwrap_or(defaults.max_tokens),
            temperature: parse_var(env, "FINAI_TEMPERATURE")?,
            system_prompt: env.get("FINAI_SYSTEM_PROMPT"),
        };

        let mut builder = Self::builder().generation(generation);
        builder.project_root = path("FINAI_PROJECT_ROOT");
        builder.data_dir = path("FINAI_DATA_DIR");
        builder.macro_csv = path("FINAI_MACRO_CSV");
        builder.pmi_pdf = path("FINAI_PMI_PDF");
        builder.workbook = path("FINAI_WORKBOOK");
        builder.examples = path("FINAI_EXAMPLES");
        builder.template_dir = path("FINAI_TEMPLATE_DIR");
        builder.template_name = env.get("FINAI_TEMPLATE");
        builder.upload_dir = path("FINAI_UPLOAD_DIR");
        builder.static_dir = path("FINAI_STATIC_DIR");
        builder.chart_metric = env.get("FINAI_CHART_METRIC");
        builder.chart_label = env.get("FINAI_CHART_LABEL");
        builder.macro_chart_column = env.get("FINAI_MACRO_COLUMN");
        builder.cache_ttl = parse_var::<u64>(env, "FINAI_CACHE_TTL_SECS")?.map(Duration::from_secs);
        builder.bind_addr = parse_var(env, "FINAI_BIND")?;
        builder.expose_error_details = parse_bool(env, "FINAI_EXPOSE_ERRORS")?;

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.template_name.trim().is_empty() {
            return Err(ConfigError::Invalid("template name is empty".to_string()));
        }
        if self.chart_metric.trim().is_empty() {
            return Err(ConfigError::Invalid("chart metric is empty".to_string()));
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "cache TTL must be greater than 0".to_string(),
            ));
        }
        if self.generation.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "generation timeout must be greater than 0".to_string(),
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "temperature {t} outside 0.0..=2.0"
                )));
            }
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`AppConfig`]
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    project_root: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    macro_csv: Option<PathBuf>,
    pmi_pdf: Option<PathBuf>,
    workbook: Option<PathBuf>,
    examples: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    template_name: Option<String>,
    upload_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    domain: Option<String>,
    product_type: Option<String>,
    chart_metric: Option<String>,
    chart_label: Option<String>,
    macro_chart_column: Option<String>,
    cache_ttl: Option<Duration>,
    generation: Option<GenerationConfig>,
    bind_addr: Option<SocketAddr>,
    expose_error_details: Option<bool>,
    segments: Option<SegmentTable>,
}

impl AppConfigBuilder {
    /// Root that relative defaults are derived from
    pub fn project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn macro_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.macro_csv = Some(path.into());
        self
    }

    pub fn pmi_pdf(mut self, path: impl Into<PathBuf>) -> Self {
        self.pmi_pdf = Some(path.into());
        self
    }

    pub fn workbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.workbook = Some(path.into());
        self
    }

    pub fn examples(mut self, path: impl Into<PathBuf>) -> Self {
        self.examples = Some(path.into());
        self
    }

    pub fn template_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(path.into());
        self
    }

    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    pub fn upload_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(path.into());
        self
    }

    pub fn static_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    /// Metric plotted in the chart, with its legend label
    pub fn chart_metric(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.chart_metric = Some(key.into());
        self.chart_label = Some(label.into());
        self
    }

    pub fn macro_chart_column(mut self, column: impl Into<String>) -> Self {
        self.macro_chart_column = Some(column.into());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    pub fn expose_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = Some(expose);
        self
    }

    pub fn segments(mut self, segments: SegmentTable) -> Self {
        self.segments = Some(segments);
        self
    }

    fn assemble(self) -> AppConfig {
        let root = self.project_root.unwrap_or_else(|| PathBuf::from("."));
        let data = self.data_dir.unwrap_or_else(|| root.join("data"));
        let in_data = |name: &str| data.join(name);
        let chart_label = match (&self.chart_metric, self.chart_label) {
            (_, Some(label)) => label,
            (Some(metric), None) => metric.clone(),
            (None, None) => DEFAULT_CHART_LABEL.to_string(),
        };

        AppConfig {
            macro_csv: self
                .macro_csv
                .unwrap_or_else(|| in_data("202504_ifo_gsk_prepared.csv")),
            pmi_pdf: self.pmi_pdf.unwrap_or_else(|| in_data("202502_pmi.pdf")),
            workbook: self
                .workbook
                .unwrap_or_else(|| in_data("FDS-Q4-2024-13032025.xlsb")),
            examples: self.examples.unwrap_or_else(|| in_data("examples.txt")),
            template_dir: self.template_dir.unwrap_or_else(|| root.join("prompts")),
            template_name: self
                .template_name
                .unwrap_or_else(|| DEFAULT_INSTRUCTION_TEMPLATE.to_string()),
            upload_dir: self.upload_dir.unwrap_or_else(|| root.join("uploads")),
            static_dir: self.static_dir.unwrap_or_else(|| root.join("public")),
            domain: self.domain.unwrap_or_else(|| "Banking".to_string()),
            product_type: self.product_type.unwrap_or_else(|| "Loans".to_string()),
            chart_metric: self
                .chart_metric
                .unwrap_or_else(|| DEFAULT_CHART_METRIC.to_string()),
            chart_label,
            macro_chart_column: self.macro_chart_column,
            cache_ttl: self.cache_ttl.unwrap_or(Duration::from_secs(300)),
            generation: self.generation.unwrap_or_default(),
            bind_addr: self
                .bind_addr
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5000))),
            expose_error_details: self.expose_error_details.unwrap_or(false),
            segments: self.segments.unwrap_or_default(),
            data_dir: data,
            project_root: root,
        }
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = self.assemble();
        config.validate()?;
        Ok(config)
    }
}

impl AppConfig {
    /// Path of a file inside the upload directory
    pub fn upload_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }
}
