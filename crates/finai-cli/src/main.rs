//! Command-line interface for finai

use anyhow::Context;
use clap::Parser;
use finai_analysis::{
    AnalysisError, Analyzer, AppConfig, BatchRequest, MacroKpi, SegmentResolution,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "finai")]
#[command(about = "Run KPI prompt generation", long_about = None)]
struct Args {
    /// Select a bank segment
    #[arg(long, value_parser = ["FinSum", "IB", "PB", "CB"])]
    segment: String,

    /// Select one or more macroeconomic indicators to include (e.g. --macro_kpis ifo pmi)
    #[arg(
        long = "macro_kpis",
        required = true,
        num_args = 1..,
        value_parser = ["ifo", "pmi"]
    )]
    macro_kpis: Vec<String>,

    /// Additional comments to enrich the analysis
    #[arg(long = "user_comments", default_value = "")]
    user_comments: String,
}

impl Args {
    fn into_request(self) -> Result<BatchRequest, AnalysisError> {
        Ok(BatchRequest {
            macro_kpis: MacroKpi::parse_list(&self.macro_kpis, SegmentResolution::Strict)?,
            segment: self.segment,
            user_comments: self.user_comments,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    finai_utils::init_stderr_tracing("warn");

    let args = Args::parse();
    let request = args.into_request()?;

    let config = Arc::new(AppConfig::from_env().context("invalid configuration")?);
    let generator = config
        .generation
        .build_client()
        .context("generation backend unavailable")?;
    let analyzer = Analyzer::with_generator(config, generator);

    info!(segment = %request.segment, kpis = ?request.macro_kpis, "running batch analysis");

    let prompt = analyzer.prepare_batch(&request).await?;
    println!("\n--- PROMPT ---\n");
    println!("{}", prompt.prompt);

    let response = analyzer.generate(&prompt).await?;
    println!("\n--- RESPONSE ---\n");
    println!("{response}");

    Ok(())
}
