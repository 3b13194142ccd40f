mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use customs_analytics_core::AnalysisConfig;

use commands::aggregation::{AggregateArgs, ConcentrationArgs, TrendArgs};
use commands::analysis::{AnalyzeArgs, QualityArgs};
use commands::anomaly::{PriceOutlierArgs, ReclassificationArgs, ScreenArgs, ValuationArgs};
use commands::kpi::{CatalogArgs, KpiArgs};
use commands::risk::RiskArgs;

/// Customs revenue analytics and valuation risk scoring
#[derive(Parser)]
#[command(
    name = "cra",
    version,
    about = "Customs revenue analytics and valuation risk scoring",
    long_about = "A CLI for analysing customs declaration lines with decimal precision. \
                  Supports revenue aggregation, concentration (HHI, ABC), valuation \
                  anomaly detection, risk scoring and WCO PMM KPI scorecards."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Analysis configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate tax and values by one or more dimensions
    Aggregate(AggregateArgs),
    /// Growth and volatility over yearly or monthly periods
    Trend(TrendArgs),
    /// Concentration (HHI) and ABC ranking along one dimension
    Concentration(ConcentrationArgs),
    /// Lines assessed well above their declared unit value
    Undervaluation(ValuationArgs),
    /// Lines declared well above their assessed unit value
    Overvaluation(ValuationArgs),
    /// HS codes with widely dispersed assessed unit prices
    PriceOutliers(PriceOutlierArgs),
    /// Frequent declared-to-assessed HS reclassifications
    Reclassification(ReclassificationArgs),
    /// Per-line screening across every line-level detector
    Screen(ScreenArgs),
    /// Risk ranking by HS heading and origin country
    Risk(RiskArgs),
    /// Risk ranking by importer
    Importers(RiskArgs),
    /// Evaluate the KPI scorecard
    Kpis(KpiArgs),
    /// Print the KPI catalog in use
    Catalog(CatalogArgs),
    /// Data-quality report for the input lines
    Quality(QualityArgs),
    /// Executive summary
    Summary(AnalyzeArgs),
    /// Run the full analysis pipeline
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn run(command: Commands, config: &AnalysisConfig) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    match command {
        Commands::Aggregate(args) => commands::aggregation::run_aggregate(args, config),
        Commands::Trend(args) => commands::aggregation::run_trend(args, config),
        Commands::Concentration(args) => commands::aggregation::run_concentration(args, config),
        Commands::Undervaluation(args) => commands::anomaly::run_undervaluation(args, config),
        Commands::Overvaluation(args) => commands::anomaly::run_overvaluation(args, config),
        Commands::PriceOutliers(args) => commands::anomaly::run_price_outliers(args, config),
        Commands::Reclassification(args) => commands::anomaly::run_reclassification(args, config),
        Commands::Screen(args) => commands::anomaly::run_screen(args, config),
        Commands::Risk(args) => commands::risk::run_group_risk(args, config),
        Commands::Importers(args) => commands::risk::run_importer_risk(args, config),
        Commands::Kpis(args) => commands::kpi::run_kpis(args, config),
        Commands::Catalog(args) => commands::kpi::run_catalog(args, config),
        Commands::Quality(args) => commands::analysis::run_quality(args),
        Commands::Summary(args) => commands::analysis::run_summary(args, config),
        Commands::Analyze(args) => commands::analysis::run_analyze(args, config),
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Version => {
            println!("cra {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        command => input::config::load_config(cli.config.as_deref())
            .and_then(|config| run(command, &config)),
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
