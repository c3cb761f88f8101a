//! mix-roi — marketing-mix attribution and what-if spend forecasting from
//! the command line.
//!
//! Fits the attribution model on a CSV/Excel/JSON file (or the built-in sample
//! data) and prints ROI tables and forecasts as JSON.

mod ingest;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ingest::DataSource;
use mix_attribution::forecast::{baseline_scenario, spend_bounds, sweep};
use mix_attribution::{compute_attribution, forecast, AttributionOutcome, SpendScenario};
use mix_core::config::MixConfig;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mix-roi")]
#[command(about = "Marketing-mix attribution, channel ROI, and spend forecasting")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables `MIX_ROI__*` override it)
    #[arg(long, global = true, env = "MIX_ROI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Marketing data file (.csv, .xlsx or .json)
    #[arg(short, long, conflicts_with = "sample", required_unless_present = "sample")]
    input: Option<PathBuf>,

    /// Use the built-in sample dataset
    #[arg(long, default_value_t = false)]
    sample: bool,

    /// Sample generator seed (overrides config)
    #[arg(long, requires = "sample")]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit the attribution model and print the ROI table
    Attribute {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Forecast revenue and ROI for a spend scenario
    Forecast {
        #[command(flatten)]
        input: InputArgs,

        /// Scenario spend as CHANNEL=AMOUNT (repeatable)
        #[arg(long = "spend", value_parser = parse_spend)]
        spend: Vec<(String, f64)>,

        /// JSON file holding a {"channel": spend} object
        #[arg(long)]
        scenario: Option<PathBuf>,
    },

    /// Scale one channel's historical spend by each factor and forecast
    Sweep {
        #[command(flatten)]
        input: InputArgs,

        /// Channel to scale
        #[arg(long)]
        channel: String,

        /// Spend multipliers (repeatable; defaults to the configured range)
        #[arg(long = "factor")]
        factors: Vec<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mix_roi=info,mix_attribution=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // An explicit config file must load; otherwise fall back to defaults.
    let config = match cli.config.as_deref() {
        Some(path) => MixConfig::load_from(Some(path))
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MixConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            MixConfig::default()
        }),
    };

    match cli.command {
        Commands::Attribute { input } => cmd_attribute(config, input),
        Commands::Forecast {
            input,
            spend,
            scenario,
        } => cmd_forecast(config, input, spend, scenario),
        Commands::Sweep {
            input,
            channel,
            factors,
        } => cmd_sweep(config, input, channel, factors),
    }
}

fn cmd_attribute(config: MixConfig, input: InputArgs) -> anyhow::Result<()> {
    let (source, outcome) = run_attribution(config, input)?;

    print_json(&json!({
        "data_source": source.describe(),
        "run_id": outcome.roi_table.run_id,
        "computed_at": outcome.roi_table.computed_at,
        "roi": outcome.roi_table.rows(),
        "summary": outcome.roi_table.summary(),
        "channel_totals": outcome.channel_totals,
        "model": {
            "intercept": outcome.model.intercept,
            "coefficients": outcome.model.channels.iter()
                .zip(&outcome.model.coefficients)
                .map(|(c, v)| json!({ "channel": c, "coefficient": v }))
                .collect::<Vec<_>>(),
            "zero_spend": outcome.model.zero_spend,
            "observations": outcome.model.observations,
            "r_squared": outcome.model.r_squared,
        },
    }))
}

fn cmd_forecast(
    config: MixConfig,
    input: InputArgs,
    spend: Vec<(String, f64)>,
    scenario_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let forecast_config = config.forecast.clone();
    let (_, outcome) = run_attribution(config, input)?;
    let table = &outcome.roi_table;

    let mut scenario: SpendScenario = match scenario_path {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("opening scenario {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("parsing scenario {}", path.display()))?
        }
        None => SpendScenario::new(),
    };
    scenario.extend(spend);
    if scenario.is_empty() {
        info!("No scenario given, forecasting the historical allocation");
        scenario = baseline_scenario(table);
    }

    let result = forecast(table, &scenario)?;
    let bounds = table
        .channels()
        .map(|c| spend_bounds(table, c, &forecast_config).map(|b| (c.to_string(), b)))
        .collect::<Result<std::collections::BTreeMap<_, _>, _>>()?;

    print_json(&json!({
        "scenario": scenario,
        "forecast": result,
        "spend_bounds": bounds,
        "assumption": "ROI is assumed constant as spend changes; diminishing returns and saturation are not modelled.",
    }))
}

fn cmd_sweep(
    config: MixConfig,
    input: InputArgs,
    channel: String,
    factors: Vec<f64>,
) -> anyhow::Result<()> {
    let factors = if factors.is_empty() {
        let lo = config.forecast.min_spend_factor;
        let hi = config.forecast.max_spend_factor;
        (0..=4).map(|i| lo + (hi - lo) * i as f64 / 4.0).collect()
    } else {
        factors
    };
    let (_, outcome) = run_attribution(config, input)?;
    let points = sweep(&outcome.roi_table, &channel, &factors)?;

    print_json(&json!({ "channel": channel, "points": points }))
}

fn run_attribution(
    mut config: MixConfig,
    input: InputArgs,
) -> anyhow::Result<(DataSource, AttributionOutcome)> {
    if let Some(seed) = input.seed {
        config.sample.seed = seed;
    }
    let source = match input.input {
        Some(path) => DataSource::File(path),
        None => DataSource::Sample,
    };

    let table = source
        .load(&config)
        .with_context(|| format!("loading {}", source.describe()))?;
    let outcome = compute_attribution(&table, &config)?;
    Ok((source, outcome))
}

fn parse_spend(raw: &str) -> Result<(String, f64), String> {
    let (channel, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CHANNEL=AMOUNT, got {raw:?}"))?;
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid spend amount {:?}", amount.trim()))?;
    Ok((channel.trim().to_string(), amount))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
