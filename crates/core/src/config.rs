use serde::Deserialize;
use std::path::Path;

/// Root configuration. Loaded from an optional TOML file and environment
/// variables with the prefix `MIX_ROI__`.
#[derive(Debug, Clone, Deserialize)]
pub struct MixConfig {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub sample: SampleConfig,
}

/// Column headers that map onto the four required fields.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_period_column")]
    pub period_column: String,
    #[serde(default = "default_channel_column")]
    pub channel_column: String,
    #[serde(default = "default_spend_column")]
    pub spend_column: String,
    #[serde(default = "default_sales_column")]
    pub sales_column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    /// Relative threshold below which a column's orthogonal residual is
    /// treated as zero.
    #[serde(default = "default_rank_tolerance")]
    pub rank_tolerance: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_min_spend_factor")]
    pub min_spend_factor: f64,
    #[serde(default = "default_max_spend_factor")]
    pub max_spend_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_sample_periods")]
    pub periods: usize,
    #[serde(default = "default_baseline_sales")]
    pub baseline_sales: f64,
    /// Standard deviation-like amplitude of uniform sales noise.
    #[serde(default = "default_noise")]
    pub noise: f64,
    #[serde(default = "default_sample_channels")]
    pub channels: Vec<SampleChannel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleChannel {
    pub name: String,
    pub base_spend: f64,
    /// Sales generated per unit of spend.
    pub coefficient: f64,
}

// Default functions
fn default_period_column() -> String {
    "Date".to_string()
}
fn default_channel_column() -> String {
    "Channel".to_string()
}
fn default_spend_column() -> String {
    "Spend".to_string()
}
fn default_sales_column() -> String {
    "Sales".to_string()
}
fn default_rank_tolerance() -> f64 {
    1e-10
}
fn default_min_spend_factor() -> f64 {
    0.5
}
fn default_max_spend_factor() -> f64 {
    1.5
}
fn default_seed() -> u64 { 42 }
fn default_sample_periods() -> usize { 52 }
fn default_baseline_sales() -> f64 { 20_000.0 }
fn default_noise() -> f64 { 500.0 }
fn default_sample_channels() -> Vec<SampleChannel> {
    vec![
        SampleChannel {
            name: "TV".to_string(),
            base_spend: 5_000.0,
            coefficient: 2.4,
        },
        SampleChannel {
            name: "Search".to_string(),
            base_spend: 3_000.0,
            coefficient: 3.1,
        },
        SampleChannel {
            name: "Social".to_string(),
            base_spend: 2_000.0,
            coefficient: 1.6,
        },
        SampleChannel {
            name: "Email".to_string(),
            base_spend: 1_500.0,
            coefficient: 4.2,
        },
    ]
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            period_column: default_period_column(),
            channel_column: default_channel_column(),
            spend_column: default_spend_column(),
            sales_column: default_sales_column(),
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rank_tolerance: default_rank_tolerance(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_spend_factor: default_min_spend_factor(),
            max_spend_factor: default_max_spend_factor(),
        }
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            periods: default_sample_periods(),
            baseline_sales: default_baseline_sales(),
            noise: default_noise(),
            channels: default_sample_channels(),
        }
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            schema: SchemaConfig::default(),
            solver: SolverConfig::default(),
            forecast: ForecastConfig::default(),
            sample: SampleConfig::default(),
        }
    }
}

impl MixConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, then environment
    /// variables (which take precedence).
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("MIX_ROI")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(self.solver.rank_tolerance > 0.0 && self.solver.rank_tolerance < 1.0) {
            return Err(config::ConfigError::Message(format!(
                "solver.rank_tolerance must be in (0, 1), got {}",
                self.solver.rank_tolerance
            )));
        }
        let ForecastConfig {
            min_spend_factor,
            max_spend_factor,
        } = self.forecast;
        if min_spend_factor < 0.0 || max_spend_factor < min_spend_factor {
            return Err(config::ConfigError::Message(format!(
                "forecast spend factors must satisfy 0 <= min <= max, got [{min_spend_factor}, {max_spend_factor}]"
            )));
        }
        Ok(())
    }
}
