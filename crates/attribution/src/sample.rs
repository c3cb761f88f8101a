//! Deterministic synthetic marketing data for demos and smoke tests.

use chrono::{Duration, NaiveDate};
use mix_core::config::SampleConfig;
use mix_core::types::{Period, RawRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Generates weekly spend/sales records with a known linear structure:
/// `sales = baseline + Σ coefficient × spend + noise`.
pub struct SampleGenerator {
    config: SampleConfig,
    start: NaiveDate,
}

impl SampleGenerator {
    pub fn new(config: SampleConfig) -> Self {
        Self {
            config,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = start;
        self
    }

    /// One record per (week, channel). Each week's baseline sales and noise
    /// are booked on that week's first channel row.
    pub fn generate(&self) -> Vec<RawRecord> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut records = Vec::with_capacity(self.config.periods * self.config.channels.len());

        for week in 0..self.config.periods {
            let period = Period::Date(self.start + Duration::weeks(week as i64));
            let noise = if self.config.noise > 0.0 {
                rng.gen_range(-self.config.noise..=self.config.noise)
            } else {
                0.0
            };

            for (i, channel) in self.config.channels.iter().enumerate() {
                // Spend varies ±40% around the channel's base level.
                let spend = (channel.base_spend * rng.gen_range(0.6..=1.4)).round();
                let mut sales = channel.coefficient * spend;
                if i == 0 {
                    sales += self.config.baseline_sales + noise;
                }
                records.push(RawRecord::new(period.clone(), channel.name.clone(), spend, sales));
            }
        }

        info!(
            periods = self.config.periods,
            channels = self.config.channels.len(),
            records = records.len(),
            seed = self.config.seed,
            "Sample dataset generated"
        );
        records
    }
}
