//! Design matrix builder — aggregates per-transaction records into one row per
//! period and one spend column per channel, plus the summed-sales response.

use mix_core::types::{Period, RawRecord};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Period × channel spend table with a per-period sales response.
///
/// Rows follow [`Period`]'s ordering; channel columns follow the order in
/// which each channel first appears in the input. Every (period, channel)
/// pair without a record holds zero spend.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    periods: Vec<Period>,
    channels: Vec<String>,
    spend: Array2<f64>,
    response: Array1<f64>,
}

impl DesignMatrix {
    pub fn build(records: &[RawRecord]) -> Self {
        let channels = channel_order(records);
        let channel_index: HashMap<&str, usize> = channels
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let period_index: BTreeMap<&Period, usize> = records
            .iter()
            .map(|r| (&r.period, 0))
            .collect::<BTreeMap<_, _>>()
            .into_keys()
            .enumerate()
            .map(|(i, p)| (p, i))
            .collect();

        let mut spend = Array2::<f64>::zeros((period_index.len(), channels.len()));
        let mut response = Array1::<f64>::zeros(period_index.len());

        for record in records {
            let row = period_index[&record.period];
            let col = channel_index[record.channel.as_str()];
            spend[[row, col]] += record.spend;
            response[row] += record.sales;
        }

        let periods: Vec<Period> = period_index.into_keys().cloned().collect();

        debug!(
            periods = periods.len(),
            channels = channels.len(),
            "Design matrix built"
        );

        Self {
            periods,
            channels,
            spend,
            response,
        }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn num_periods(&self) -> usize {
        self.periods.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Spend table, `periods × channels`.
    pub fn spend(&self) -> &Array2<f64> {
        &self.spend
    }

    /// Summed sales per period.
    pub fn response(&self) -> &Array1<f64> {
        &self.response
    }

    pub fn spend_at(&self, period: &Period, channel: &str) -> Option<f64> {
        let row = self.periods.iter().position(|p| p == period)?;
        let col = self.channel_position(channel)?;
        Some(self.spend[[row, col]])
    }

    pub fn channel_position(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }

    /// Column sums of the spend table, in channel order.
    pub fn total_spend_per_channel(&self) -> Array1<f64> {
        self.spend.sum_axis(Axis(0))
    }
}

/// Raw spend and sales sums for one channel, before any modelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTotals {
    pub channel: String,
    pub spend: f64,
    pub sales: f64,
}

/// Per-channel spend and sales sums over the raw records, in first-seen
/// channel order.
pub fn channel_totals(records: &[RawRecord]) -> Vec<ChannelTotals> {
    let mut totals: Vec<ChannelTotals> = channel_order(records)
        .into_iter()
        .map(|channel| ChannelTotals {
            channel,
            spend: 0.0,
            sales: 0.0,
        })
        .collect();
    let index: HashMap<String, usize> = totals
        .iter()
        .enumerate()
        .map(|(i, t)| (t.channel.clone(), i))
        .collect();

    for record in records {
        let entry = &mut totals[index[&record.channel]];
        entry.spend += record.spend;
        entry.sales += record.sales;
    }
    totals
}

fn channel_order(records: &[RawRecord]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.channel.as_str()))
        .map(|r| r.channel.clone())
        .collect()
}
