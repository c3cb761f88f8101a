//! ROI calculator — converts model coefficients and observed spend into
//! incremental revenue and ROI per channel, plus the aggregates reporting
//! consumes.

use crate::design::DesignMatrix;
use crate::regression::AttributionModel;
use chrono::{DateTime, Utc};
use mix_core::types::Metric;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Attribution result for a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRoi {
    pub channel: String,
    pub total_spend: f64,
    /// `coefficient × total_spend`.
    pub incremental_revenue: f64,
    /// `(incremental_revenue − total_spend) / total_spend`; undefined when
    /// the channel never spent.
    pub roi: Metric,
}

/// KPI roll-up over a [`ChannelRoiTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiSummary {
    pub total_spend: f64,
    pub total_incremental_revenue: f64,
    /// Mean of the defined per-channel ROIs.
    pub mean_roi: Metric,
    /// Market efficiency ratio: incremental revenue per unit of spend.
    pub mer: Metric,
    pub channels: usize,
    pub undefined_roi_channels: usize,
}

/// Per-channel ROI for one analysis run. Immutable once computed, so it can
/// be shared across concurrent forecasts.
///
/// Rows are ordered by each channel's first appearance in the input records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRoiTable {
    pub run_id: Uuid,
    rows: Vec<ChannelRoi>,
    pub computed_at: DateTime<Utc>,
}

impl ChannelRoiTable {
    /// Derive the table from a fitted model and the matrix it was fitted on.
    pub fn compute(model: &AttributionModel, matrix: &DesignMatrix) -> Self {
        let totals = matrix.total_spend_per_channel();

        let rows: Vec<ChannelRoi> = matrix
            .channels()
            .iter()
            .enumerate()
            .map(|(i, channel)| {
                let total_spend = totals[i];
                let coefficient = model.coefficient(channel).unwrap_or(0.0);
                let incremental_revenue = coefficient * total_spend;
                let roi = Metric::ratio(incremental_revenue - total_spend, total_spend);
                if roi.is_undefined() {
                    warn!(channel = %channel, "Channel has zero total spend, ROI undefined");
                }
                ChannelRoi {
                    channel: channel.clone(),
                    total_spend,
                    incremental_revenue,
                    roi,
                }
            })
            .collect();

        debug!(channels = rows.len(), "ROI table computed");

        Self {
            run_id: Uuid::new_v4(),
            rows,
            computed_at: Utc::now(),
        }
    }

    /// Build a table directly from rows, e.g. when replaying a stored run.
    pub fn from_rows(rows: Vec<ChannelRoi>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            rows,
            computed_at: Utc::now(),
        }
    }

    pub fn rows(&self) -> &[ChannelRoi] {
        &self.rows
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelRoi> {
        self.rows.iter().find(|r| r.channel == channel)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.get(channel).is_some()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.channel.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_spend(&self) -> f64 {
        self.rows.iter().map(|r| r.total_spend).sum()
    }

    pub fn total_incremental_revenue(&self) -> f64 {
        self.rows.iter().map(|r| r.incremental_revenue).sum()
    }

    /// Mean ROI over channels with a defined ROI. Undefined when no channel
    /// has one.
    pub fn mean_roi(&self) -> Metric {
        let defined: Vec<f64> = self.rows.iter().filter_map(|r| r.roi.value()).collect();
        Metric::ratio(defined.iter().sum(), defined.len() as f64)
    }

    /// Total incremental revenue divided by total spend.
    pub fn mer(&self) -> Metric {
        Metric::ratio(self.total_incremental_revenue(), self.total_spend())
    }

    pub fn summary(&self) -> RoiSummary {
        RoiSummary {
            total_spend: self.total_spend(),
            total_incremental_revenue: self.total_incremental_revenue(),
            mean_roi: self.mean_roi(),
            mer: self.mer(),
            channels: self.rows.len(),
            undefined_roi_channels: self.rows.iter().filter(|r| r.roi.is_undefined()).count(),
        }
    }
}
