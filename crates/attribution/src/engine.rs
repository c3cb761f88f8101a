//! Pipeline entry points: raw records → validator → design matrix → OLS fit →
//! ROI table.

use crate::design::{channel_totals, ChannelTotals, DesignMatrix};
use crate::regression::AttributionModel;
use crate::roi::ChannelRoiTable;
use crate::validator::{validate_records, validate_table};
use mix_core::config::MixConfig;
use mix_core::error::MixResult;
use mix_core::types::{RawRecord, RawTable};
use serde::Serialize;
use tracing::info;

/// Everything one analysis run produces. The design matrix is not retained.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionOutcome {
    pub roi_table: ChannelRoiTable,
    pub model: AttributionModel,
    /// Raw per-channel spend and sales, for spend-vs-revenue breakdowns.
    pub channel_totals: Vec<ChannelTotals>,
}

/// Validate an ingested table and run the full attribution pipeline.
pub fn compute_attribution(table: &RawTable, config: &MixConfig) -> MixResult<AttributionOutcome> {
    let records = validate_table(table, &config.schema)?;
    run(&records, config)
}

/// Run the pipeline on records that are already typed.
pub fn attribute_records(records: &[RawRecord], config: &MixConfig) -> MixResult<AttributionOutcome> {
    validate_records(records)?;
    run(records, config)
}

fn run(records: &[RawRecord], config: &MixConfig) -> MixResult<AttributionOutcome> {
    let matrix = DesignMatrix::build(records);
    let model = AttributionModel::fit(&matrix, &config.solver)?;
    let roi_table = ChannelRoiTable::compute(&model, &matrix);

    info!(
        run_id = %roi_table.run_id,
        records = records.len(),
        periods = matrix.num_periods(),
        channels = matrix.num_channels(),
        mer = %roi_table.mer(),
        "Attribution run complete"
    );

    Ok(AttributionOutcome {
        roi_table,
        model,
        channel_totals: channel_totals(records),
    })
}
