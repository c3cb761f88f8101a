//! Marketing-mix attribution — design matrix construction, OLS attribution,
//! per-channel ROI, and constant-ROI spend forecasting.

pub mod design;
pub mod engine;
pub mod forecast;
pub mod regression;
pub mod roi;
pub mod sample;
pub mod validator;

pub use design::{ChannelTotals, DesignMatrix};
pub use engine::{attribute_records, compute_attribution, AttributionOutcome};
pub use forecast::{forecast, Forecast, SpendScenario};
pub use regression::AttributionModel;
pub use roi::{ChannelRoi, ChannelRoiTable, RoiSummary};
pub use sample::SampleGenerator;
