//! Forecast simulator — what-if revenue and ROI for a hypothetical spend
//! allocation.
//!
//! Assumes each channel's historical ROI holds at any spend level: doubling a
//! channel's spend doubles its contribution. There is no saturation or
//! carryover.

use crate::roi::ChannelRoiTable;
use mix_core::config::ForecastConfig;
use mix_core::error::{MixError, MixResult};
use mix_core::types::Metric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Hypothetical spend per channel. Channels left out spend nothing.
pub type SpendScenario = BTreeMap<String, f64>;

/// Result of forecasting one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// `Σ scenario_spend × roi`. Undefined when spend is allocated to a
    /// channel whose ROI is undefined.
    pub forecasted_revenue: Metric,
    /// `forecasted_revenue / total_spend`. Undefined when total spend is zero.
    pub forecasted_roi: Metric,
    pub total_spend: f64,
}

/// Inclusive what-if spend range for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpendBounds {
    pub min: f64,
    pub baseline: f64,
    pub max: f64,
}

/// One point of a single-channel spend sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub factor: f64,
    pub spend: f64,
    pub forecast: Forecast,
}

/// Forecast revenue and blended ROI for `scenario` against a fitted ROI table.
///
/// Every scenario channel must exist in the table; otherwise nothing is
/// computed and [`MixError::UnknownChannel`] lists all offending channels.
pub fn forecast(table: &ChannelRoiTable, scenario: &SpendScenario) -> MixResult<Forecast> {
    check_scenario(table, scenario)?;

    let mut revenue = Some(0.0);
    let mut total_spend = 0.0;
    for row in table.rows() {
        let spend = scenario.get(&row.channel).copied().unwrap_or(0.0);
        total_spend += spend;
        if spend == 0.0 {
            continue;
        }
        revenue = match (revenue, row.roi) {
            (Some(acc), Metric::Value(roi)) => Some(acc + spend * roi),
            _ => None,
        };
    }

    let forecasted_revenue = revenue.map_or(Metric::Undefined, Metric::Value);
    let forecasted_roi = match forecasted_revenue {
        Metric::Value(rev) => Metric::ratio(rev, total_spend),
        Metric::Undefined => Metric::Undefined,
    };

    debug!(
        channels = scenario.len(),
        total_spend,
        forecasted_revenue = %forecasted_revenue,
        "Scenario forecast computed"
    );

    Ok(Forecast {
        forecasted_revenue,
        forecasted_roi,
        total_spend,
    })
}

/// The historical spend allocation: each channel at its observed total.
pub fn baseline_scenario(table: &ChannelRoiTable) -> SpendScenario {
    table
        .rows()
        .iter()
        .map(|r| (r.channel.clone(), r.total_spend))
        .collect()
}

/// What-if spend range for `channel`, scaled from its historical total.
pub fn spend_bounds(
    table: &ChannelRoiTable,
    channel: &str,
    config: &ForecastConfig,
) -> MixResult<SpendBounds> {
    let row = table.get(channel).ok_or_else(|| MixError::UnknownChannel {
        channels: vec![channel.to_string()],
    })?;
    Ok(SpendBounds {
        min: row.total_spend * config.min_spend_factor,
        baseline: row.total_spend,
        max: row.total_spend * config.max_spend_factor,
    })
}

/// Forecast the baseline allocation with `channel` scaled by each factor in
/// turn, all other channels held at their historical spend.
pub fn sweep(table: &ChannelRoiTable, channel: &str, factors: &[f64]) -> MixResult<Vec<SweepPoint>> {
    let baseline = baseline_scenario(table);
    let base_spend = *baseline.get(channel).ok_or_else(|| MixError::UnknownChannel {
        channels: vec![channel.to_string()],
    })?;

    factors
        .iter()
        .map(|&factor| {
            let spend = base_spend * factor;
            let mut scenario = baseline.clone();
            scenario.insert(channel.to_string(), spend);
            Ok(SweepPoint {
                factor,
                spend,
                forecast: forecast(table, &scenario)?,
            })
        })
        .collect()
}

fn check_scenario(table: &ChannelRoiTable, scenario: &SpendScenario) -> MixResult<()> {
    let unknown: Vec<String> = scenario
        .keys()
        .filter(|c| !table.contains(c))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(MixError::UnknownChannel { channels: unknown });
    }

    for (channel, &spend) in scenario {
        if !spend.is_finite() || spend < 0.0 {
            return Err(MixError::InvalidScenario {
                channel: channel.clone(),
                reason: format!("spend must be a non-negative finite number, got {spend}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::ChannelRoi;

    fn table() -> ChannelRoiTable {
        ChannelRoiTable::from_rows(vec![
            ChannelRoi {
                channel: "TV".into(),
                total_spend: 600.0,
                incremental_revenue: 1500.0,
                roi: Metric::Value(1.5),
            },
            ChannelRoi {
                channel: "Search".into(),
                total_spend: 200.0,
                incremental_revenue: 100.0,
                roi: Metric::Value(-0.5),
            },
            ChannelRoi {
                channel: "Radio".into(),
                total_spend: 0.0,
                incremental_revenue: 0.0,
                roi: Metric::Undefined,
            },
        ])
    }

    fn scenario(entries: &[(&str, f64)]) -> SpendScenario {
        entries.iter().map(|(c, s)| (c.to_string(), *s)).collect()
    }

    #[test]
    fn test_forecast_applies_constant_roi() {
        let f = forecast(&table(), &scenario(&[("TV", 1000.0), ("Search", 400.0)])).unwrap();
        // 1000·1.5 + 400·(−0.5) = 1300
        assert_eq!(f.forecasted_revenue, Metric::Value(1300.0));
        assert!((f.total_spend - 1400.0).abs() < f64::EPSILON);
        assert!((f.forecasted_roi.value().unwrap() - 1300.0 / 1400.0).abs() < 1e-12);
    }

    #[test]
    fn test_forecast_is_linear_in_spend() {
        let t = table();
        let base = scenario(&[("TV", 123.0), ("Search", 45.5)]);
        let base_rev = forecast(&t, &base).unwrap().forecasted_revenue.value().unwrap();

        for k in [0.5, 2.0, 3.0, 10.0] {
            let scaled: SpendScenario = base.iter().map(|(c, s)| (c.clone(), s * k)).collect();
            let rev = forecast(&t, &scaled).unwrap().forecasted_revenue.value().unwrap();
            assert!(
                (rev - k * base_rev).abs() <= 1e-12 * (k * base_rev).abs(),
                "k = {k}: {rev} vs {}",
                k * base_rev
            );
        }
    }

    #[test]
    fn test_unknown_channel_rejected_without_partial_result() {
        let err = forecast(
            &table(),
            &scenario(&[("TV", 10.0), ("Podcast", 5.0), ("Billboard", 1.0)]),
        )
        .unwrap_err();
        match err {
            MixError::UnknownChannel { channels } => {
                assert_eq!(channels, vec!["Billboard".to_string(), "Podcast".to_string()]);
            }
            other => panic!("expected unknown channel, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_total_spend_gives_undefined_roi() {
        let f = forecast(&table(), &scenario(&[("TV", 0.0)])).unwrap();
        assert_eq!(f.forecasted_revenue, Metric::Value(0.0));
        assert_eq!(f.forecasted_roi, Metric::Undefined);

        let empty = forecast(&table(), &SpendScenario::new()).unwrap();
        assert_eq!(empty.forecasted_roi, Metric::Undefined);
    }

    #[test]
    fn test_spend_on_undefined_roi_channel_propagates() {
        let f = forecast(&table(), &scenario(&[("TV", 10.0), ("Radio", 5.0)])).unwrap();
        assert_eq!(f.forecasted_revenue, Metric::Undefined);
        assert_eq!(f.forecasted_roi, Metric::Undefined);

        let zero_radio = forecast(&table(), &scenario(&[("TV", 10.0), ("Radio", 0.0)])).unwrap();
        assert_eq!(zero_radio.forecasted_revenue, Metric::Value(15.0));
    }

    #[test]
    fn test_negative_scenario_spend_rejected() {
        assert!(matches!(
            forecast(&table(), &scenario(&[("TV", -1.0)])),
            Err(MixError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_forecast_does_not_mutate_table() {
        let t = table();
        let before = t.rows().to_vec();
        forecast(&t, &scenario(&[("TV", 99.0)])).unwrap();
        assert_eq!(t.rows(), before.as_slice());
    }

    #[test]
    fn test_baseline_and_bounds() {
        let t = table();
        let baseline = baseline_scenario(&t);
        assert_eq!(baseline.get("TV"), Some(&600.0));
        assert_eq!(baseline.len(), 3);

        let bounds = spend_bounds(&t, "TV", &ForecastConfig::default()).unwrap();
        assert!((bounds.min - 300.0).abs() < f64::EPSILON);
        assert!((bounds.max - 900.0).abs() < f64::EPSILON);
        assert!(spend_bounds(&t, "Podcast", &ForecastConfig::default()).is_err());
    }

    #[test]
    fn test_sweep_scales_one_channel() {
        let t = table();
        let points = sweep(&t, "TV", &[0.5, 1.0, 1.5]).unwrap();
        assert_eq!(points.len(), 3);
        // Baseline: 600·1.5 + 200·(−0.5) = 800
        assert_eq!(points[1].forecast.forecasted_revenue, Metric::Value(800.0));
        // TV at 300: 450 − 100 = 350
        assert_eq!(points[0].forecast.forecasted_revenue, Metric::Value(350.0));
        assert!((points[2].spend - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_forecasts_share_table() {
        let t = std::sync::Arc::new(table());
        let handles: Vec<_> = (1..=4)
            .map(|k| {
                let t = t.clone();
                std::thread::spawn(move || {
                    let s = scenario(&[("TV", 100.0 * k as f64)]);
                    forecast(&t, &s).unwrap().forecasted_revenue
                })
            })
            .collect();
        for (k, h) in handles.into_iter().enumerate() {
            let expected = 150.0 * (k + 1) as f64;
            assert_eq!(h.join().unwrap(), Metric::Value(expected));
        }
    }
}
