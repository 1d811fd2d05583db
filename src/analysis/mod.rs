//! The session-data aggregation pipeline.
//!
//! Turns a loaded [`SessionData`] snapshot into the flat tables the UI
//! renders: per-lap records, per-driver sector averages, fastest laps, and
//! lap-time summaries. Everything here is recomputed from scratch on each
//! selection change; nothing is updated incrementally.

mod telemetry;

use std::collections::HashMap;

use itertools::Itertools;

pub use telemetry::{TelemetryTrace, lap_telemetry};

use crate::session::SessionData;

pub const UNKNOWN_COMPOUND: &str = "Unknown";

/// One completed lap by one driver. Only laps with a recorded lap time are
/// ever represented; sector times stay independently optional.
#[derive(Clone, Debug, PartialEq)]
pub struct LapRecord {
    pub driver: String,
    pub lap_number: u32,
    pub time_s: f64,
    pub compound: String,
    pub sector1_s: Option<f64>,
    pub sector2_s: Option<f64>,
    pub sector3_s: Option<f64>,
}

/// Mean sector times for one driver. A cell is `None` when no lap carried a
/// value for that sector, never zero.
#[derive(Clone, Debug, PartialEq)]
pub struct SectorAverages {
    pub driver: String,
    pub sector1_s: Option<f64>,
    pub sector2_s: Option<f64>,
    pub sector3_s: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FastestLap {
    pub driver: String,
    pub lap_number: u32,
    pub time_s: f64,
    /// Omitted when the provider reports no speed-trap reading for the lap
    pub speed_trap_kmh: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LapTimeSummary {
    pub driver: String,
    pub mean_s: f64,
    /// Sample standard deviation, absent below two completed laps
    pub std_dev_s: Option<f64>,
    pub laps_completed: usize,
}

/// Flattens the selected drivers' laps into one table, one row per lap with
/// a recorded time. Rows are grouped by driver in the order given, and by
/// ascending lap number within a driver. Returns `None` when no lap
/// qualifies so callers render an explicit no-data state instead of an
/// empty chart.
pub fn build_lap_table(session: &SessionData, driver_ids: &[String]) -> Option<Vec<LapRecord>> {
    let mut records = Vec::new();
    for id in driver_ids {
        let Some(driver_laps) = session.driver(id) else {
            continue;
        };
        for lap in &driver_laps.laps {
            // a lap without a valid time is skipped entirely, never
            // partially reported
            let Some(time_s) = lap.time_s else {
                continue;
            };
            records.push(LapRecord {
                driver: driver_laps.driver.abbreviation.clone(),
                lap_number: lap.number,
                time_s,
                compound: lap
                    .compound
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_COMPOUND.to_string()),
                sector1_s: lap.sector1_s,
                sector2_s: lap.sector2_s,
                sector3_s: lap.sector3_s,
            });
        }
    }
    if records.is_empty() { None } else { Some(records) }
}

/// Groups lap records by driver, keeping first-seen order.
fn group_by_driver(records: &[LapRecord]) -> Vec<(&str, Vec<&LapRecord>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&LapRecord>> = HashMap::new();
    for record in records {
        let driver = record.driver.as_str();
        if !grouped.contains_key(driver) {
            order.push(driver);
        }
        grouped.entry(driver).or_default().push(record);
    }
    order
        .into_iter()
        .map(|driver| (driver, grouped.remove(driver).unwrap_or_default()))
        .collect()
}

fn sector_mean(rows: &[&LapRecord], sector: impl Fn(&LapRecord) -> Option<f64>) -> Option<f64> {
    let values = rows.iter().filter_map(|r| sector(r)).collect_vec();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Per-driver arithmetic mean of each sector, ignoring absent values for
/// that sector only. Drivers appear in the order they first appear in the
/// lap table.
pub fn average_sector_times(records: &[LapRecord]) -> Vec<SectorAverages> {
    group_by_driver(records)
        .into_iter()
        .map(|(driver, rows)| SectorAverages {
            driver: driver.to_string(),
            sector1_s: sector_mean(&rows, |r| r.sector1_s),
            sector2_s: sector_mean(&rows, |r| r.sector2_s),
            sector3_s: sector_mean(&rows, |r| r.sector3_s),
        })
        .collect()
}

/// Each selected driver's fastest lap over the full session, ties broken by
/// earliest lap number. Drivers with zero completed laps are omitted. Sorted
/// fastest first.
pub fn fastest_laps(session: &SessionData, driver_ids: &[String]) -> Vec<FastestLap> {
    let mut rows = Vec::new();
    for id in driver_ids {
        let Some(driver_laps) = session.driver(id) else {
            continue;
        };
        let fastest = driver_laps
            .laps
            .iter()
            .filter_map(|lap| lap.time_s.map(|t| (lap, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.number.cmp(&b.0.number)));
        if let Some((lap, time_s)) = fastest {
            rows.push(FastestLap {
                driver: driver_laps.driver.abbreviation.clone(),
                lap_number: lap.number,
                time_s,
                speed_trap_kmh: lap.speed_trap_kmh,
            });
        }
    }
    rows.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    rows
}

/// Mean lap time, sample standard deviation, and completed-lap count per
/// driver with at least one completed lap. Sorted by ascending mean.
pub fn lap_time_summary(records: &[LapRecord]) -> Vec<LapTimeSummary> {
    let mut rows = group_by_driver(records)
        .into_iter()
        .map(|(driver, laps)| {
            let times = laps.iter().map(|r| r.time_s).collect_vec();
            let count = times.len();
            let mean_s = times.iter().sum::<f64>() / count as f64;
            let std_dev_s = if count >= 2 {
                let variance = times.iter().map(|t| (t - mean_s).powi(2)).sum::<f64>()
                    / (count - 1) as f64;
                Some(variance.sqrt())
            } else {
                None
            };
            LapTimeSummary {
                driver: driver.to_string(),
                mean_s,
                std_dev_s,
                laps_completed: count,
            }
        })
        .collect_vec();
    rows.sort_by(|a, b| a.mean_s.total_cmp(&b.mean_s));
    rows
}
