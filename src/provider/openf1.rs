//! HTTP client for the OpenF1-style timing data API.
//!
//! The provider exposes flat JSON collections (meetings, sessions, drivers,
//! laps, stints, car data) that this module joins into a single
//! [`SessionData`] snapshot. Car-data samples carry no lap number upstream;
//! they are assigned to laps by the lap's start timestamp, and distance along
//! the lap is integrated from speed since the provider does not report it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{SessionKind, SessionProvider};
use crate::errors::DashboardError;
use crate::session::{DriverInfo, DriverLaps, Lap, SessionData, TelemetrySample};

pub const DEFAULT_BASE_URL: &str = "https://api.openf1.org/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct MeetingRow {
    meeting_key: u64,
    meeting_name: String,
}

#[derive(Debug, Deserialize)]
struct SessionRow {
    session_key: u64,
}

#[derive(Debug, Deserialize)]
struct DriverRow {
    driver_number: u32,
    name_acronym: String,
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct LapRow {
    lap_number: u32,
    lap_duration: Option<f64>,
    duration_sector_1: Option<f64>,
    duration_sector_2: Option<f64>,
    duration_sector_3: Option<f64>,
    /// Speed through the speed trap, km/h
    st_speed: Option<f64>,
    date_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct StintRow {
    driver_number: u32,
    compound: Option<String>,
    lap_start: u32,
    lap_end: u32,
}

#[derive(Debug, Deserialize)]
struct CarDataRow {
    date: DateTime<Utc>,
    /// km/h
    speed: f64,
    /// 0-100 upstream
    throttle: Option<f64>,
    /// 0-100 upstream
    brake: Option<f64>,
}

pub struct OpenF1Provider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl OpenF1Provider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DashboardError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DashboardError::ProviderClient { source: e })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, DashboardError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| DashboardError::ProviderRequest {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::ProviderStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| DashboardError::ProviderRead {
                url: url.clone(),
                source: e,
            })?;
        serde_json::from_str(&body).map_err(|e| DashboardError::ProviderDecode { url, source: e })
    }

    fn resolve_session_key(
        &self,
        year: u16,
        event: &str,
        kind: SessionKind,
    ) -> Result<u64, DashboardError> {
        let meetings: Vec<MeetingRow> = self.get_json(
            "meetings",
            &[
                ("year", year.to_string()),
                ("meeting_name", event.to_string()),
            ],
        )?;
        let meeting = meetings
            .first()
            .ok_or_else(|| DashboardError::SessionNotFound {
                year,
                event: event.to_string(),
                kind: kind.provider_name().to_string(),
            })?;

        let sessions: Vec<SessionRow> = self.get_json(
            "sessions",
            &[
                ("meeting_key", meeting.meeting_key.to_string()),
                ("session_name", kind.provider_name().to_string()),
            ],
        )?;
        sessions
            .first()
            .map(|s| s.session_key)
            .ok_or_else(|| DashboardError::SessionNotFound {
                year,
                event: event.to_string(),
                kind: kind.provider_name().to_string(),
            })
    }
}

impl SessionProvider for OpenF1Provider {
    fn event_schedule(&self, year: u16) -> Result<Vec<String>, DashboardError> {
        let meetings: Vec<MeetingRow> =
            self.get_json("meetings", &[("year", year.to_string())])?;
        let events = meeting_names(meetings);
        if events.is_empty() {
            return Err(DashboardError::EmptySchedule { year });
        }
        Ok(events)
    }

    fn load_session(
        &self,
        year: u16,
        event: &str,
        kind: SessionKind,
    ) -> Result<SessionData, DashboardError> {
        let session_key = self.resolve_session_key(year, event, kind)?;

        let driver_rows: Vec<DriverRow> =
            self.get_json("drivers", &[("session_key", session_key.to_string())])?;
        let stint_rows: Vec<StintRow> =
            self.get_json("stints", &[("session_key", session_key.to_string())])?;

        let mut drivers = Vec::with_capacity(driver_rows.len());
        for row in driver_rows {
            let lap_rows: Vec<LapRow> = self.get_json(
                "laps",
                &[
                    ("session_key", session_key.to_string()),
                    ("driver_number", row.driver_number.to_string()),
                ],
            )?;
            let car_rows: Vec<CarDataRow> = self.get_json(
                "car_data",
                &[
                    ("session_key", session_key.to_string()),
                    ("driver_number", row.driver_number.to_string()),
                ],
            )?;

            let stints = stint_rows
                .iter()
                .filter(|s| s.driver_number == row.driver_number)
                .collect_vec();
            let laps = build_laps(lap_rows, &stints, car_rows);
            drivers.push(DriverLaps {
                driver: DriverInfo {
                    number: row.driver_number,
                    abbreviation: row.name_acronym,
                    full_name: row.full_name,
                },
                laps,
            });
        }

        info!(
            "Loaded {} {} ({}): {} drivers, {} laps",
            event,
            year,
            kind.code(),
            drivers.len(),
            drivers.iter().map(|d| d.laps.len()).sum::<usize>()
        );
        Ok(SessionData { drivers })
    }
}

fn meeting_names(meetings: Vec<MeetingRow>) -> Vec<String> {
    meetings.into_iter().map(|m| m.meeting_name).unique().collect()
}

/// Tyre compound for a lap, from the stint covering that lap number.
fn compound_for_lap(stints: &[&StintRow], lap_number: u32) -> Option<String> {
    stints
        .iter()
        .find(|s| s.lap_start <= lap_number && lap_number <= s.lap_end)
        .and_then(|s| s.compound.clone())
}

/// Upstream pedal channels are percentages; the session model keeps them in
/// the 0-1 range.
fn pedal_fraction(raw: Option<f64>) -> Option<f64> {
    raw.map(|p| (p / 100.0).clamp(0.0, 1.0))
}

/// Joins a driver's lap rows with their car-data samples. A sample belongs to
/// the lap whose window `[date_start, next lap's date_start)` contains its
/// timestamp; the last lap's window is closed by its own duration when known.
fn build_laps(mut lap_rows: Vec<LapRow>, stints: &[&StintRow], mut car_rows: Vec<CarDataRow>) -> Vec<Lap> {
    lap_rows.sort_by_key(|l| l.lap_number);
    car_rows.sort_by_key(|c| c.date);

    let mut laps = Vec::with_capacity(lap_rows.len());
    for (idx, row) in lap_rows.iter().enumerate() {
        let telemetry = match row.date_start {
            Some(start) => {
                let end = lap_rows
                    .get(idx + 1)
                    .and_then(|next| next.date_start)
                    .or_else(|| {
                        row.lap_duration.map(|d| {
                            start + chrono::Duration::milliseconds((d * 1000.0) as i64)
                        })
                    });
                lap_samples(&car_rows, start, end)
            }
            None => Vec::new(),
        };

        laps.push(Lap {
            number: row.lap_number,
            time_s: row.lap_duration,
            compound: compound_for_lap(stints, row.lap_number),
            sector1_s: row.duration_sector_1,
            sector2_s: row.duration_sector_2,
            sector3_s: row.duration_sector_3,
            speed_trap_kmh: row.st_speed,
            telemetry,
        });
    }
    laps
}

/// Samples within the lap window, with distance integrated from speed over
/// the sample timestamps.
fn lap_samples(
    car_rows: &[CarDataRow],
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Vec<TelemetrySample> {
    let in_window = car_rows
        .iter()
        .filter(|c| c.date >= start && end.is_none_or(|e| c.date < e));

    let mut samples = Vec::new();
    let mut distance_m = 0.0;
    let mut prev_date: Option<DateTime<Utc>> = None;
    for row in in_window {
        if let Some(prev) = prev_date {
            let dt_s = (row.date - prev).num_milliseconds() as f64 / 1000.0;
            distance_m += row.speed / 3.6 * dt_s;
        }
        prev_date = Some(row.date);
        samples.push(TelemetrySample {
            distance_m,
            speed_kmh: row.speed,
            throttle: pedal_fraction(row.throttle),
            brake: pedal_fraction(row.brake),
        });
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn car_row(seconds: i64, speed: f64) -> CarDataRow {
        CarDataRow {
            date: ts(seconds),
            speed,
            throttle: Some(100.0),
            brake: Some(0.0),
        }
    }

    fn lap_row(number: u32, duration: Option<f64>, start: Option<i64>) -> LapRow {
        LapRow {
            lap_number: number,
            lap_duration: duration,
            duration_sector_1: None,
            duration_sector_2: None,
            duration_sector_3: None,
            st_speed: None,
            date_start: start.map(ts),
        }
    }

    #[test]
    fn test_pedal_fraction_scales_and_clamps() {
        assert_eq!(pedal_fraction(Some(100.0)), Some(1.0));
        assert_eq!(pedal_fraction(Some(50.0)), Some(0.5));
        assert_eq!(pedal_fraction(Some(120.0)), Some(1.0));
        assert_eq!(pedal_fraction(Some(-5.0)), Some(0.0));
        assert_eq!(pedal_fraction(None), None);
    }

    #[test]
    fn test_compound_for_lap_uses_covering_stint() {
        let stint_a = StintRow {
            driver_number: 1,
            compound: Some("SOFT".to_string()),
            lap_start: 1,
            lap_end: 10,
        };
        let stint_b = StintRow {
            driver_number: 1,
            compound: Some("HARD".to_string()),
            lap_start: 11,
            lap_end: 50,
        };
        let stints = vec![&stint_a, &stint_b];

        assert_eq!(compound_for_lap(&stints, 1), Some("SOFT".to_string()));
        assert_eq!(compound_for_lap(&stints, 10), Some("SOFT".to_string()));
        assert_eq!(compound_for_lap(&stints, 11), Some("HARD".to_string()));
        assert_eq!(compound_for_lap(&stints, 51), None);
    }

    #[test]
    fn test_build_laps_assigns_samples_by_lap_window() {
        let lap_rows = vec![
            lap_row(1, Some(90.0), Some(0)),
            lap_row(2, Some(91.0), Some(90)),
        ];
        let car_rows = vec![
            car_row(0, 200.0),
            car_row(45, 250.0),
            car_row(95, 180.0),
        ];

        let laps = build_laps(lap_rows, &[], car_rows);
        assert_eq!(laps.len(), 2);
        assert_eq!(laps[0].telemetry.len(), 2);
        assert_eq!(laps[1].telemetry.len(), 1);
        // distance restarts at zero on each lap
        assert_eq!(laps[1].telemetry[0].distance_m, 0.0);
    }

    #[test]
    fn test_build_laps_integrates_distance_from_speed() {
        let lap_rows = vec![lap_row(1, Some(90.0), Some(0))];
        // 36 km/h = 10 m/s held for 10 seconds
        let car_rows = vec![car_row(0, 36.0), car_row(10, 36.0)];

        let laps = build_laps(lap_rows, &[], car_rows);
        let samples = &laps[0].telemetry;
        assert_eq!(samples[0].distance_m, 0.0);
        assert!((samples[1].distance_m - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_laps_without_start_timestamp_has_no_telemetry() {
        let lap_rows = vec![lap_row(1, Some(90.0), None)];
        let car_rows = vec![car_row(0, 200.0)];

        let laps = build_laps(lap_rows, &[], car_rows);
        assert!(laps[0].telemetry.is_empty());
    }

    #[test]
    fn test_meeting_names_deduplicates_preserving_order() {
        let meetings = vec![
            MeetingRow {
                meeting_key: 1,
                meeting_name: "Bahrain Grand Prix".to_string(),
            },
            MeetingRow {
                meeting_key: 2,
                meeting_name: "Monaco Grand Prix".to_string(),
            },
            MeetingRow {
                meeting_key: 3,
                meeting_name: "Bahrain Grand Prix".to_string(),
            },
        ];
        assert_eq!(
            meeting_names(meetings),
            vec!["Bahrain Grand Prix", "Monaco Grand Prix"]
        );
    }

    #[test]
    fn test_lap_row_decodes_provider_fields() {
        let body = r#"{
            "lap_number": 5,
            "lap_duration": 91.743,
            "duration_sector_1": 28.5,
            "duration_sector_2": null,
            "duration_sector_3": 31.2,
            "st_speed": 312.0,
            "date_start": "2024-05-26T13:32:10.500000+00:00"
        }"#;
        let row: LapRow = serde_json::from_str(body).unwrap();
        assert_eq!(row.lap_number, 5);
        assert_eq!(row.lap_duration, Some(91.743));
        assert_eq!(row.duration_sector_2, None);
        assert_eq!(row.st_speed, Some(312.0));
        assert!(row.date_start.is_some());
    }
}
