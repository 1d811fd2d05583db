//! Builds plain plot-point series from the aggregation pipeline's outputs.
//!
//! Everything here is presentation math over immutable records; the stored
//! samples are never touched. Keeping this separate from the egui widgets
//! keeps the display conversions (brake shown as a 0-100 percentage, chart
//! titles carrying the resolved lap number) testable without a window.

use pitwall::TelemetryTrace;
use pitwall::analysis::LapRecord;

/// One lap-time line per driver plus marker groups keyed by tyre compound.
pub(crate) struct LapTimeSeries {
    pub(crate) driver: String,
    pub(crate) points: Vec<[f64; 2]>,
}

pub(crate) struct CompoundMarkers {
    pub(crate) driver: String,
    pub(crate) compound: String,
    pub(crate) points: Vec<[f64; 2]>,
}

pub(crate) fn lap_time_series(
    records: &[LapRecord],
) -> (Vec<LapTimeSeries>, Vec<CompoundMarkers>) {
    let mut lines: Vec<LapTimeSeries> = Vec::new();
    let mut markers: Vec<CompoundMarkers> = Vec::new();
    for record in records {
        let point = [record.lap_number as f64, record.time_s];

        match lines.iter_mut().find(|l| l.driver == record.driver) {
            Some(line) => line.points.push(point),
            None => lines.push(LapTimeSeries {
                driver: record.driver.clone(),
                points: vec![point],
            }),
        }

        match markers
            .iter_mut()
            .find(|m| m.driver == record.driver && m.compound == record.compound)
        {
            Some(group) => group.points.push(point),
            None => markers.push(CompoundMarkers {
                driver: record.driver.clone(),
                compound: record.compound.clone(),
                points: vec![point],
            }),
        }
    }
    (lines, markers)
}

/// Telemetry channels ready for plotting against distance. Optional channels
/// are present only when the underlying data carries them.
pub(crate) struct TelemetryChannels {
    pub(crate) title: String,
    pub(crate) speed: Vec<[f64; 2]>,
    pub(crate) throttle: Option<Vec<[f64; 2]>>,
    pub(crate) brake: Option<Vec<[f64; 2]>>,
}

pub(crate) fn telemetry_channels(trace: &TelemetryTrace<'_>) -> TelemetryChannels {
    let speed = trace
        .samples
        .iter()
        .map(|s| [s.distance_m, s.speed_kmh])
        .collect();

    // pedal channels are stored as 0-1 fractions and shown as percentages
    let throttle = pedal_series(trace, |s| s.throttle);
    let brake = pedal_series(trace, |s| s.brake);

    TelemetryChannels {
        title: format!("Telemetry - {} (Lap {})", trace.driver, trace.lap_number),
        speed,
        throttle,
        brake,
    }
}

fn pedal_series(
    trace: &TelemetryTrace<'_>,
    channel: impl Fn(&pitwall::TelemetrySample) -> Option<f64>,
) -> Option<Vec<[f64; 2]>> {
    let points: Vec<[f64; 2]> = trace
        .samples
        .iter()
        .filter_map(|s| channel(s).map(|v| [s.distance_m, v * 100.0]))
        .collect();
    if points.is_empty() { None } else { Some(points) }
}

pub(crate) fn format_lap_time(time_s: f64) -> String {
    let minutes = (time_s / 60.0).floor() as u64;
    let seconds = time_s - minutes as f64 * 60.0;
    if minutes > 0 {
        format!("{}:{:06.3}", minutes, seconds)
    } else {
        format!("{:.3}", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitwall::TelemetrySample;

    fn sample(distance_m: f64, throttle: Option<f64>, brake: Option<f64>) -> TelemetrySample {
        TelemetrySample {
            distance_m,
            speed_kmh: 280.0,
            throttle,
            brake,
        }
    }

    #[test]
    fn test_lap_time_series_one_line_per_driver() {
        let records = vec![
            LapRecord {
                driver: "VER".to_string(),
                lap_number: 1,
                time_s: 91.0,
                compound: "SOFT".to_string(),
                sector1_s: None,
                sector2_s: None,
                sector3_s: None,
            },
            LapRecord {
                driver: "VER".to_string(),
                lap_number: 2,
                time_s: 90.5,
                compound: "HARD".to_string(),
                sector1_s: None,
                sector2_s: None,
                sector3_s: None,
            },
            LapRecord {
                driver: "HAM".to_string(),
                lap_number: 1,
                time_s: 92.0,
                compound: "SOFT".to_string(),
                sector1_s: None,
                sector2_s: None,
                sector3_s: None,
            },
        ];

        let (lines, markers) = lap_time_series(&records);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].driver, "VER");
        assert_eq!(lines[0].points.len(), 2);
        // VER ran two compounds, so three marker groups in total
        assert_eq!(markers.len(), 3);
    }

    #[test]
    fn test_brake_channel_is_percentage_bounded() {
        let samples = vec![
            sample(0.0, Some(1.0), Some(0.0)),
            sample(50.0, Some(0.5), Some(1.0)),
            sample(100.0, Some(0.0), Some(0.25)),
        ];
        let trace = TelemetryTrace {
            driver: "VER".to_string(),
            lap_number: 4,
            samples: &samples,
        };

        let channels = telemetry_channels(&trace);
        let brake = channels.brake.unwrap();
        assert!(brake.iter().all(|p| (0.0..=100.0).contains(&p[1])));
        assert_eq!(brake[1][1], 100.0);
    }

    #[test]
    fn test_absent_channels_are_omitted() {
        let samples = vec![sample(0.0, None, None), sample(10.0, None, None)];
        let trace = TelemetryTrace {
            driver: "VER".to_string(),
            lap_number: 1,
            samples: &samples,
        };

        let channels = telemetry_channels(&trace);
        assert!(channels.throttle.is_none());
        assert!(channels.brake.is_none());
        assert_eq!(channels.speed.len(), 2);
    }

    #[test]
    fn test_title_carries_resolved_lap_number() {
        let samples = vec![sample(0.0, None, None)];
        let trace = TelemetryTrace {
            driver: "LEC".to_string(),
            lap_number: 17,
            samples: &samples,
        };

        let channels = telemetry_channels(&trace);
        assert_eq!(channels.title, "Telemetry - LEC (Lap 17)");
    }

    #[test]
    fn test_format_lap_time() {
        assert_eq!(format_lap_time(91.245), "1:31.245");
        assert_eq!(format_lap_time(59.9), "59.900");
        assert_eq!(format_lap_time(120.0), "2:00.000");
    }
}
