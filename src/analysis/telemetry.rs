use crate::session::{SessionData, TelemetrySample};

/// Time-series samples for one resolved lap. The lap number is carried along
/// because a request without an explicit lap resolves to the fastest one.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryTrace<'a> {
    pub driver: String,
    pub lap_number: u32,
    pub samples: &'a [TelemetrySample],
}

/// Telemetry for one of a driver's laps. With an explicit `lap_number` only
/// that exact lap matches; without one the driver's fastest timed lap is
/// used. Returns `None` when no lap matches or the matching lap carries no
/// samples, so the caller renders nothing instead of an empty chart.
pub fn lap_telemetry<'a>(
    session: &'a SessionData,
    driver_id: &str,
    lap_number: Option<u32>,
) -> Option<TelemetryTrace<'a>> {
    let driver_laps = session.driver(driver_id)?;
    let lap = match lap_number {
        Some(number) => driver_laps.laps.iter().find(|l| l.number == number)?,
        None => driver_laps
            .laps
            .iter()
            .filter_map(|l| l.time_s.map(|t| (l, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.number.cmp(&b.0.number)))
            .map(|(l, _)| l)?,
    };
    if lap.telemetry.is_empty() {
        return None;
    }
    Some(TelemetryTrace {
        driver: driver_laps.driver.abbreviation.clone(),
        lap_number: lap.number,
        samples: &lap.telemetry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DriverInfo, DriverLaps, Lap};

    fn sample(distance_m: f64) -> TelemetrySample {
        TelemetrySample {
            distance_m,
            speed_kmh: 250.0,
            throttle: Some(1.0),
            brake: Some(0.0),
        }
    }

    fn lap(number: u32, time_s: Option<f64>, samples: usize) -> Lap {
        Lap {
            number,
            time_s,
            telemetry: (0..samples).map(|i| sample(i as f64 * 10.0)).collect(),
            ..Default::default()
        }
    }

    fn session() -> SessionData {
        SessionData {
            drivers: vec![DriverLaps {
                driver: DriverInfo {
                    number: 1,
                    abbreviation: "VER".to_string(),
                    full_name: "Max Verstappen".to_string(),
                },
                laps: vec![
                    lap(1, Some(91.0), 3),
                    lap(2, Some(90.0), 4),
                    lap(3, None, 2),
                ],
            }],
        }
    }

    #[test]
    fn test_explicit_lap_number_returns_that_lap_only() {
        let session = session();
        let trace = lap_telemetry(&session, "VER", Some(1)).unwrap();
        assert_eq!(trace.lap_number, 1);
        assert_eq!(trace.samples.len(), 3);
    }

    #[test]
    fn test_missing_lap_number_returns_absent() {
        let session = session();
        assert!(lap_telemetry(&session, "VER", Some(5)).is_none());
        assert!(lap_telemetry(&session, "HAM", None).is_none());
    }

    #[test]
    fn test_default_resolves_to_fastest_timed_lap() {
        let session = session();
        let trace = lap_telemetry(&session, "VER", None).unwrap();
        assert_eq!(trace.lap_number, 2);
        assert_eq!(trace.samples.len(), 4);
    }

    #[test]
    fn test_untimed_lap_still_reachable_by_explicit_number() {
        // lap 3 has no time and never wins the fastest-lap default, but an
        // explicit request for it is well-formed
        let session = session();
        let trace = lap_telemetry(&session, "VER", Some(3)).unwrap();
        assert_eq!(trace.lap_number, 3);
    }

    #[test]
    fn test_lap_without_samples_returns_absent() {
        let mut session = session();
        session.drivers[0].laps[0].telemetry.clear();
        assert!(lap_telemetry(&session, "VER", Some(1)).is_none());
    }
}
