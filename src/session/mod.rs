use serde::{Deserialize, Serialize};

/// Identity of one driver within a session.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DriverInfo {
    /// Car number assigned by the provider
    pub number: u32,
    /// Three-letter display code, e.g. "VER"
    pub abbreviation: String,
    pub full_name: String,
}

/// One time-sampled measurement within a lap.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    /// Meters traveled from the start of the lap, non-decreasing within a lap
    pub distance_m: f64,
    pub speed_kmh: f64,
    /// Throttle use. 0=off throttle to 1=full throttle
    pub throttle: Option<f64>,
    /// Brake use. 0=brake released to 1=max pedal force
    pub brake: Option<f64>,
}

/// One circuit traversal by one driver. The lap time and each sector time are
/// independently optional; a lap without a lap time never enters any
/// aggregate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lap {
    pub number: u32,
    pub time_s: Option<f64>,
    pub compound: Option<String>,
    pub sector1_s: Option<f64>,
    pub sector2_s: Option<f64>,
    pub sector3_s: Option<f64>,
    /// Speed through the speed trap, when the provider reports one
    pub speed_trap_kmh: Option<f64>,
    pub telemetry: Vec<TelemetrySample>,
}

/// All laps recorded for one driver, in ascending lap-number order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DriverLaps {
    pub driver: DriverInfo,
    pub laps: Vec<Lap>,
}

/// Immutable snapshot of one loaded session. Replaced wholesale on reload,
/// never mutated in place.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionData {
    /// Drivers in the session's natural order
    pub drivers: Vec<DriverLaps>,
}

impl SessionData {
    pub fn driver(&self, abbreviation: &str) -> Option<&DriverLaps> {
        self.drivers
            .iter()
            .find(|d| d.driver.abbreviation == abbreviation)
    }

    pub fn driver_abbreviations(&self) -> Vec<String> {
        self.drivers
            .iter()
            .map(|d| d.driver.abbreviation.clone())
            .collect()
    }
}
