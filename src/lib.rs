// Library interface for pitwall
// This allows integration tests to access internal modules

pub mod analysis;
pub mod errors;
pub mod provider;
pub mod session;

// Re-export commonly used types
pub use analysis::{
    FastestLap, LapRecord, LapTimeSummary, SectorAverages, TelemetryTrace, average_sector_times,
    build_lap_table, fastest_laps, lap_telemetry, lap_time_summary,
};
pub use errors::DashboardError;
pub use provider::{OpenF1Provider, ScheduleCache, SessionCache, SessionKind, SessionProvider};
pub use session::{DriverInfo, DriverLaps, Lap, SessionData, TelemetrySample};
