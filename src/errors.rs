// Error types for pitwall

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum DashboardError {
    // Errors talking to the data provider
    #[snafu(display("Could not reach the data provider at {url}"))]
    ProviderRequest { url: String, source: reqwest::Error },
    #[snafu(display("Data provider returned HTTP {status} for {url}"))]
    ProviderStatus { url: String, status: u16 },
    #[snafu(display("Could not read data provider response from {url}"))]
    ProviderRead { url: String, source: reqwest::Error },
    #[snafu(display("Could not decode data provider response from {url}"))]
    ProviderDecode {
        url: String,
        source: serde_json::Error,
    },
    #[snafu(display("Error building the data provider HTTP client"))]
    ProviderClient { source: reqwest::Error },

    // Errors resolving a user selection against the provider
    #[snafu(display("No events found in the {year} schedule"))]
    EmptySchedule { year: u16 },
    #[snafu(display("No {kind} session found for {event} {year}"))]
    SessionNotFound {
        year: u16,
        event: String,
        kind: String,
    },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}
