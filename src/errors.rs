// Error types for pitview

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PitviewError {
    // Catalog resolution errors
    #[snafu(display("Grand Prix '{name}' not found in the {year} catalog"))]
    MeetingNotFound { year: String, name: String },
    #[snafu(display("Session '{name}' not found for this Grand Prix"))]
    SessionNotFound { name: String },
    #[snafu(display("Session '{name}' has no data path"))]
    SessionPathMissing { name: String },
    #[snafu(display("Driver '{tla}' not found in the session roster"))]
    DriverNotFound { tla: String },

    // Data source errors
    #[snafu(display("Could not read {path}"))]
    SourceRead { path: String, source: io::Error },
    #[snafu(display("Malformed document {path}"))]
    DocumentParse {
        path: String,
        source: serde_json::Error,
    },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}
