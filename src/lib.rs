// Library interface for pitview
// This allows integration tests to access internal modules

pub mod axis;
pub mod cardata;
pub mod catalog;
pub mod errors;
pub mod laps;
pub mod series;
pub mod source;
pub mod state;
pub mod sync;
pub mod ui;

// Re-export commonly used types
pub use axis::{AxisDomain, AxisMapping, AxisMode, map_axis};
pub use cardata::{CarSample, decode_car_stream};
pub use catalog::{CatalogIndex, DriverRoster, SessionDescriptor, resolve_session};
pub use errors::PitviewError;
pub use laps::{LapBoundary, extract_lap_boundaries};
pub use series::{BuiltChart, ChartKind, build_charts};
pub use source::{DataCache, FsTelemetrySource, TelemetrySource};
pub use sync::{ChartPatch, SyncCoordinator, SyncEvent};
