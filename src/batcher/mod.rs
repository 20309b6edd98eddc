mod error;
mod telemetry_batcher;

pub use error::BatcherError;
pub use telemetry_batcher::TelemetryBatcher;
