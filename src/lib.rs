// Library interface for lifestream
// The monitor window lives in the binary; everything it drives is here so it can be tested
// without a display or a sensor.

pub mod charts;
pub mod errors;
pub mod reading;
pub mod schedule;
pub mod sensor;
pub mod store;
pub mod upload;
pub mod writer;

// Re-export commonly used types
pub use charts::{ChartSnapshot, Metric};
pub use errors::LifestreamError;
pub use reading::{Reading, decode_reading};
pub use sensor::{SensorEvent, SessionStatus};
pub use store::SampleStore;
pub use upload::{DocumentStore, SensorDocument, UploadSnapshot, Uploader};
