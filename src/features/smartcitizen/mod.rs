pub mod collector;
pub mod models;

pub use collector::{PollOutcome, SmartCitizenCollector};
pub use models::{DeviceResponse, HistoricalReadings, SensorReading, WritePoint};
