pub mod influxdb_storage;

pub use influxdb_storage::{InfluxDbStorage, InfluxHealth};
