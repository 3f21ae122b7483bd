pub mod features;
pub mod shared;

// Re-export commonly used items from features
pub use features::smartcitizen::{
    DeviceResponse,
    HistoricalReadings,
    PollOutcome,
    SensorReading,
    SmartCitizenCollector,
    WritePoint,
};

// Re-export shared functionality
pub use shared::config::{Config, SENSOR_NAME_MAP};
pub use shared::error::{
    AgentError,
    CollectionError,
    ConfigError,
    StorageError,
};
pub use shared::health::HealthState;
pub use shared::storage::InfluxDbStorage;
pub use shared::traits::{
    AsyncDataCollector,
    DataStorage,
    Validatable,
};
