use async_trait::async_trait;
use crate::shared::error::{CollectionError, StorageError};

#[async_trait]
pub trait AsyncDataCollector<T: Send> {
    async fn collect(&mut self) -> Result<T, CollectionError>;
    async fn validate(&self) -> Result<(), CollectionError>;
    async fn health_check(&self) -> bool;
}

#[async_trait]
pub trait DataStorage<T: Send + Sync> {
    async fn batch_store(&self, data: Vec<T>) -> Result<(), StorageError>;
    async fn health_check(&self) -> bool;
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
