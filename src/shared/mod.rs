pub mod config;
pub mod error;
pub mod health;
pub mod storage;
pub mod traits;

pub use error::*;
pub use traits::*;
