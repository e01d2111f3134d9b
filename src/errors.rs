//! Error types for the SoftHaus crate
//!
//! This module contains all error types that can be returned by SoftHaus operations.

use config::ConfigError;
use signal_system::SignalError;
use store_object::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoftHausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("No store registered for table: {0}")]
    StoreNotRegistered(String),

    #[error("Store already registered for table: {0}")]
    StoreAlreadyRegistered(String),
}
