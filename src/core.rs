//! Core SoftHaus functionality
//!
//! This module contains the main SoftHaus struct: it owns the connection
//! pool and keeps one soft-delete store per registered model type.

use sqlx::PgPool;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::SoftHausError;
use config::{AppConfig, DatabaseConfig, SignalConfig};
use store_object::{PgStorage, SoftDeletable, SoftDeleteStore};

struct RegisteredStore {
    table: &'static str,
    store: Box<dyn Any + Send + Sync>,
}

/// Main SoftHaus coordinator that manages the database connection and model stores
pub struct SoftHaus {
    pool: PgPool,
    storage: Arc<PgStorage>,
    signal_config: SignalConfig,
    stores: HashMap<TypeId, RegisteredStore>,
}

impl std::fmt::Debug for SoftHaus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftHaus")
            .field("stores", &self.list_stores())
            .field("signal_config", &self.signal_config)
            .finish()
    }
}

impl SoftHaus {
    /// Create new SoftHaus with database connection
    pub async fn new(config: DatabaseConfig) -> Result<Self, SoftHausError> {
        let pool = Self::connect(&config).await?;
        Ok(Self::from_pool(pool, SignalConfig::default()))
    }

    /// Connect using a full application configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, SoftHausError> {
        let pool = Self::connect(&config.database).await?;
        Ok(Self::from_pool(pool, config.signal))
    }

    /// Load the configuration file and connect
    pub async fn load() -> Result<Self, SoftHausError> {
        Self::from_config(AppConfig::load()?).await
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, signal_config: SignalConfig) -> Self {
        Self {
            storage: Arc::new(PgStorage::new(pool.clone())),
            pool,
            signal_config,
            stores: HashMap::new(),
        }
    }

    async fn connect(config: &DatabaseConfig) -> Result<PgPool, SoftHausError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        debug_log!(host = %config.host, database = %config.database, "connected");
        Ok(pool)
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Storage shared by every registered store
    pub fn storage(&self) -> &Arc<PgStorage> {
        &self.storage
    }

    /// Create the store for model `T`
    ///
    /// The returned handle shares storage and listeners with the registered copy.
    pub fn register<T: SoftDeletable>(
        &mut self,
    ) -> Result<SoftDeleteStore<T, PgStorage>, SoftHausError> {
        let type_id = TypeId::of::<T>();
        if self.stores.contains_key(&type_id) {
            return Err(SoftHausError::StoreAlreadyRegistered(
                T::table_name().to_string(),
            ));
        }

        let store = SoftDeleteStore::<T, PgStorage>::with_signal_config(
            Arc::clone(&self.storage),
            self.signal_config.clone(),
        );
        self.stores.insert(
            type_id,
            RegisteredStore {
                table: T::table_name(),
                store: Box::new(store.clone()),
            },
        );
        debug_log!(table = T::table_name(), "store registered");
        Ok(store)
    }

    /// Get the registered store for model `T`
    pub fn store<T: SoftDeletable>(&self) -> Result<&SoftDeleteStore<T, PgStorage>, SoftHausError> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|registered| registered.store.downcast_ref::<SoftDeleteStore<T, PgStorage>>())
            .ok_or_else(|| SoftHausError::StoreNotRegistered(T::table_name().to_string()))
    }

    /// Remove the store for model `T`
    pub fn unregister<T: SoftDeletable>(&mut self) -> Result<(), SoftHausError> {
        self.stores
            .remove(&TypeId::of::<T>())
            .map(|_| {
                trace_log!(table = T::table_name(), "store unregistered");
            })
            .ok_or_else(|| SoftHausError::StoreNotRegistered(T::table_name().to_string()))
    }

    /// Tables of all registered stores
    pub fn list_stores(&self) -> Vec<&'static str> {
        let mut tables: Vec<&'static str> = self.stores.values().map(|r| r.table).collect();
        tables.sort_unstable();
        tables
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), SoftHausError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
