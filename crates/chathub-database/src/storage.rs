//! Storage bundle selected by configuration.

use std::sync::Arc;

use tracing::info;

use chathub_core::config::database::{DatabaseConfig, StorageProvider};
use chathub_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::migration::run_migrations;
use crate::repositories::{
    CallRepository, ChatRepository, ContactRepository, MessageRepository, UserRepository,
};
use crate::store::{CallStore, ChatStore, ContactStore, MessageStore, UserStore};

/// One implementation of every storage trait, shared by all components.
#[derive(Debug, Clone)]
pub struct Storage {
    /// User lookups and presence.
    pub users: Arc<dyn UserStore>,
    /// Contact edges.
    pub contacts: Arc<dyn ContactStore>,
    /// Conversations.
    pub chats: Arc<dyn ChatStore>,
    /// Messages.
    pub messages: Arc<dyn MessageStore>,
    /// Call rows.
    pub calls: Arc<dyn CallStore>,
    pool: Option<DatabasePool>,
}

impl Storage {
    /// Build the configured storage backend.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider {
            StorageProvider::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self::postgres(pool))
            }
            StorageProvider::Memory => {
                info!("Using in-memory storage provider");
                Ok(Self::memory().0)
            }
        }
    }

    /// Build PostgreSQL-backed storage from an existing pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        let pg = pool.pool().clone();
        Self {
            users: Arc::new(UserRepository::new(pg.clone())),
            contacts: Arc::new(ContactRepository::new(pg.clone())),
            chats: Arc::new(ChatRepository::new(pg.clone())),
            messages: Arc::new(MessageRepository::new(pg.clone())),
            calls: Arc::new(CallRepository::new(pg)),
            pool: Some(pool),
        }
    }

    /// Build an isolated in-memory storage, returning the store for seeding.
    pub fn memory() -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Self::from_memory(store.clone()), store)
    }

    /// Build storage over an existing in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            contacts: store.clone(),
            chats: store.clone(),
            messages: store.clone(),
            calls: store,
            pool: None,
        }
    }

    /// Check backend connectivity. The in-memory store is always healthy.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(true),
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
