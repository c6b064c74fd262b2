//! Storage layer
//!
//! Three logical collections (`work_records`, `connections`,
//! `invite_tokens`) behind store traits with MongoDB and in-memory
//! implementations. Services hold `Arc<dyn ...>` handles; which backend is
//! wired in is a composition-time decision (see [`CoreStores`]).

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

use std::sync::Arc;

pub use mongo::MongoClient;
use mongo::{MongoConnections, MongoInviteLedger, MongoWorkRecords};
use store::{ConnectionStore, InviteLedger, WorkRecordStore};

use crate::types::Result;

/// Bundle of store handles for the whole subsystem
#[derive(Clone)]
pub struct CoreStores {
    pub works: Arc<dyn WorkRecordStore>,
    pub connections: Arc<dyn ConnectionStore>,
    pub invites: Arc<dyn InviteLedger>,
}

impl CoreStores {
    /// Stores backed by MongoDB collections (applies indexes on startup)
    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            works: Arc::new(MongoWorkRecords::new(client).await?),
            connections: Arc::new(MongoConnections::new(client).await?),
            invites: Arc::new(MongoInviteLedger::new(client).await?),
        })
    }

    /// Stores backed by in-memory maps, for dev mode and tests
    pub fn in_memory() -> Self {
        Self {
            works: Arc::new(memory::MemoryWorkRecords::new()),
            connections: Arc::new(memory::MemoryConnections::new()),
            invites: Arc::new(memory::MemoryInviteLedger::new()),
        }
    }
}
