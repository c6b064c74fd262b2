//! Connection graph operations
//!
//! Lifecycle: `PENDING -> {CONNECTED, DISCONNECTED, IGNORED}`;
//! `CONNECTED -> DISCONNECTED`. The duplicate check on `request` is
//! direction-specific (an existing A->B edge does not block B->A), while
//! `disconnect` and the coworker edge sweep both orderings.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::{debug, info};

use crate::db::schemas::{ConnectionDoc, ConnectionStatus, ConnectionType};
use crate::db::store::ConnectionStore;
use crate::types::{CoreError, Identifier, Result};

/// Pairwise relationship graph over the connection store
#[derive(Clone)]
pub struct ConnectionGraph {
    store: Arc<dyn ConnectionStore>,
}

impl ConnectionGraph {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    /// File a connection request from `from` to `to`. Fails with
    /// `DuplicateRequest` when any edge already exists in this exact
    /// ordering.
    pub async fn request(
        &self,
        from: Identifier,
        to: Identifier,
        connection_type: ConnectionType,
        is_coworker: bool,
    ) -> Result<ConnectionDoc> {
        if self.store.find_directed(&from, &to).await?.is_some() {
            return Err(CoreError::DuplicateRequest);
        }

        let edge = self
            .store
            .insert(ConnectionDoc::new(from, to, connection_type, is_coworker))
            .await?;

        debug!(edge = ?edge.id(), "connection requested");
        Ok(edge)
    }

    /// Accept a pending request. When the requested side was a raw email,
    /// it is resolved to the accepting user in the same update.
    pub async fn accept(
        &self,
        connection_id: ObjectId,
        accepting_user: ObjectId,
    ) -> Result<ConnectionDoc> {
        let edge = self
            .store
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("connection".into()))?;

        let resolve_to = edge.to.is_email().then_some(accepting_user);
        let updated = self
            .store
            .mark_connected(connection_id, resolve_to, edge.is_coworker)
            .await?;

        info!(edge = %connection_id, "connection accepted");
        Ok(updated)
    }

    /// Disconnect two users: every non-terminal edge joining them, in either
    /// ordering, transitions to DISCONNECTED.
    pub async fn disconnect(&self, user_a: ObjectId, user_b: ObjectId) -> Result<()> {
        let a = Identifier::User(user_a);
        let b = Identifier::User(user_b);

        let edges = self.store.find_pair_active(&a, &b).await?;
        let count = edges.len();
        for edge in edges {
            if let Some(id) = edge.id() {
                self.store.mark_disconnected(id).await?;
            }
        }

        info!(%user_a, %user_b, edges = count, "disconnected");
        Ok(())
    }

    /// Find-or-create the edge between two users, always settling at
    /// CONNECTED with the coworker flag set. Used by the verification path:
    /// verification always implies a connection. A PENDING edge in either
    /// direction is upgraded rather than duplicated.
    pub async fn create_coworker_connection(
        &self,
        user_a: ObjectId,
        user_b: ObjectId,
    ) -> Result<ConnectionDoc> {
        let a = Identifier::User(user_a);
        let b = Identifier::User(user_b);

        if let Some(edge) = self.store.find_pair_active(&a, &b).await?.into_iter().next() {
            let id = edge
                .id()
                .ok_or_else(|| CoreError::Database("stored edge missing id".into()))?;
            if edge.status == ConnectionStatus::Connected && edge.is_coworker {
                return Ok(edge);
            }
            let updated = self.store.mark_connected(id, None, true).await?;
            debug!(edge = %id, "existing edge settled as coworker connection");
            return Ok(updated);
        }

        let edge = self.store.insert(ConnectionDoc::coworker(a, b)).await?;
        debug!(edge = ?edge.id(), "coworker connection created");
        Ok(edge)
    }
}
