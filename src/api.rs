//! Core service facade
//!
//! The operation set exposed to the route/controller layer, wired over the
//! store bundle and collaborator traits. The boundary layer owns request
//! validation and status-code mapping; errors pass through unmodified.

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::collaborators::{IdentityProvider, InviteMailer, ProfileCounters, RoleRegistry};
use crate::connections::ConnectionGraph;
use crate::db::schemas::{ConnectionDoc, ConnectionType, WorkRecordDoc};
use crate::db::CoreStores;
use crate::invites::InviteService;
use crate::reconcile::{EventMember, Reconciler, Verifier};
use crate::types::{Identifier, Result};
use crate::work::{CoworkerTagger, WorkFields};

/// External collaborator bundle
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub mailer: Arc<dyn InviteMailer>,
    pub roles: Arc<dyn RoleRegistry>,
    pub counters: Arc<dyn ProfileCounters>,
}

/// The coworker-graph core: tagging, invites, verification, reconciliation,
/// and the connection graph behind one handle
#[derive(Clone)]
pub struct CoreService {
    tagger: CoworkerTagger,
    reconciler: Reconciler,
    verifier: Verifier,
    graph: ConnectionGraph,
}

impl CoreService {
    /// Wire the service over a store bundle and collaborators
    pub fn new(
        stores: CoreStores,
        collaborators: Collaborators,
        invite_secret: impl Into<String>,
        invite_ttl_seconds: i64,
    ) -> Self {
        let invites = InviteService::new(stores.invites.clone(), invite_secret, invite_ttl_seconds);
        let graph = ConnectionGraph::new(stores.connections.clone());

        Self {
            tagger: CoworkerTagger::new(
                stores.works.clone(),
                invites,
                collaborators.identity.clone(),
                collaborators.roles.clone(),
                collaborators.mailer.clone(),
                collaborators.counters.clone(),
            ),
            reconciler: Reconciler::new(stores.works.clone()),
            verifier: Verifier::new(stores.works, graph.clone()),
            graph,
        }
    }

    /// Log a work record for `owner`, tagging `coworkers`
    pub async fn add_work(
        &self,
        owner: ObjectId,
        fields: WorkFields,
        coworkers: Vec<Identifier>,
    ) -> Result<WorkRecordDoc> {
        self.tagger.create_work(owner, fields, coworkers).await
    }

    /// Redeem an invite token on behalf of `accepting_user`
    pub async fn accept_invite(
        &self,
        token: &str,
        accepting_user: ObjectId,
    ) -> Result<WorkRecordDoc> {
        self.tagger.accept_invite(token, accepting_user).await
    }

    /// The canonical membership view of the event anchored at `work_id`
    pub async fn reconcile_event_membership(
        &self,
        work_id: ObjectId,
    ) -> Result<Vec<EventMember>> {
        self.reconciler.event_membership(work_id).await
    }

    /// Explicitly verify that `coworker` worked the event with the owner of
    /// `work_id`
    pub async fn verify_coworker(
        &self,
        work_id: ObjectId,
        coworker: ObjectId,
        verifier: ObjectId,
        slug: &str,
    ) -> Result<()> {
        self.verifier
            .verify_coworker(work_id, coworker, verifier, slug)
            .await
    }

    /// File a connection request
    pub async fn request_connection(
        &self,
        from: Identifier,
        to: Identifier,
        connection_type: ConnectionType,
    ) -> Result<ConnectionDoc> {
        self.graph.request(from, to, connection_type, false).await
    }

    /// Accept a pending connection request
    pub async fn accept_connection(
        &self,
        connection_id: ObjectId,
        accepting_user: ObjectId,
    ) -> Result<ConnectionDoc> {
        self.graph.accept(connection_id, accepting_user).await
    }

    /// Disconnect two users in either direction
    pub async fn disconnect(&self, user_a: ObjectId, user_b: ObjectId) -> Result<()> {
        self.graph.disconnect(user_a, user_b).await
    }
}
