//! Store traits for the three logical collections
//!
//! Concurrency correctness is entirely a storage contract: there is no
//! in-process shared mutable state beyond these handles. Each trait has a
//! MongoDB implementation ([`crate::db::mongo`]) and a DashMap-backed
//! in-memory implementation ([`crate::db::memory`]) used in dev mode and
//! tests.

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::schemas::{ConnectionDoc, WorkRecordDoc};
use crate::types::{Identifier, Result};

/// Work record persistence
#[async_trait]
pub trait WorkRecordStore: Send + Sync {
    /// Insert a record, returning it with the store-assigned id set
    async fn insert(&self, record: WorkRecordDoc) -> Result<WorkRecordDoc>;

    /// Load one record by id
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<WorkRecordDoc>>;

    /// All records sharing `slug` owned by someone other than `exclude_user`
    async fn find_siblings(
        &self,
        slug: &str,
        exclude_user: ObjectId,
    ) -> Result<Vec<WorkRecordDoc>>;

    /// One user's record for an event, if any
    async fn find_for_event_user(
        &self,
        slug: &str,
        user: ObjectId,
    ) -> Result<Option<WorkRecordDoc>>;

    /// Add an identifier to a record's claim set (set semantics: a present
    /// entry is not duplicated)
    async fn add_coworker(&self, work_id: ObjectId, coworker: &Identifier) -> Result<()>;

    /// Upgrade an email claim to a resolved user claim: pull the email from
    /// the claim set and add the user reference. No-op when the record or
    /// the email entry is absent; the user reference is added regardless so
    /// the upgrade is idempotent.
    async fn upgrade_claim(&self, work_id: ObjectId, email: &str, user: ObjectId) -> Result<()>;

    /// Add `verifier` to the verifier list of the record matching
    /// (`slug`, `user`). Returns false when no such record exists yet.
    async fn add_verifier(&self, slug: &str, user: ObjectId, verifier: ObjectId) -> Result<bool>;
}

/// Connection edge persistence
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert an edge, returning it with the store-assigned id set
    async fn insert(&self, edge: ConnectionDoc) -> Result<ConnectionDoc>;

    /// Load one edge by id
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ConnectionDoc>>;

    /// Any edge with exactly this (`from`, `to`) ordering, regardless of
    /// status. The duplicate check on request is direction-specific; the
    /// pair lookup below is not.
    async fn find_directed(
        &self,
        from: &Identifier,
        to: &Identifier,
    ) -> Result<Option<ConnectionDoc>>;

    /// All non-terminal (PENDING or CONNECTED) edges joining `a` and `b`
    /// in either direction
    async fn find_pair_active(
        &self,
        a: &Identifier,
        b: &Identifier,
    ) -> Result<Vec<ConnectionDoc>>;

    /// Transition an edge to CONNECTED, stamping `connected_at`. When
    /// `resolve_to` is set the email endpoint is rewritten to that user in
    /// the same update; `set_coworker` forces the coworker flag on. Returns
    /// the updated edge.
    async fn mark_connected(
        &self,
        id: ObjectId,
        resolve_to: Option<ObjectId>,
        set_coworker: bool,
    ) -> Result<ConnectionDoc>;

    /// Transition an edge to DISCONNECTED, stamping `disconnected_at`
    async fn mark_disconnected(&self, id: ObjectId) -> Result<()>;
}

/// Invite-token consumption ledger
#[async_trait]
pub trait InviteLedger: Send + Sync {
    /// Persist the literal signed token string at issuance
    async fn persist(&self, token: &str) -> Result<()>;

    /// Atomically remove the ledger entry for `token`, returning whether it
    /// was present. Two concurrent consumes of the same token must yield
    /// exactly one `true`; a plain read-then-delete does not satisfy this.
    async fn consume(&self, token: &str) -> Result<bool>;
}
