//! In-memory store implementations
//!
//! DashMap-backed stores for dev mode and tests. The same storage contract
//! as the MongoDB implementations, including the one operation where
//! atomicity matters: `InviteLedger::consume` maps to a single `DashMap`
//! removal, so two concurrent consumes of one token still yield exactly one
//! success.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use dashmap::DashMap;

use crate::db::schemas::{ConnectionDoc, ConnectionStatus, Metadata, WorkRecordDoc};
use crate::db::store::{ConnectionStore, InviteLedger, WorkRecordStore};
use crate::types::{CoreError, Identifier, Result};

/// Work records held in memory
#[derive(Default)]
pub struct MemoryWorkRecords {
    records: DashMap<ObjectId, WorkRecordDoc>,
}

impl MemoryWorkRecords {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkRecordStore for MemoryWorkRecords {
    async fn insert(&self, record: WorkRecordDoc) -> Result<WorkRecordDoc> {
        let mut stored = record;
        let id = ObjectId::new();
        stored._id = Some(id);
        stored.metadata = Metadata::new();
        self.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<WorkRecordDoc>> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn find_siblings(
        &self,
        slug: &str,
        exclude_user: ObjectId,
    ) -> Result<Vec<WorkRecordDoc>> {
        let mut siblings: Vec<WorkRecordDoc> = self
            .records
            .iter()
            .filter(|r| r.slug == slug && r.user != exclude_user)
            .map(|r| r.clone())
            .collect();
        // Deterministic order regardless of map iteration
        siblings.sort_by_key(|r| r._id);
        Ok(siblings)
    }

    async fn find_for_event_user(
        &self,
        slug: &str,
        user: ObjectId,
    ) -> Result<Option<WorkRecordDoc>> {
        let mut matches: Vec<WorkRecordDoc> = self
            .records
            .iter()
            .filter(|r| r.slug == slug && r.user == user)
            .map(|r| r.clone())
            .collect();
        matches.sort_by_key(|r| r._id);
        Ok(matches.into_iter().next())
    }

    async fn add_coworker(&self, work_id: ObjectId, coworker: &Identifier) -> Result<()> {
        let mut record = self
            .records
            .get_mut(&work_id)
            .ok_or_else(|| CoreError::NotFound("work record".into()))?;
        if !record.coworkers.contains(coworker) {
            record.coworkers.push(coworker.clone());
        }
        record.metadata.touch();
        Ok(())
    }

    async fn upgrade_claim(&self, work_id: ObjectId, email: &str, user: ObjectId) -> Result<()> {
        // Missing record is a no-op, matching the matched-count-zero
        // behavior of the MongoDB implementation
        if let Some(mut record) = self.records.get_mut(&work_id) {
            record
                .coworkers
                .retain(|c| c.as_email() != Some(email));
            let resolved = Identifier::User(user);
            if !record.coworkers.contains(&resolved) {
                record.coworkers.push(resolved);
            }
            record.metadata.touch();
        }
        Ok(())
    }

    async fn add_verifier(&self, slug: &str, user: ObjectId, verifier: ObjectId) -> Result<bool> {
        let target = {
            let mut ids: Vec<ObjectId> = self
                .records
                .iter()
                .filter(|r| r.slug == slug && r.user == user)
                .filter_map(|r| r._id)
                .collect();
            ids.sort();
            ids.into_iter().next()
        };
        match target {
            Some(id) => {
                if let Some(mut record) = self.records.get_mut(&id) {
                    if !record.verifiers.contains(&verifier) {
                        record.verifiers.push(verifier);
                    }
                    record.metadata.touch();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Connection edges held in memory
#[derive(Default)]
pub struct MemoryConnections {
    edges: DashMap<ObjectId, ConnectionDoc>,
}

impl MemoryConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnections {
    async fn insert(&self, edge: ConnectionDoc) -> Result<ConnectionDoc> {
        let mut stored = edge;
        let id = ObjectId::new();
        stored._id = Some(id);
        stored.metadata = Metadata::new();
        self.edges.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ConnectionDoc>> {
        Ok(self.edges.get(&id).map(|e| e.clone()))
    }

    async fn find_directed(
        &self,
        from: &Identifier,
        to: &Identifier,
    ) -> Result<Option<ConnectionDoc>> {
        let mut matches: Vec<ConnectionDoc> = self
            .edges
            .iter()
            .filter(|e| e.from == *from && e.to == *to)
            .map(|e| e.clone())
            .collect();
        matches.sort_by_key(|e| e._id);
        Ok(matches.into_iter().next())
    }

    async fn find_pair_active(
        &self,
        a: &Identifier,
        b: &Identifier,
    ) -> Result<Vec<ConnectionDoc>> {
        let mut matches: Vec<ConnectionDoc> = self
            .edges
            .iter()
            .filter(|e| e.joins(a, b) && !e.status.is_terminal())
            .map(|e| e.clone())
            .collect();
        matches.sort_by_key(|e| e._id);
        Ok(matches)
    }

    async fn mark_connected(
        &self,
        id: ObjectId,
        resolve_to: Option<ObjectId>,
        set_coworker: bool,
    ) -> Result<ConnectionDoc> {
        let mut edge = self
            .edges
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound("connection".into()))?;
        edge.status = ConnectionStatus::Connected;
        edge.connected_at = Some(DateTime::now());
        if let Some(user) = resolve_to {
            edge.to = Identifier::User(user);
        }
        if set_coworker {
            edge.is_coworker = true;
        }
        edge.metadata.touch();
        Ok(edge.clone())
    }

    async fn mark_disconnected(&self, id: ObjectId) -> Result<()> {
        let mut edge = self
            .edges
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound("connection".into()))?;
        edge.status = ConnectionStatus::Disconnected;
        edge.disconnected_at = Some(DateTime::now());
        edge.metadata.touch();
        Ok(())
    }
}

/// Invite-token ledger held in memory
#[derive(Default)]
pub struct MemoryInviteLedger {
    tokens: DashMap<String, DateTime>,
}

impl MemoryInviteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding (issued, unconsumed) tokens
    pub fn outstanding(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl InviteLedger for MemoryInviteLedger {
    async fn persist(&self, token: &str) -> Result<()> {
        self.tokens.insert(token.to_string(), DateTime::now());
        Ok(())
    }

    async fn consume(&self, token: &str) -> Result<bool> {
        // DashMap::remove is a single atomic removal
        Ok(self.tokens.remove(token).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{AddMethod, ConnectionType};
    use crate::work::WorkFields;
    use chrono::NaiveDate;

    fn fields() -> WorkFields {
        WorkFields {
            title: "Harvest Festival".to_string(),
            role: "Stage Manager".to_string(),
            from: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
            caption: None,
            photos: Vec::new(),
            pin_to_profile: false,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_metadata() {
        let store = MemoryWorkRecords::new();
        let record = WorkRecordDoc::new(
            ObjectId::new(),
            "harvest-festival-20250901-20250903",
            &fields(),
            Vec::new(),
            AddMethod::Created,
        );
        let stored = store.insert(record).await.unwrap();
        assert!(stored._id.is_some());
        assert!(stored.metadata.created_at.is_some());
    }

    #[tokio::test]
    async fn test_siblings_exclude_anchor_owner() {
        let store = MemoryWorkRecords::new();
        let owner = ObjectId::new();
        let other = ObjectId::new();
        let slug = "harvest-festival-20250901-20250903";

        store
            .insert(WorkRecordDoc::new(owner, slug, &fields(), Vec::new(), AddMethod::Created))
            .await
            .unwrap();
        store
            .insert(WorkRecordDoc::new(other, slug, &fields(), Vec::new(), AddMethod::Created))
            .await
            .unwrap();

        let siblings = store.find_siblings(slug, owner).await.unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].user, other);
    }

    #[tokio::test]
    async fn test_upgrade_claim_swaps_email_for_user() {
        let store = MemoryWorkRecords::new();
        let owner = ObjectId::new();
        let invitee = ObjectId::new();
        let record = store
            .insert(WorkRecordDoc::new(
                owner,
                "harvest-festival-20250901-20250903",
                &fields(),
                vec![Identifier::email("rigger@example.com")],
                AddMethod::Created,
            ))
            .await
            .unwrap();

        let id = record._id.unwrap();
        store
            .upgrade_claim(id, "rigger@example.com", invitee)
            .await
            .unwrap();

        let reloaded = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.coworkers, vec![Identifier::User(invitee)]);

        // Re-running the upgrade changes nothing
        store
            .upgrade_claim(id, "rigger@example.com", invitee)
            .await
            .unwrap();
        let reloaded = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.coworkers, vec![Identifier::User(invitee)]);
    }

    #[tokio::test]
    async fn test_add_verifier_reports_missing_sibling() {
        let store = MemoryWorkRecords::new();
        let matched = store
            .add_verifier("no-such-event-20250101-20250102", ObjectId::new(), ObjectId::new())
            .await
            .unwrap();
        assert!(!matched);
    }

    #[tokio::test]
    async fn test_directed_lookup_is_one_way() {
        let store = MemoryConnections::new();
        let a = Identifier::User(ObjectId::new());
        let b = Identifier::User(ObjectId::new());

        store
            .insert(ConnectionDoc::new(a.clone(), b.clone(), ConnectionType::F2f, false))
            .await
            .unwrap();

        assert!(store.find_directed(&a, &b).await.unwrap().is_some());
        assert!(store.find_directed(&b, &a).await.unwrap().is_none());

        let pair = store.find_pair_active(&b, &a).await.unwrap();
        assert_eq!(pair.len(), 1);
    }

    #[test]
    fn test_ledger_consume_is_single_use() {
        let ledger = MemoryInviteLedger::new();
        tokio_test::block_on(async {
            ledger.persist("tok-1").await.unwrap();
            assert_eq!(ledger.outstanding(), 1);
            assert!(ledger.consume("tok-1").await.unwrap());
            assert!(!ledger.consume("tok-1").await.unwrap());
            assert!(!ledger.consume("never-issued").await.unwrap());
        });
    }
}
