//! MongoDB client, collection wrapper, and store implementations
//!
//! The typed collection wrapper applies schema-declared indexes on first use
//! and maintains document metadata timestamps. Store-trait implementations
//! for the three collections live below the wrapper.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::StreamExt;
use mongodb::{
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::{
    ConnectionDoc, ConnectionStatus, InviteTokenDoc, Metadata, WorkRecordDoc,
    CONNECTION_COLLECTION, INVITE_TOKEN_COLLECTION, WORK_RECORD_COLLECTION,
};
use crate::db::store::{ConnectionStore, InviteLedger, WorkRecordStore};
use crate::types::{CoreError, Identifier, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Bound server selection so an unreachable MongoDB fails fast
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CoreError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CoreError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, applying its schema-declared indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// The raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// The database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection handle and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| CoreError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| CoreError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| CoreError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter, excluding soft-deleted documents
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| CoreError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, excluding soft-deleted documents
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| CoreError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document, refreshing its update timestamp
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, stamp_updated(update.into()))
            .await
            .map_err(|e| CoreError::Database(format!("Update failed: {}", e)))
    }

    /// Atomically remove and return one document. This is the primitive the
    /// token ledger relies on: two concurrent removals of the same document
    /// yield exactly one `Some`.
    pub async fn find_one_and_delete(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one_and_delete(filter)
            .await
            .map_err(|e| CoreError::Database(format!("Find-and-delete failed: {}", e)))
    }

    /// Atomically update and return the post-update document
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>> {
        self.inner
            .find_one_and_update(filter, stamp_updated(UpdateModifications::Document(update)))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| CoreError::Database(format!("Find-and-update failed: {}", e)))
    }

    /// The underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Fold `metadata.updated_at` into an update's `$set` clause
fn stamp_updated(update: UpdateModifications) -> UpdateModifications {
    match update {
        UpdateModifications::Document(mut doc) => {
            let mut set = doc.get_document("$set").ok().cloned().unwrap_or_default();
            set.insert("metadata.updated_at", DateTime::now());
            doc.insert("$set", set);
            UpdateModifications::Document(doc)
        }
        other => other,
    }
}

// ============================================================================
// Store implementations
// ============================================================================

/// Work records backed by the `work_records` collection
#[derive(Clone)]
pub struct MongoWorkRecords {
    collection: MongoCollection<WorkRecordDoc>,
}

impl MongoWorkRecords {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(WORK_RECORD_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl WorkRecordStore for MongoWorkRecords {
    async fn insert(&self, record: WorkRecordDoc) -> Result<WorkRecordDoc> {
        let mut stored = record;
        let id = self.collection.insert_one(stored.clone()).await?;
        stored._id = Some(id);
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<WorkRecordDoc>> {
        self.collection.find_one(doc! { "_id": id }).await
    }

    async fn find_siblings(
        &self,
        slug: &str,
        exclude_user: ObjectId,
    ) -> Result<Vec<WorkRecordDoc>> {
        self.collection
            .find_many(doc! { "slug": slug, "user": { "$ne": exclude_user } })
            .await
    }

    async fn find_for_event_user(
        &self,
        slug: &str,
        user: ObjectId,
    ) -> Result<Option<WorkRecordDoc>> {
        self.collection
            .find_one(doc! { "slug": slug, "user": user })
            .await
    }

    async fn add_coworker(&self, work_id: ObjectId, coworker: &Identifier) -> Result<()> {
        let value = bson::to_bson(coworker)
            .map_err(|e| CoreError::Database(format!("Identifier encoding failed: {}", e)))?;
        self.collection
            .update_one(
                doc! { "_id": work_id },
                doc! { "$addToSet": { "coworkers": value } },
            )
            .await?;
        Ok(())
    }

    async fn upgrade_claim(&self, work_id: ObjectId, email: &str, user: ObjectId) -> Result<()> {
        // $pull and $addToSet on the same field conflict within one update,
        // so the upgrade is two sequential writes. Both are idempotent.
        self.collection
            .update_one(
                doc! { "_id": work_id },
                doc! { "$pull": { "coworkers": email } },
            )
            .await?;
        self.collection
            .update_one(
                doc! { "_id": work_id },
                doc! { "$addToSet": { "coworkers": user } },
            )
            .await?;
        Ok(())
    }

    async fn add_verifier(&self, slug: &str, user: ObjectId, verifier: ObjectId) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "slug": slug, "user": user },
                doc! { "$addToSet": { "verifiers": verifier } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

/// Connections backed by the `connections` collection
#[derive(Clone)]
pub struct MongoConnections {
    collection: MongoCollection<ConnectionDoc>,
}

impl MongoConnections {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(CONNECTION_COLLECTION).await?,
        })
    }
}

fn identifier_bson(ident: &Identifier) -> Result<bson::Bson> {
    bson::to_bson(ident)
        .map_err(|e| CoreError::Database(format!("Identifier encoding failed: {}", e)))
}

#[async_trait::async_trait]
impl ConnectionStore for MongoConnections {
    async fn insert(&self, edge: ConnectionDoc) -> Result<ConnectionDoc> {
        let mut stored = edge;
        let id = self.collection.insert_one(stored.clone()).await?;
        stored._id = Some(id);
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ConnectionDoc>> {
        self.collection.find_one(doc! { "_id": id }).await
    }

    async fn find_directed(
        &self,
        from: &Identifier,
        to: &Identifier,
    ) -> Result<Option<ConnectionDoc>> {
        self.collection
            .find_one(doc! {
                "from": identifier_bson(from)?,
                "to": identifier_bson(to)?,
            })
            .await
    }

    async fn find_pair_active(
        &self,
        a: &Identifier,
        b: &Identifier,
    ) -> Result<Vec<ConnectionDoc>> {
        let a = identifier_bson(a)?;
        let b = identifier_bson(b)?;
        let active = bson::to_bson(&[ConnectionStatus::Pending, ConnectionStatus::Connected])
            .map_err(|e| CoreError::Database(format!("Status encoding failed: {}", e)))?;
        self.collection
            .find_many(doc! {
                "$or": [
                    { "from": a.clone(), "to": b.clone() },
                    { "from": b, "to": a },
                ],
                "status": { "$in": active },
            })
            .await
    }

    async fn mark_connected(
        &self,
        id: ObjectId,
        resolve_to: Option<ObjectId>,
        set_coworker: bool,
    ) -> Result<ConnectionDoc> {
        let mut set = doc! {
            "status": bson::to_bson(&ConnectionStatus::Connected)
                .map_err(|e| CoreError::Database(format!("Status encoding failed: {}", e)))?,
            "connected_at": DateTime::now(),
        };
        if let Some(user) = resolve_to {
            set.insert("to", user);
        }
        if set_coworker {
            set.insert("is_coworker", true);
        }

        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .await?
            .ok_or_else(|| CoreError::NotFound("connection".into()))
    }

    async fn mark_disconnected(&self, id: ObjectId) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "status": bson::to_bson(&ConnectionStatus::Disconnected)
                        .map_err(|e| CoreError::Database(format!("Status encoding failed: {}", e)))?,
                    "disconnected_at": DateTime::now(),
                } },
            )
            .await?;
        Ok(())
    }
}

/// Invite-token ledger backed by the `invite_tokens` collection
#[derive(Clone)]
pub struct MongoInviteLedger {
    collection: MongoCollection<InviteTokenDoc>,
}

impl MongoInviteLedger {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(INVITE_TOKEN_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl InviteLedger for MongoInviteLedger {
    async fn persist(&self, token: &str) -> Result<()> {
        self.collection.insert_one(InviteTokenDoc::new(token)).await?;
        Ok(())
    }

    async fn consume(&self, token: &str) -> Result<bool> {
        // Single find-and-remove; a read followed by a delete would let two
        // concurrent redemptions both observe the entry.
        let removed = self
            .collection
            .find_one_and_delete(doc! { "token": token })
            .await?;
        Ok(removed.is_some())
    }
}
