//! Work record document schema
//!
//! One document per (event, participant). There is no stored "event" entity:
//! records describing the same job converge on the same deterministic `slug`,
//! and that shared slug is the only thing binding them together. The
//! `coworkers` list is the owner's claim set, not a verification set;
//! `verifiers` holds users who have explicitly vouched for this record.

use bson::{doc, oid::ObjectId, Document};
use chrono::NaiveDate;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::Identifier;
use crate::work::WorkFields;

/// Collection name for work records
pub const WORK_RECORD_COLLECTION: &str = "work_records";

/// How a work record came into existence
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AddMethod {
    /// Logged by the owner themselves
    #[default]
    Created,
    /// Materialized from an accepted coworker invite
    Tagged,
}

/// Work record document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WorkRecordDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owner of this record
    pub user: ObjectId,

    /// Deterministic event key shared by all participants' records
    pub slug: String,

    /// Job title as entered by the owner
    pub title: String,

    /// Role the owner worked on this job
    pub role: String,

    /// First day of the job
    pub from: NaiveDate,

    /// Last day of the job
    pub to: NaiveDate,

    /// Free-form caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Photo references (object-storage keys, owned by an external collaborator)
    #[serde(default)]
    pub photos: Vec<String>,

    /// Whether the owner pinned this record to their profile
    #[serde(default)]
    pub pin_to_profile: bool,

    /// How this record was created
    #[serde(default)]
    pub add_method: AddMethod,

    /// The owner's claim set: people the owner says worked this job.
    /// Mixed identifiers; an email entry is upgraded to a user reference
    /// when that person accepts the invite.
    #[serde(default)]
    pub coworkers: Vec<Identifier>,

    /// Users who have explicitly vouched that the owner worked this job
    #[serde(default)]
    pub verifiers: Vec<ObjectId>,
}

impl WorkRecordDoc {
    /// Build a record for `user` from job fields and an initial claim set
    pub fn new(
        user: ObjectId,
        slug: &str,
        fields: &WorkFields,
        coworkers: Vec<Identifier>,
        add_method: AddMethod,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user,
            slug: slug.to_string(),
            title: fields.title.clone(),
            role: fields.role.clone(),
            from: fields.from,
            to: fields.to,
            caption: fields.caption.clone(),
            photos: fields.photos.clone(),
            pin_to_profile: fields.pin_to_profile,
            add_method,
            coworkers,
            verifiers: Vec::new(),
        }
    }

    /// Document id, present once the record has been stored
    pub fn id(&self) -> Option<ObjectId> {
        self._id
    }
}

impl IntoIndexes for WorkRecordDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Sibling lookup: all records for one event
            (
                doc! { "slug": 1 },
                Some(
                    IndexOptions::builder()
                        .name("slug_index".to_string())
                        .build(),
                ),
            ),
            // Per-user record listing
            (
                doc! { "user": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_index".to_string())
                        .build(),
                ),
            ),
            // Endorsement writes match on (slug, user)
            (
                doc! { "slug": 1, "user": 1 },
                Some(
                    IndexOptions::builder()
                        .name("slug_user_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for WorkRecordDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
