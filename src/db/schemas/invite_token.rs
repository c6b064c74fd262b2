//! Invite token ledger schema
//!
//! The consumption ledger that makes capability tokens single-use
//! independently of their cryptographic expiry window. The literal signed
//! token string is persisted at issuance; redemption removes it atomically.
//! The document carries nothing else: presence is the whole contract.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for the invite-token consumption ledger
pub const INVITE_TOKEN_COLLECTION: &str = "invite_tokens";

/// Ledger entry for one issued capability token
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct InviteTokenDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<bson::oid::ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// The literal signed token string, used purely as an existence check
    pub token: String,
}

impl InviteTokenDoc {
    /// Create a ledger entry for a freshly signed token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            token: token.into(),
        }
    }
}

impl IntoIndexes for InviteTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "token": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("token_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for InviteTokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
