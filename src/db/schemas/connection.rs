//! Connection document schema
//!
//! One document per directional relationship request, queried bidirectionally
//! by the disconnect and coworker-edge paths. Endpoints are mixed
//! identifiers: an email endpoint is resolved to a user reference when that
//! person accepts.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::Identifier;

/// Collection name for connections
pub const CONNECTION_COLLECTION: &str = "connections";

/// Connection lifecycle state
///
/// `PENDING -> {CONNECTED, DISCONNECTED, IGNORED}`; `CONNECTED ->
/// DISCONNECTED`. No transition out of DISCONNECTED or IGNORED.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    #[default]
    Pending,
    Connected,
    Disconnected,
    Ignored,
}

impl ConnectionStatus {
    /// Whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Ignored)
    }
}

/// Which sides of the marketplace the relationship spans
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Freelancer to freelancer
    #[default]
    F2f,
    /// Business to freelancer
    B2f,
    /// Freelancer to business
    F2b,
}

/// Connection document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConnectionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Requesting side
    pub from: Identifier,

    /// Requested side; may be a raw email until that person accepts
    pub to: Identifier,

    /// Lifecycle state
    #[serde(default)]
    pub status: ConnectionStatus,

    /// Marketplace sides spanned by this relationship
    #[serde(default)]
    pub connection_type: ConnectionType,

    /// Distinguishes coworker-originated edges from generic connects
    #[serde(default)]
    pub is_coworker: bool,

    /// Set when the edge reaches CONNECTED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime>,

    /// Set when the edge reaches DISCONNECTED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<DateTime>,
}

impl ConnectionDoc {
    /// Build a PENDING connection request
    pub fn new(
        from: Identifier,
        to: Identifier,
        connection_type: ConnectionType,
        is_coworker: bool,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            from,
            to,
            status: ConnectionStatus::Pending,
            connection_type,
            is_coworker,
            connected_at: None,
            disconnected_at: None,
        }
    }

    /// Build an edge that is born CONNECTED, as written by the verification
    /// path (verification always implies a connection)
    pub fn coworker(from: Identifier, to: Identifier) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            from,
            to,
            status: ConnectionStatus::Connected,
            connection_type: ConnectionType::F2f,
            is_coworker: true,
            connected_at: Some(DateTime::now()),
            disconnected_at: None,
        }
    }

    /// Document id, present once the edge has been stored
    pub fn id(&self) -> Option<ObjectId> {
        self._id
    }

    /// Whether this edge joins `a` and `b` in either direction
    pub fn joins(&self, a: &Identifier, b: &Identifier) -> bool {
        (self.from == *a && self.to == *b) || (self.from == *b && self.to == *a)
    }
}

impl IntoIndexes for ConnectionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "to": 1 },
                Some(IndexOptions::builder().name("to_index".to_string()).build()),
            ),
            (
                doc! { "from": 1 },
                Some(
                    IndexOptions::builder()
                        .name("from_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ConnectionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let status = bson::to_bson(&ConnectionStatus::Pending).unwrap();
        assert_eq!(status, bson::Bson::String("PENDING".to_string()));
        let kind = bson::to_bson(&ConnectionType::F2f).unwrap();
        assert_eq!(kind, bson::Bson::String("f2f".to_string()));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ConnectionStatus::Pending.is_terminal());
        assert!(!ConnectionStatus::Connected.is_terminal());
        assert!(ConnectionStatus::Disconnected.is_terminal());
        assert!(ConnectionStatus::Ignored.is_terminal());
    }

    #[test]
    fn test_joins_is_direction_agnostic() {
        let a = Identifier::User(ObjectId::new());
        let b = Identifier::User(ObjectId::new());
        let c = Identifier::email("bestboy@example.com");

        let edge = ConnectionDoc::new(a.clone(), b.clone(), ConnectionType::F2f, false);
        assert!(edge.joins(&a, &b));
        assert!(edge.joins(&b, &a));
        assert!(!edge.joins(&a, &c));
    }
}
