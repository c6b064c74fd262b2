//! Core error and identifier types
//!
//! Every operation in this crate returns [`CoreError`]; none of its kinds is
//! transient. A failure always reflects a state the caller must resolve
//! (re-invite, request in the other direction) rather than an infrastructure
//! hiccup, so there is no retry machinery here.

use std::fmt;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error taxonomy for the coworker-graph core
///
/// Errors propagate unmodified to the boundary layer, which owns status-code
/// mapping and user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Capability token is malformed, has a bad signature, or is expired
    #[error("invalid invite token: {0}")]
    InvalidToken(String),

    /// Capability token was already redeemed (or never issued)
    #[error("invite token already consumed or never issued")]
    AlreadyConsumed,

    /// A connection request already exists in this direction
    #[error("connection request already exists")]
    DuplicateRequest,

    /// Work record, connection, or user missing
    #[error("{0} not found")]
    NotFound(String),

    /// Store-layer failure, surfaced unmodified
    #[error("database error: {0}")]
    Database(String),
}

/// Mixed identifier: a registered user or a bare email address.
///
/// Work-record claim lists and connection endpoints are denormalized and may
/// hold either form. Serialized untagged so the stored value is a plain
/// ObjectId or string, matching the collection layout. An email is upgraded
/// to a user reference by an explicit resolve step at the boundary
/// (tagging, invite acceptance, connection acceptance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Reference to a registered user
    User(ObjectId),
    /// Raw email address of someone without an account (normalized lowercase)
    Email(String),
}

impl Identifier {
    /// Build an email identifier, normalizing case and whitespace
    pub fn email(addr: &str) -> Self {
        Self::Email(addr.trim().to_lowercase())
    }

    /// The user reference, if this identifier is resolved
    pub fn as_user(&self) -> Option<ObjectId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Email(_) => None,
        }
    }

    /// The raw email, if this identifier is unresolved
    pub fn as_email(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Email(addr) => Some(addr),
        }
    }

    /// Whether this identifier is an unresolved email
    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }
}

impl From<ObjectId> for Identifier {
    fn from(id: ObjectId) -> Self {
        Self::User(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{}", id.to_hex()),
            Self::Email(addr) => write!(f, "{}", addr),
        }
    }
}

/// User summary returned by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: ObjectId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserSummary {
    /// Full display name, as used in invite delivery payloads
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
