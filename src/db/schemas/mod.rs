//! Database schemas for the coworker-graph core
//!
//! Defines the three logical collections: work records, connections, and the
//! invite-token consumption ledger.

mod connection;
mod invite_token;
mod metadata;
mod work_record;

pub use connection::{
    ConnectionDoc, ConnectionStatus, ConnectionType, CONNECTION_COLLECTION,
};
pub use invite_token::{InviteTokenDoc, INVITE_TOKEN_COLLECTION};
pub use metadata::Metadata;
pub use work_record::{AddMethod, WorkRecordDoc, WORK_RECORD_COLLECTION};
