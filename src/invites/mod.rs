//! Capability tokens for coworker invites
//!
//! A signed, single-use credential lets an unregistered invitee materialize
//! their side of a tagged job. Single-use is enforced by two decoupled
//! checks composed at redemption: the HS256 signature with expiry, and the
//! consumption ledger keyed by the literal token string.

pub mod service;
pub mod token;

pub use service::InviteService;
pub use token::{InviteClaims, TaggerRef, WorkSnapshot};
