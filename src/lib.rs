//! Crewline coworker-graph core
//!
//! Backend core for the Crewline freelance network: users log jobs ("work
//! records"), tag the coworkers who shared them, and build a verified
//! professional connection graph.
//!
//! The graph lives across independently-owned, denormalized records; there
//! is no central event entity. Records describing the same job converge on
//! a deterministic slug; single-use signed capability tokens bridge
//! unregistered (email-only) participants into the graph; and a read-time
//! reconciler merges each participant's record into one classified
//! membership view (invited / verified / verifiable).
//!
//! ## Modules
//!
//! - **invites**: capability token issuance and single-use redemption
//! - **work**: work records, the deterministic event slug, the coworker
//!   tagger
//! - **reconcile**: read-time membership classification and explicit
//!   two-sided verification
//! - **connections**: the pairwise relationship graph
//! - **db**: store traits with MongoDB and in-memory backends
//! - **collaborators**: contracts for identity, mail, roles, and counters
//! - **api**: the [`CoreService`] facade exposed to the route layer

pub mod api;
pub mod collaborators;
pub mod config;
pub mod connections;
pub mod db;
pub mod invites;
pub mod logging;
pub mod reconcile;
pub mod types;
pub mod work;

pub use api::{Collaborators, CoreService};
pub use config::CoreArgs;
pub use types::{CoreError, Identifier, Result, UserSummary};
