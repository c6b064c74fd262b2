//! Explicit two-sided coworker verification
//!
//! The write path that turns an inferred relationship into an endorsed one:
//! the anchor owner claims the coworker, the coworker's own record gains a
//! verifier, and a CONNECTED edge is ensured between the two. The two
//! document writes are a saga, not a transaction: each is idempotent (set
//! semantics), and a crash between them leaves an asymmetry that a later
//! verification or reconciliation converges.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::{debug, info, warn};

use crate::connections::ConnectionGraph;
use crate::db::store::WorkRecordStore;
use crate::types::{CoreError, Identifier, Result};

/// Applies explicit coworker verifications
#[derive(Clone)]
pub struct Verifier {
    works: Arc<dyn WorkRecordStore>,
    graph: ConnectionGraph,
}

impl Verifier {
    pub fn new(works: Arc<dyn WorkRecordStore>, graph: ConnectionGraph) -> Self {
        Self { works, graph }
    }

    /// Verify that `coworker` worked the event with the owner of `work_id`.
    ///
    /// The claim write on the anchor record is the primary write; the
    /// endorsement on the coworker's sibling record and the connection edge
    /// are issued afterwards and logged rather than raised on failure; the
    /// caller sees success once the primary write lands, and reconciliation
    /// smooths over partial application.
    pub async fn verify_coworker(
        &self,
        work_id: ObjectId,
        coworker: ObjectId,
        verifier: ObjectId,
        slug: &str,
    ) -> Result<()> {
        let anchor = self
            .works
            .find_by_id(work_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("work record".into()))?;

        // 1. The owner now explicitly claims this coworker
        self.works
            .add_coworker(work_id, &Identifier::User(coworker))
            .await?;

        // 2. The coworker's own record carries the endorsement
        match self.works.add_verifier(slug, coworker, verifier).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(%slug, %coworker, "no sibling record to endorse yet");
            }
            Err(e) => {
                warn!(
                    %slug, %coworker, error = %e,
                    "verifier write failed; a later verification converges the state"
                );
            }
        }

        // 3. Verification always implies a connection
        if let Err(e) = self
            .graph
            .create_coworker_connection(coworker, anchor.user)
            .await
        {
            warn!(
                %coworker, owner = %anchor.user, error = %e,
                "coworker edge write failed; a later verification converges the state"
            );
        }

        info!(work = %work_id, %coworker, %verifier, "coworker verified");
        Ok(())
    }
}
