//! Verification reconciler
//!
//! Read-time merge of independently-owned work records into one coherent
//! per-event membership view. There is no central event entity: the anchor
//! record's claim set and the sibling records sharing its slug are the only
//! inputs, and the merge is a pure function over them: side-effect-free,
//! re-derivable, never cached as mutable truth.

pub mod verify;

use std::sync::Arc;

use bson::oid::ObjectId;
use serde::Serialize;

use crate::db::schemas::WorkRecordDoc;
use crate::db::store::WorkRecordStore;
use crate::types::{CoreError, Identifier, Result};

pub use verify::Verifier;

/// How a participant relates to the anchor record's view of the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Claimed by the anchor owner with no reciprocal record yet; the
    /// invite is still outstanding
    Invited,
    /// Claimed by the anchor owner AND independently recorded by the
    /// participant: mutual corroboration
    Verified,
    /// A sibling record exists but was never claimed by the anchor owner;
    /// an un-linked candidate the viewer may choose to endorse
    Verifiable,
}

/// One entry in the reconciled membership view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMember {
    /// The participant (resolved user, or raw email for outstanding invites)
    pub member: Identifier,

    /// The participant's role from their own sibling record; absent for
    /// invited entries, which have no record yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    pub classification: Classification,
}

/// Classify event membership from the anchor's claim set and the sibling
/// records sharing its slug.
///
/// Pure and order-independent: duplicates in the claim set collapse, and
/// the classification of any participant does not depend on the order in
/// which siblings are scanned.
pub fn classify(claims: &[Identifier], siblings: &[WorkRecordDoc]) -> Vec<EventMember> {
    // Working set of outstanding claims, deduplicated
    let mut outstanding: Vec<Identifier> = Vec::with_capacity(claims.len());
    for claim in claims {
        if !outstanding.contains(claim) {
            outstanding.push(claim.clone());
        }
    }

    let mut members = Vec::with_capacity(outstanding.len() + siblings.len());

    for sibling in siblings {
        let ident = Identifier::User(sibling.user);
        let classification = match outstanding.iter().position(|c| *c == ident) {
            Some(pos) => {
                outstanding.remove(pos);
                Classification::Verified
            }
            None => Classification::Verifiable,
        };
        members.push(EventMember {
            member: ident,
            role: Some(sibling.role.clone()),
            classification,
        });
    }

    // Whatever the sibling sweep did not consume is an outstanding invite
    for claim in outstanding {
        members.push(EventMember {
            member: claim,
            role: None,
            classification: Classification::Invited,
        });
    }

    members
}

/// Loads the anchor and its siblings, then classifies
#[derive(Clone)]
pub struct Reconciler {
    works: Arc<dyn WorkRecordStore>,
}

impl Reconciler {
    pub fn new(works: Arc<dyn WorkRecordStore>) -> Self {
        Self { works }
    }

    /// The canonical membership view of the event anchored at `work_id`.
    ///
    /// Read-only; safe under unbounded concurrency and tolerant of sibling
    /// records appearing between calls (the next call simply reclassifies).
    pub async fn event_membership(&self, work_id: ObjectId) -> Result<Vec<EventMember>> {
        let anchor = self
            .works
            .find_by_id(work_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("work record".into()))?;

        let siblings = self.works.find_siblings(&anchor.slug, anchor.user).await?;

        Ok(classify(&anchor.coworkers, &siblings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::AddMethod;
    use crate::work::WorkFields;
    use chrono::NaiveDate;

    const SLUG: &str = "summer-jazz-festival-20250612-20250614";

    fn fields(role: &str) -> WorkFields {
        WorkFields {
            title: "Summer Jazz Festival".to_string(),
            role: role.to_string(),
            from: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            caption: None,
            photos: Vec::new(),
            pin_to_profile: false,
        }
    }

    fn sibling(user: ObjectId, role: &str) -> WorkRecordDoc {
        let mut record = WorkRecordDoc::new(user, SLUG, &fields(role), Vec::new(), AddMethod::Created);
        record._id = Some(ObjectId::new());
        record
    }

    fn by_member(members: &[EventMember], ident: &Identifier) -> Classification {
        members
            .iter()
            .find(|m| m.member == *ident)
            .map(|m| m.classification)
            .expect("member missing from classification")
    }

    #[test]
    fn test_three_way_classification() {
        // O claims A (email, never accepted) and B (registered user). B
        // independently logged the same event; C logged it unclaimed.
        let b = ObjectId::new();
        let c = ObjectId::new();
        let a_email = Identifier::email("sound-tech@example.com");
        let claims = vec![a_email.clone(), Identifier::User(b)];
        let siblings = vec![sibling(b, "Sound Tech"), sibling(c, "Lighting")];

        let members = classify(&claims, &siblings);
        assert_eq!(members.len(), 3);

        assert_eq!(by_member(&members, &a_email), Classification::Invited);
        assert_eq!(by_member(&members, &Identifier::User(b)), Classification::Verified);
        assert_eq!(by_member(&members, &Identifier::User(c)), Classification::Verifiable);

        // Roles come from the siblings' own records
        let verified = members.iter().find(|m| m.member == Identifier::User(b)).unwrap();
        assert_eq!(verified.role.as_deref(), Some("Sound Tech"));
        let invited = members.iter().find(|m| m.member == a_email).unwrap();
        assert_eq!(invited.role, None);
    }

    #[test]
    fn test_classification_is_order_independent() {
        let b = ObjectId::new();
        let c = ObjectId::new();
        let claims = vec![Identifier::User(b), Identifier::email("x@example.com")];
        let mut siblings = vec![sibling(b, "Sound Tech"), sibling(c, "Lighting")];

        let forward = classify(&claims, &siblings);
        siblings.reverse();
        let backward = classify(&claims, &siblings);

        for member in &forward {
            assert_eq!(
                member.classification,
                by_member(&backward, &member.member),
                "classification changed under sibling reordering"
            );
        }
        assert_eq!(forward.len(), backward.len());
    }

    #[test]
    fn test_classification_is_idempotent() {
        let b = ObjectId::new();
        let claims = vec![Identifier::User(b)];
        let siblings = vec![sibling(b, "Sound Tech")];

        let first = classify(&claims, &siblings);
        let second = classify(&claims, &siblings);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_claims_collapse() {
        let b = ObjectId::new();
        let claims = vec![
            Identifier::User(b),
            Identifier::User(b),
            Identifier::email("x@example.com"),
            Identifier::email("x@example.com"),
        ];

        let members = classify(&claims, &[]);
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|m| m.classification == Classification::Invited));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(classify(&[], &[]).is_empty());
    }

    #[tokio::test]
    async fn test_event_membership_missing_anchor() {
        use crate::db::memory::MemoryWorkRecords;
        let reconciler = Reconciler::new(Arc::new(MemoryWorkRecords::new()));
        assert!(matches!(
            reconciler.event_membership(ObjectId::new()).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
