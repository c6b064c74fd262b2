//! Capability token service
//!
//! Issues signed invite tokens and validates them single-use. Redemption
//! must satisfy two independent failure domains: the cryptographic one
//! (signature, expiry) and the ledger one (the literal token string is still
//! present in the consumption ledger). Consuming the ledger entry is a
//! single atomic find-and-remove, which is what makes a token single-use
//! under concurrent redemption.

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Utc;
use tracing::debug;

use crate::db::schemas::AddMethod;
use crate::db::store::InviteLedger;
use crate::invites::token::{self, InviteClaims, TaggerRef, WorkSnapshot};
use crate::types::{CoreError, Identifier, Result};

/// Issues and single-use-validates signed invite tokens
#[derive(Clone)]
pub struct InviteService {
    ledger: Arc<dyn InviteLedger>,
    secret: String,
    ttl_seconds: i64,
}

impl InviteService {
    pub fn new(ledger: Arc<dyn InviteLedger>, secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            ledger,
            secret: secret.into(),
            ttl_seconds,
        }
    }

    /// Sign a token for one tagged coworker and persist it into the
    /// consumption ledger. The ledger write happens regardless of whether
    /// delivery later succeeds.
    pub async fn issue(
        &self,
        invited: Identifier,
        tagger: TaggerRef,
        root_work_id: ObjectId,
        work: WorkSnapshot,
    ) -> Result<String> {
        let claims = InviteClaims {
            invited,
            tagger,
            root_work_id,
            work,
            add_method: AddMethod::Tagged,
            exp: Utc::now().timestamp() + self.ttl_seconds,
        };

        let token = token::sign(&claims, &self.secret)?;
        self.ledger.persist(&token).await?;

        debug!(
            invited = %claims.invited,
            root_work = %claims.root_work_id,
            "issued invite token"
        );

        Ok(token)
    }

    /// Redeem a token: verify signature and expiry, then atomically consume
    /// the ledger entry. A second redemption of the same token always fails
    /// with `AlreadyConsumed` after the first success; the operation is
    /// idempotent-by-rejection, with no retry path.
    pub async fn redeem(&self, token: &str) -> Result<InviteClaims> {
        let claims = token::verify(token, &self.secret)?;

        if !self.ledger.consume(token).await? {
            return Err(CoreError::AlreadyConsumed);
        }

        debug!(
            invited = %claims.invited,
            root_work = %claims.root_work_id,
            "redeemed invite token"
        );

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryInviteLedger;
    use chrono::NaiveDate;

    fn service(ttl_seconds: i64) -> (InviteService, Arc<MemoryInviteLedger>) {
        let ledger = Arc::new(MemoryInviteLedger::new());
        (
            InviteService::new(ledger.clone(), "test-secret", ttl_seconds),
            ledger,
        )
    }

    fn snapshot() -> WorkSnapshot {
        WorkSnapshot {
            title: "Night Shoot".to_string(),
            role: "Gaffer".to_string(),
            from: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            caption: Some("downtown location".to_string()),
            photos: Vec::new(),
            pin_to_profile: true,
            slug: "night-shoot-20250310-20250312".to_string(),
        }
    }

    fn tagger() -> TaggerRef {
        TaggerRef {
            user_id: ObjectId::new(),
            name: "Alex Keys".to_string(),
        }
    }

    #[tokio::test]
    async fn test_issue_then_redeem() {
        let (service, ledger) = service(3600);
        let root = ObjectId::new();

        let token = service
            .issue(Identifier::email("grip@example.com"), tagger(), root, snapshot())
            .await
            .unwrap();
        assert_eq!(ledger.outstanding(), 1);

        let claims = service.redeem(&token).await.unwrap();
        assert_eq!(claims.root_work_id, root);
        assert_eq!(claims.work.role, "Gaffer");
        assert_eq!(ledger.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_second_redeem_fails_consumed() {
        let (service, _ledger) = service(3600);
        let token = service
            .issue(Identifier::email("grip@example.com"), tagger(), ObjectId::new(), snapshot())
            .await
            .unwrap();

        service.redeem(&token).await.unwrap();
        assert!(matches!(
            service.redeem(&token).await,
            Err(CoreError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_never_issued_fails_consumed() {
        let (service, _) = service(3600);
        // Signed with the right secret but never persisted to the ledger
        let foreign = InviteService::new(
            Arc::new(MemoryInviteLedger::new()),
            "test-secret",
            3600,
        );
        let token = foreign
            .issue(Identifier::email("grip@example.com"), tagger(), ObjectId::new(), snapshot())
            .await
            .unwrap();

        assert!(matches!(
            service.redeem(&token).await,
            Err(CoreError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_expired_precedes_ledger_check() {
        // Negative TTL produces an already-expired token whose ledger entry
        // is still present; the signature domain must reject it first
        let (service, ledger) = service(-300);
        let token = service
            .issue(Identifier::email("grip@example.com"), tagger(), ObjectId::new(), snapshot())
            .await
            .unwrap();
        assert_eq!(ledger.outstanding(), 1);

        assert!(matches!(
            service.redeem(&token).await,
            Err(CoreError::InvalidToken(_))
        ));
        // The failed redemption must not have consumed the ledger entry
        assert_eq!(ledger.outstanding(), 1);
    }
}
