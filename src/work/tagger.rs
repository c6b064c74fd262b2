//! Coworker tagger
//!
//! Orchestrates tagging coworkers on a work record: resolves each tagged
//! identifier to an existing user or a bare email, mints a capability token
//! per tagged coworker, and records the owner's pending claims. Also owns
//! invite acceptance, which materializes the invitee's sibling record and
//! upgrades the original email claim to a resolved user reference.
//!
//! Within one call, writes are issued sequentially (record before claim
//! mutation before role creation) so a partial failure never observes a
//! claim against a record that does not exist. Side effects after the
//! primary write (delivery, role creation, counter recompute) are
//! best-effort: logged, never rolled back into the caller.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::{info, warn};

use crate::collaborators::{
    IdentityProvider, InviteDelivery, InviteMailer, ProfileCounters, RoleRegistry,
};
use crate::db::schemas::{AddMethod, WorkRecordDoc};
use crate::db::store::WorkRecordStore;
use crate::invites::{InviteService, TaggerRef};
use crate::types::{CoreError, Identifier, Result};
use crate::work::WorkFields;

/// Orchestrates work-record creation, coworker tagging, and invite
/// acceptance
#[derive(Clone)]
pub struct CoworkerTagger {
    works: Arc<dyn WorkRecordStore>,
    invites: InviteService,
    identity: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleRegistry>,
    mailer: Arc<dyn InviteMailer>,
    counters: Arc<dyn ProfileCounters>,
}

impl CoworkerTagger {
    pub fn new(
        works: Arc<dyn WorkRecordStore>,
        invites: InviteService,
        identity: Arc<dyn IdentityProvider>,
        roles: Arc<dyn RoleRegistry>,
        mailer: Arc<dyn InviteMailer>,
        counters: Arc<dyn ProfileCounters>,
    ) -> Self {
        Self {
            works,
            invites,
            identity,
            roles,
            mailer,
            counters,
        }
    }

    /// Create a work record for `owner`, tagging `coworkers`.
    ///
    /// Every tagged person lands in the record's claim set (emails that
    /// match an existing account are upgraded to user references first),
    /// and every one of them gets a capability token so they can
    /// materialize their own side of the job.
    pub async fn create_work(
        &self,
        owner: ObjectId,
        fields: WorkFields,
        coworkers: Vec<Identifier>,
    ) -> Result<WorkRecordDoc> {
        let owner_user = self
            .identity
            .resolve_by_id(&owner)
            .await
            .ok_or_else(|| CoreError::NotFound("user".into()))?;

        let slug = fields.slug();
        let claims = self.resolve_claims(coworkers).await;

        let record = self
            .works
            .insert(WorkRecordDoc::new(
                owner,
                &slug,
                &fields,
                claims.clone(),
                AddMethod::Created,
            ))
            .await?;
        let root_id = record
            .id()
            .ok_or_else(|| CoreError::Database("inserted record missing id".into()))?;

        let tagger = TaggerRef {
            user_id: owner,
            name: owner_user.display_name(),
        };

        // Mint a capability token per tagged coworker; the ledger write in
        // issue() is what makes the invite real, delivery is best-effort
        let mut deliveries = Vec::with_capacity(claims.len());
        for claim in &claims {
            let token = self
                .invites
                .issue(claim.clone(), tagger.clone(), root_id, fields.snapshot(&slug))
                .await?;
            deliveries.push(InviteDelivery {
                recipient: claim.clone(),
                token,
                work: serde_json::to_value(fields.snapshot(&slug)).unwrap_or_default(),
            });
        }

        if !deliveries.is_empty() {
            if let Err(e) = self.mailer.send_invites(&deliveries, &tagger).await {
                warn!(work = %root_id, error = %e, "invite delivery failed");
            }
        }

        if let Err(e) = self.roles.ensure_role(&fields.role, &owner).await {
            warn!(role = %fields.role, error = %e, "role creation failed");
        }
        self.counters.recompute(&owner).await;

        info!(
            work = %root_id,
            %slug,
            tagged = claims.len(),
            "work record created"
        );

        Ok(record)
    }

    /// Accept an invite token on behalf of `accepting_user`.
    ///
    /// Redeems the token (consuming it), materializes the sibling record,
    /// and upgrades the tagger's email claim to the accepting user's
    /// resolved reference. A failure after redemption leaves the token
    /// consumed: the capability is spent and the tagger must re-invite.
    pub async fn accept_invite(
        &self,
        token: &str,
        accepting_user: ObjectId,
    ) -> Result<WorkRecordDoc> {
        let claims = self.invites.redeem(token).await?;

        let user = self
            .identity
            .resolve_by_id(&accepting_user)
            .await
            .ok_or_else(|| CoreError::NotFound("user".into()))?;

        let slug = claims.work.slug.clone();
        let fields = WorkFields::from(claims.work.clone());
        let record = self
            .works
            .insert(WorkRecordDoc::new(
                accepting_user,
                &slug,
                &fields,
                Vec::new(),
                claims.add_method,
            ))
            .await?;

        // The email claim on the tagger's record is now fulfilled; swap it
        // for the resolved user. Failure here is smoothed over by
        // reconciliation (the new record classifies as verifiable).
        if let Err(e) = self
            .works
            .upgrade_claim(claims.root_work_id, &user.email, accepting_user)
            .await
        {
            warn!(
                root_work = %claims.root_work_id,
                error = %e,
                "claim upgrade failed; record will surface as verifiable"
            );
        }

        if let Err(e) = self.roles.ensure_role(&fields.role, &accepting_user).await {
            warn!(role = %fields.role, error = %e, "role creation failed");
        }
        self.counters.recompute(&accepting_user).await;
        self.counters.recompute(&claims.tagger.user_id).await;

        info!(
            work = ?record.id(),
            %slug,
            tagger = %claims.tagger.user_id,
            "invite accepted"
        );

        Ok(record)
    }

    /// Upgrade email identifiers that match an existing account to user
    /// references and drop duplicates, preserving claim order
    async fn resolve_claims(&self, coworkers: Vec<Identifier>) -> Vec<Identifier> {
        let mut claims: Vec<Identifier> = Vec::with_capacity(coworkers.len());
        for ident in coworkers {
            let resolved = match &ident {
                Identifier::Email(addr) => match self.identity.resolve_by_email(addr).await {
                    Some(user) => Identifier::User(user.id),
                    None => Identifier::email(addr),
                },
                Identifier::User(_) => ident,
            };
            if !claims.contains(&resolved) {
                claims.push(resolved);
            }
        }
        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{MemoryRoles, StaticDirectory};
    use crate::db::memory::{MemoryInviteLedger, MemoryWorkRecords};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Mailer that records deliveries so tests can pull out the tokens
    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<InviteDelivery>>,
    }

    impl CapturingMailer {
        fn tokens(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|d| d.token.clone()).collect()
        }
    }

    #[async_trait]
    impl InviteMailer for CapturingMailer {
        async fn send_invites(&self, invites: &[InviteDelivery], _sender: &TaggerRef) -> Result<()> {
            self.sent.lock().unwrap().extend_from_slice(invites);
            Ok(())
        }
    }

    struct Fixture {
        tagger: CoworkerTagger,
        works: Arc<MemoryWorkRecords>,
        directory: Arc<StaticDirectory>,
        mailer: Arc<CapturingMailer>,
        roles: Arc<MemoryRoles>,
    }

    fn fixture() -> Fixture {
        let works = Arc::new(MemoryWorkRecords::new());
        let ledger = Arc::new(MemoryInviteLedger::new());
        let directory = Arc::new(StaticDirectory::new());
        let mailer = Arc::new(CapturingMailer::default());
        let roles = Arc::new(MemoryRoles::new());

        let tagger = CoworkerTagger::new(
            works.clone(),
            InviteService::new(ledger, "test-secret", 3600),
            directory.clone(),
            roles.clone(),
            mailer.clone(),
            Arc::new(crate::collaborators::NoopCounters),
        );

        Fixture {
            tagger,
            works,
            directory,
            mailer,
            roles,
        }
    }

    fn fields() -> WorkFields {
        WorkFields {
            title: "Trade Show Build".to_string(),
            role: "Carpenter".to_string(),
            from: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 2, 7).unwrap(),
            caption: None,
            photos: vec!["photos/booth.jpg".to_string()],
            pin_to_profile: true,
        }
    }

    #[tokio::test]
    async fn test_create_work_partitions_coworkers() {
        let fx = fixture();
        let owner = fx.directory.add_user("owner@example.com", "Olive", "Owner");
        let registered = fx.directory.add_user("reg@example.com", "Reg", "Istered");

        let record = fx
            .tagger
            .create_work(
                owner.id,
                fields(),
                vec![
                    Identifier::email("reg@example.com"),
                    Identifier::email("stranger@example.com"),
                ],
            )
            .await
            .unwrap();

        // The registered email was upgraded to a user reference; the
        // unknown one stays a raw email claim
        assert_eq!(
            record.coworkers,
            vec![
                Identifier::User(registered.id),
                Identifier::email("stranger@example.com"),
            ]
        );
        assert_eq!(record.slug, "trade-show-build-20250203-20250207");
        assert_eq!(record.add_method, AddMethod::Created);

        // Both tagged people got an invite token
        assert_eq!(fx.mailer.tokens().len(), 2);

        // Role side effect
        assert!(fx.roles.has_role("Carpenter", &owner.id));
    }

    #[tokio::test]
    async fn test_create_work_unknown_owner() {
        let fx = fixture();
        assert!(matches!(
            fx.tagger.create_work(ObjectId::new(), fields(), Vec::new()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_invite_materializes_sibling_and_upgrades_claim() {
        let fx = fixture();
        let owner = fx.directory.add_user("owner@example.com", "Olive", "Owner");

        let root = fx
            .tagger
            .create_work(
                owner.id,
                fields(),
                vec![Identifier::email("newcomer@example.com")],
            )
            .await
            .unwrap();

        // The invitee registers with the tagged email, then accepts
        let invitee = fx.directory.add_user("newcomer@example.com", "Nina", "Comer");
        let token = fx.mailer.tokens().pop().unwrap();

        let sibling = fx.tagger.accept_invite(&token, invitee.id).await.unwrap();
        assert_eq!(sibling.user, invitee.id);
        assert_eq!(sibling.slug, root.slug);
        assert_eq!(sibling.add_method, AddMethod::Tagged);
        assert_eq!(sibling.role, "Carpenter");
        assert_eq!(sibling.title, "Trade Show Build");

        // Claim upgrade: the email is gone, the resolved id is present
        let root = fx.works.find_by_id(root.id().unwrap()).await.unwrap().unwrap();
        assert!(!root
            .coworkers
            .contains(&Identifier::email("newcomer@example.com")));
        assert!(root.coworkers.contains(&Identifier::User(invitee.id)));

        // Role created for the accepted role name under the new user
        assert!(fx.roles.has_role("Carpenter", &invitee.id));
    }

    #[tokio::test]
    async fn test_accept_invite_is_single_use() {
        let fx = fixture();
        let owner = fx.directory.add_user("owner@example.com", "Olive", "Owner");
        fx.tagger
            .create_work(owner.id, fields(), vec![Identifier::email("n@example.com")])
            .await
            .unwrap();

        let invitee = fx.directory.add_user("n@example.com", "Nina", "Comer");
        let token = fx.mailer.tokens().pop().unwrap();

        fx.tagger.accept_invite(&token, invitee.id).await.unwrap();
        assert!(matches!(
            fx.tagger.accept_invite(&token, invitee.id).await,
            Err(CoreError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_accept_invite_unknown_user_consumes_token() {
        // The one-shot trade-off: redemption happens before user
        // resolution, so a failed accept still spends the capability
        let fx = fixture();
        let owner = fx.directory.add_user("owner@example.com", "Olive", "Owner");
        fx.tagger
            .create_work(owner.id, fields(), vec![Identifier::email("n@example.com")])
            .await
            .unwrap();

        let token = fx.mailer.tokens().pop().unwrap();
        assert!(matches!(
            fx.tagger.accept_invite(&token, ObjectId::new()).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            fx.tagger.accept_invite(&token, ObjectId::new()).await,
            Err(CoreError::AlreadyConsumed)
        ));
    }
}
