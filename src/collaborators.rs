//! External collaborator contracts
//!
//! The subsystems this core consumes but does not own: identity resolution,
//! invite delivery, the role registry, and the profile-counter recompute
//! hook. Each is a trait so the embedding service wires its real
//! implementation; simple in-memory implementations are provided for dev
//! mode and tests.

use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invites::TaggerRef;
use crate::types::{Identifier, Result, UserSummary};

/// Identity resolution: user reference or email to account summary
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_by_id(&self, id: &ObjectId) -> Option<UserSummary>;
    async fn resolve_by_email(&self, email: &str) -> Option<UserSummary>;
}

/// One invite ready for delivery: who it is addressed to, the signed token,
/// and the job payload the mail template renders
#[derive(Debug, Clone, Serialize)]
pub struct InviteDelivery {
    pub recipient: Identifier,
    pub token: String,
    pub work: serde_json::Value,
}

/// Invite delivery. Fire-and-forget: the token strings are already
/// persisted to the consumption ledger before delivery is attempted, so a
/// delivery failure never invalidates the invite.
#[async_trait]
pub trait InviteMailer: Send + Sync {
    async fn send_invites(&self, invites: &[InviteDelivery], sender: &TaggerRef) -> Result<()>;
}

/// Role summary from the role registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: ObjectId,
    pub name: String,
}

/// Role registry: create-if-absent keyed by (name, user)
#[async_trait]
pub trait RoleRegistry: Send + Sync {
    async fn ensure_role(&self, name: &str, user: &ObjectId) -> Result<Option<RoleSummary>>;
}

/// Gamification recompute hook. The badge layer only reads counts produced
/// here; the recompute itself is external and infallible from this side.
#[async_trait]
pub trait ProfileCounters: Send + Sync {
    async fn recompute(&self, user: &ObjectId);
}

// ============================================================================
// Dev-mode implementations
// ============================================================================

/// In-memory identity directory for dev mode and tests
#[derive(Default)]
pub struct StaticDirectory {
    by_id: DashMap<ObjectId, UserSummary>,
    by_email: DashMap<String, ObjectId>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return their summary
    pub fn add_user(&self, email: &str, first_name: &str, last_name: &str) -> UserSummary {
        let user = UserSummary {
            id: ObjectId::new(),
            email: email.trim().to_lowercase(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        self.by_email.insert(user.email.clone(), user.id);
        self.by_id.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl IdentityProvider for StaticDirectory {
    async fn resolve_by_id(&self, id: &ObjectId) -> Option<UserSummary> {
        self.by_id.get(id).map(|u| u.clone())
    }

    async fn resolve_by_email(&self, email: &str) -> Option<UserSummary> {
        let normalized = email.trim().to_lowercase();
        let id = *self.by_email.get(&normalized)?;
        self.by_id.get(&id).map(|u| u.clone())
    }
}

/// Mailer that logs deliveries and drops them
pub struct NullMailer;

#[async_trait]
impl InviteMailer for NullMailer {
    async fn send_invites(&self, invites: &[InviteDelivery], sender: &TaggerRef) -> Result<()> {
        for invite in invites {
            debug!(
                recipient = %invite.recipient,
                sender = %sender.name,
                "dropping invite delivery (null mailer)"
            );
        }
        Ok(())
    }
}

/// In-memory role registry for dev mode and tests
#[derive(Default)]
pub struct MemoryRoles {
    roles: DashMap<(String, ObjectId), RoleSummary>,
}

impl MemoryRoles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a role exists for (name, user)
    pub fn has_role(&self, name: &str, user: &ObjectId) -> bool {
        self.roles.contains_key(&(name.to_string(), *user))
    }
}

#[async_trait]
impl RoleRegistry for MemoryRoles {
    async fn ensure_role(&self, name: &str, user: &ObjectId) -> Result<Option<RoleSummary>> {
        let key = (name.to_string(), *user);
        let role = self
            .roles
            .entry(key)
            .or_insert_with(|| RoleSummary {
                id: ObjectId::new(),
                name: name.to_string(),
            })
            .clone();
        Ok(Some(role))
    }
}

/// Counter hook that does nothing
pub struct NoopCounters;

#[async_trait]
impl ProfileCounters for NoopCounters {
    async fn recompute(&self, _user: &ObjectId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_resolves_both_ways() {
        let directory = StaticDirectory::new();
        let user = directory.add_user("Key.Grip@Example.com", "Kay", "Grip");

        let by_email = directory.resolve_by_email("key.grip@example.com").await;
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        let by_id = directory.resolve_by_id(&user.id).await.unwrap();
        assert_eq!(by_id.email, "key.grip@example.com");
        assert_eq!(by_id.display_name(), "Kay Grip");

        assert!(directory.resolve_by_email("nobody@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_role_is_idempotent() {
        let roles = MemoryRoles::new();
        let user = ObjectId::new();

        let first = roles.ensure_role("Rigger", &user).await.unwrap().unwrap();
        let second = roles.ensure_role("Rigger", &user).await.unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert!(roles.has_role("Rigger", &user));
    }
}
