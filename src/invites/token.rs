//! Capability token encoding
//!
//! HS256-signed claims carrying everything needed to materialize a sibling
//! work record for an invitee who does not yet hold an account. Signature
//! and expiry are one of the two failure domains of redemption; the
//! consumption ledger is the other. Expiry is validated with zero leeway so
//! an expired-but-still-ledgered token fails deterministically.

use bson::oid::ObjectId;
use chrono::NaiveDate;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::schemas::AddMethod;
use crate::types::{CoreError, Identifier, Result};

/// The user who tagged the invitee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerRef {
    pub user_id: ObjectId,
    pub name: String,
}

/// Work fields cloned into the token so the invitee's sibling record can be
/// created without re-entering the job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSnapshot {
    pub title: String,
    pub role: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub pin_to_profile: bool,
    pub slug: String,
}

/// Signed capability-token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteClaims {
    /// Who the invite was addressed to
    pub invited: Identifier,

    /// Who issued the tag
    pub tagger: TaggerRef,

    /// The tagger's own work record; the claim-upgrade target on acceptance
    pub root_work_id: ObjectId,

    /// Cloned job fields for the invitee's sibling record
    pub work: WorkSnapshot,

    /// How the materialized record is marked; always `tagged` for invites
    pub add_method: AddMethod,

    /// Expiry, seconds since epoch (standard JWT `exp`)
    pub exp: i64,
}

/// Sign claims with the invite secret
pub fn sign(claims: &InviteClaims, secret: &str) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| CoreError::InvalidToken(format!("failed to encode token: {}", e)))
}

/// Verify signature and expiry, returning the decoded claims
pub fn verify(token: &str, secret: &str) -> Result<InviteClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;

    decode::<InviteClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| CoreError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_claims(exp: i64) -> InviteClaims {
        InviteClaims {
            invited: Identifier::email("loader@example.com"),
            tagger: TaggerRef {
                user_id: ObjectId::new(),
                name: "Sam Foreman".to_string(),
            },
            root_work_id: ObjectId::new(),
            work: WorkSnapshot {
                title: "Harbor Regatta".to_string(),
                role: "Rigger".to_string(),
                from: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(),
                to: NaiveDate::from_ymd_opt(2025, 7, 6).unwrap(),
                caption: None,
                photos: Vec::new(),
                pin_to_profile: false,
                slug: "harbor-regatta-20250704-20250706".to_string(),
            },
            add_method: AddMethod::Tagged,
            exp,
        }
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let claims = sample_claims(Utc::now().timestamp() + 3600);
        let token = sign(&claims, "secret").unwrap();
        let decoded = verify(&token, "secret").unwrap();

        assert_eq!(decoded.invited, claims.invited);
        assert_eq!(decoded.root_work_id, claims.root_work_id);
        assert_eq!(decoded.work.slug, claims.work.slug);
        assert_eq!(decoded.tagger.user_id, claims.tagger.user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = sample_claims(Utc::now().timestamp() + 3600);
        let token = sign(&claims, "secret").unwrap();
        assert!(matches!(
            verify(&token, "other-secret"),
            Err(CoreError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_rejected() {
        let claims = sample_claims(Utc::now().timestamp() - 300);
        let token = sign(&claims, "secret").unwrap();
        assert!(matches!(
            verify(&token, "secret"),
            Err(CoreError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            verify("not-a-token", "secret"),
            Err(CoreError::InvalidToken(_))
        ));
    }
}
