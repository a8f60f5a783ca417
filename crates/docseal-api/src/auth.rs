//! # Caller Identity
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! caller as three headers:
//!
//! | Header | Value |
//! |---|---|
//! | `x-user-id` | user UUID |
//! | `x-team-id` | team UUID, optional |
//! | `x-user-role` | `team_member`, `team_leader` or `super_admin` |
//!
//! Handlers take a [`CallerIdentity`] argument; a missing or malformed
//! identity rejects the request with 401.

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use docseal_core::{Document, TeamId, UserId};
use docseal_index::OwnerScope;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const TEAM_ID_HEADER: &str = "x-team-id";
pub const ROLE_HEADER: &str = "x-user-role";

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles, ordered by privilege: `TeamMember < TeamLeader < SuperAdmin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    TeamMember,
    TeamLeader,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamMember => "team_member",
            Self::TeamLeader => "team_leader",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "team_member" => Ok(Self::TeamMember),
            "team_leader" => Ok(Self::TeamLeader),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user: UserId,
    pub team: Option<TeamId>,
    pub role: Role,
}

impl CallerIdentity {
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// The caller's team, required for team-scoped routes.
    pub fn require_team(&self) -> Result<TeamId, AppError> {
        self.team
            .ok_or_else(|| AppError::Forbidden("caller is not a member of a team".into()))
    }

    /// Whether the caller may see a document that is not public:
    /// administrators see everything, users their own documents and team
    /// leaders their team's.
    pub fn can_view(&self, doc: &Document) -> bool {
        if self.role == Role::SuperAdmin || doc.signed_by_user == self.user {
            return true;
        }
        self.role >= Role::TeamLeader && self.team.is_some() && doc.signed_by_team == self.team
    }

    pub fn own_scope(&self) -> OwnerScope {
        OwnerScope::User(self.user)
    }

    fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let header = |name: &str| -> Result<Option<&str>, AppError> {
            match headers.get(name) {
                None => Ok(None),
                Some(v) => v
                    .to_str()
                    .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
                    .map_err(|_| AppError::Unauthorized(format!("{name} is not valid text"))),
            }
        };
        let uuid = |name: &str, value: &str| {
            Uuid::parse_str(value)
                .map_err(|_| AppError::Unauthorized(format!("{name} is not a valid UUID")))
        };

        let user = header(USER_ID_HEADER)?
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER}")))?;
        let user = UserId(uuid(USER_ID_HEADER, user)?);
        let team = header(TEAM_ID_HEADER)?
            .map(|t| uuid(TEAM_ID_HEADER, t).map(TeamId))
            .transpose()?;
        let role = match header(ROLE_HEADER)? {
            Some(r) => r.parse().map_err(AppError::Unauthorized)?,
            None => Role::TeamMember,
        };
        Ok(Self { user, team, role })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// Returns 403 if the caller's role is below `minimum`.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use docseal_core::{sha256_digest, DocumentId, FileKind, StorageKey};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    fn doc(user: UserId, team: Option<TeamId>) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId::new(),
            original_name: "a.pdf".into(),
            file_format: FileKind::Pdf,
            extension: ".pdf".into(),
            content_hash: sha256_digest(b"a"),
            storage_key: StorageKey::new(&sha256_digest(b"b"), ".pdf"),
            signature: "c2ln".into(),
            verification_count: 0,
            is_hidden: false,
            signed_by_user: user,
            signed_by_team: team,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_ordering() {
        assert!(Role::SuperAdmin > Role::TeamLeader);
        assert!(Role::TeamLeader > Role::TeamMember);
        assert_eq!("Super_Admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn identity_from_headers() {
        let user = Uuid::new_v4();
        let team = Uuid::new_v4();
        let caller = CallerIdentity::from_headers(&headers(&[
            (USER_ID_HEADER, &user.to_string()),
            (TEAM_ID_HEADER, &team.to_string()),
            (ROLE_HEADER, "team_leader"),
        ]))
        .unwrap();
        assert_eq!(caller.user, UserId(user));
        assert_eq!(caller.team, Some(TeamId(team)));
        assert_eq!(caller.role, Role::TeamLeader);

        let member =
            CallerIdentity::from_headers(&headers(&[(USER_ID_HEADER, &user.to_string())])).unwrap();
        assert_eq!(member.role, Role::TeamMember);
        assert_eq!(member.team, None);
    }

    #[test]
    fn malformed_identity_is_unauthorized() {
        for h in [
            headers(&[]),
            headers(&[(USER_ID_HEADER, "not-a-uuid")]),
            headers(&[
                (USER_ID_HEADER, &Uuid::new_v4().to_string()),
                (ROLE_HEADER, "owner"),
            ]),
            headers(&[
                (USER_ID_HEADER, &Uuid::new_v4().to_string()),
                (TEAM_ID_HEADER, "7"),
            ]),
        ] {
            assert!(matches!(
                CallerIdentity::from_headers(&h),
                Err(AppError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn visibility_rules() {
        let team = TeamId(Uuid::new_v4());
        let author = UserId(Uuid::new_v4());
        let d = doc(author, Some(team));

        let owner = CallerIdentity { user: author, team: Some(team), role: Role::TeamMember };
        let teammate = CallerIdentity { user: UserId(Uuid::new_v4()), team: Some(team), role: Role::TeamMember };
        let leader = CallerIdentity { role: Role::TeamLeader, ..teammate.clone() };
        let other_leader = CallerIdentity { user: UserId(Uuid::new_v4()), team: Some(TeamId(Uuid::new_v4())), role: Role::TeamLeader };
        let admin = CallerIdentity { user: UserId(Uuid::new_v4()), team: None, role: Role::SuperAdmin };

        assert!(owner.can_view(&d));
        assert!(!teammate.can_view(&d));
        assert!(leader.can_view(&d));
        assert!(!other_leader.can_view(&d));
        assert!(admin.can_view(&d));

        let solo = doc(author, None);
        let teamless_leader = CallerIdentity { team: None, ..leader };
        assert!(!teamless_leader.can_view(&solo));
    }

    #[test]
    fn require_role_message() {
        let caller = CallerIdentity { user: UserId(Uuid::new_v4()), team: None, role: Role::TeamMember };
        assert!(require_role(&caller, Role::TeamMember).is_ok());
        let err = require_role(&caller, Role::SuperAdmin).unwrap_err();
        assert!(err.to_string().contains("super_admin"));
    }
}
