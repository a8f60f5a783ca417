//! # Attribution Directory
//!
//! Read-only access to the user and team projections owned by the account
//! subsystem. Verification uses it to hydrate document views.

use std::collections::HashMap;

use async_trait::async_trait;
use docseal_core::{TeamId, TeamSummary, UserId, UserSummary};
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::IndexError;

#[async_trait]
pub trait AttributionDirectory: Send + Sync {
    async fn user(&self, id: &UserId) -> Result<Option<UserSummary>, IndexError>;
    async fn team(&self, id: &TeamId) -> Result<Option<TeamSummary>, IndexError>;
}

/// Directory held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, UserSummary>>,
    teams: RwLock<HashMap<TeamId, TeamSummary>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserSummary) {
        self.users.write().insert(user.id, user);
    }

    pub fn insert_team(&self, team: TeamSummary) {
        self.teams.write().insert(team.id, team);
    }
}

#[async_trait]
impl AttributionDirectory for InMemoryDirectory {
    async fn user(&self, id: &UserId) -> Result<Option<UserSummary>, IndexError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn team(&self, id: &TeamId) -> Result<Option<TeamSummary>, IndexError> {
        Ok(self.teams.read().get(id).cloned())
    }
}

/// Directory reading the mirrored `users` and `teams` tables.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
}

#[async_trait]
impl AttributionDirectory for PgDirectory {
    async fn user(&self, id: &UserId) -> Result<Option<UserSummary>, IndexError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, full_name, email FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserSummary {
            id: UserId(r.id),
            full_name: r.full_name,
            email: r.email,
        }))
    }

    async fn team(&self, id: &TeamId) -> Result<Option<TeamSummary>, IndexError> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT id, name FROM teams WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| TeamSummary {
            id: TeamId(r.id),
            name: r.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_lookup() {
        let dir = InMemoryDirectory::new();
        let user = UserSummary {
            id: UserId(Uuid::new_v4()),
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
        };
        dir.insert_user(user.clone());
        assert_eq!(dir.user(&user.id).await.unwrap(), Some(user));
        assert_eq!(dir.team(&TeamId(Uuid::new_v4())).await.unwrap(), None);
    }
}
