//! Operator account management.

use lockwork_common::{AppError, AppResult};
use lockwork_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};
use sea_orm::Set;

/// Business rules for operator accounts.
///
/// Users here are console operators, not keyholders; keys reference them
/// for ownership only.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    /// Takes the repository it reads and writes through.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Create a user.
    pub async fn create(&self, name: &str, role: UserRole) -> AppResult<user::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }

        let model = user::ActiveModel {
            name: Set(name.to_string()),
            role: Set(role),
            ..Default::default()
        };

        let created = self.user_repo.create(model).await?;
        tracing::info!(user_id = created.id, name = %created.name, "User created");
        Ok(created)
    }

    /// List all users.
    pub async fn list(&self) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_all().await
    }

    /// Fetches one user, erroring when the id is unknown.
    pub async fn get(&self, id: i64) -> AppResult<user::Model> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id}")))
    }

    /// Delete a user.
    ///
    /// Owned keys are detached (FK SET NULL), never deleted, and
    /// `granted_by` audit entries survive because they carry no FK.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let deleted = self.user_repo.delete(id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
