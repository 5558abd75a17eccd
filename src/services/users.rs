//! User directory service

use crate::{
    error::AppResult,
    models::user::{CreateUser, UpdateUser, User, UserQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(query).await
    }

    pub async fn create_user(&self, user: &CreateUser) -> AppResult<User> {
        let created = self.repository.users.create(user).await?;
        tracing::info!(user_id = created.id, "user created");
        Ok(created)
    }

    pub async fn update_user(&self, id: i32, update: &UpdateUser) -> AppResult<User> {
        self.repository.users.update(id, update).await
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.soft_delete(id).await?;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}
