use super::{MemoryDatabase, State};
use crate::error::{ErrorKind, Result};
use crate::models::{User, whole_seconds};
use crate::repo::UserRepository;
use crate::validator::ensure_valid;
use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

pub struct MemoryUserRepository {
    state: Arc<RwLock<State>>,
}

impl From<&MemoryDatabase> for MemoryUserRepository {
    fn from(db: &MemoryDatabase) -> Self {
        Self { state: db.state() }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &mut User) -> Result<()> {
        ensure_valid(&*user)?;
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) || state.users.values().any(|other| other.email == user.email) {
            exn::bail!(ErrorKind::DuplicateConstraint);
        }
        user.created_at = whole_seconds(OffsetDateTime::now_utc());
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.state.read().await.users.contains_key(&id))
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        match self.state.read().await.users.values().find(|user| user.email == email) {
            Some(user) => Ok(user.clone()),
            None => exn::bail!(ErrorKind::NotFound),
        }
    }
}
