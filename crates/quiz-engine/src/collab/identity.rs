use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::CollabError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
}

/// Account management. User ids are opaque strings.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str)
    -> Result<UserIdentity, CollabError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, CollabError>;

    async fn current_user(&self) -> Option<UserIdentity>;

    async fn sign_out(&self) -> Result<(), CollabError>;
}

struct Account {
    identity: UserIdentity,
    salt: String,
    digest: String,
}

/// Single-process accounts with salted SHA-256 password digests.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<UserIdentity>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, CollabError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CollabError::Invalid(format!(
                "password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&email) {
            return Err(CollabError::Conflict(email));
        }
        let salt = Uuid::new_v4().simple().to_string();
        let identity = UserIdentity {
            user_id: Uuid::new_v4().to_string(),
            email: email.clone(),
        };
        accounts.insert(
            email,
            Account {
                identity: identity.clone(),
                digest: digest(&salt, password),
                salt,
            },
        );
        drop(accounts);

        info!(user_id = %identity.user_id, "account created");
        *self.current.lock().await = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, CollabError> {
        let email = normalize_email(email)?;
        let identity = {
            let accounts = self.accounts.lock().await;
            accounts
                .get(&email)
                .filter(|account| account.digest == digest(&account.salt, password))
                .map(|account| account.identity.clone())
                .ok_or_else(|| CollabError::Unauthorized("wrong email or password".into()))?
        };
        *self.current.lock().await = Some(identity.clone());
        Ok(identity)
    }

    async fn current_user(&self) -> Option<UserIdentity> {
        self.current.lock().await.clone()
    }

    async fn sign_out(&self) -> Result<(), CollabError> {
        self.current.lock().await.take();
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String, CollabError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(CollabError::Invalid(format!("'{email}' is not an email address"))),
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
