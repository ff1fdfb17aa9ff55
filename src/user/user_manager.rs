use super::{
    auth::StatsHasher,
    permissions::{Permission, UserRole},
    AuthToken, AuthTokenValue, UserAuthCredentials, UserStore, UsernamePasswordCredentials,
};
use anyhow::{bail, Context, Result};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

pub struct UserManager {
    user_store: Arc<Mutex<Box<dyn UserStore>>>,
}

impl UserManager {
    pub fn new(user_store: Box<dyn UserStore>) -> Self {
        Self {
            user_store: Arc::new(Mutex::new(user_store)),
        }
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T) -> Result<usize> {
        let locked_store = self.user_store.lock().unwrap();

        if locked_store.get_user_id(user_handle.as_ref())?.is_some() {
            bail!("User handle already exists.");
        }

        if user_handle.as_ref().is_empty() {
            bail!("The user handle cannot be empty.")
        }

        locked_store.create_user(user_handle.as_ref())
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.lock().unwrap().get_user_auth_token(value)
    }

    pub fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .lock()
            .unwrap()
            .update_user_auth_token_last_used_timestamp(value)
    }

    pub fn generate_auth_token(&mut self, credentials: &UserAuthCredentials) -> Result<AuthToken> {
        let token = AuthToken {
            user_id: credentials.user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store
            .lock()
            .unwrap()
            .add_user_auth_token(token.clone())?;
        Ok(token)
    }

    fn create_hashed_password(
        user_id: usize,
        password: String,
    ) -> Result<UsernamePasswordCredentials> {
        let hasher = StatsHasher::default_hasher();
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    pub fn create_password_credentials(
        &mut self,
        user_handle: &str,
        password: String,
    ) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let existing = user_store.get_user_auth_credentials(user_handle)?;
        if let Some(true) = existing.as_ref().map(|c| c.username_password.is_some()) {
            bail!(
                "User with handle {} already has password credentials. Maybe you want to modify it?",
                user_handle
            );
        }

        let mut credentials =
            existing.with_context(|| format!("User with handle {} not found.", user_handle))?;
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);

        user_store.update_user_auth_credentials(credentials)
    }

    pub fn update_password_credentials(
        &mut self,
        user_handle: &str,
        password: String,
    ) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let mut credentials = user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_none() {
            bail!(
                "Cannot update password of user with handle {} since it never had one.",
                user_handle
            );
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        user_store.update_user_auth_credentials(credentials)
    }

    pub fn delete_password_credentials(&mut self, user_handle: &str) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let mut credentials = user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        credentials.username_password = None;
        user_store.update_user_auth_credentials(credentials)
    }

    pub fn get_user_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        self.user_store
            .lock()
            .unwrap()
            .get_user_auth_credentials(user_handle)
    }

    pub fn delete_auth_token(
        &mut self,
        user_id: &usize,
        token_value: &AuthTokenValue,
    ) -> Result<()> {
        let locked_store = self.user_store.lock().unwrap();
        match locked_store.delete_user_auth_token(token_value)? {
            Some(removed) => {
                if &removed.user_id == user_id {
                    Ok(())
                } else {
                    let _ = locked_store.add_user_auth_token(removed.clone());
                    bail!("Tried to delete auth token {}, but the authenticated user {} was not the owner {} of the token.", token_value.0, user_id, &removed.user_id)
                }
            }
            None => bail!("Did not find auth token {}", token_value.0),
        }
    }

    pub fn get_user_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        self.user_store
            .lock()
            .unwrap()
            .get_all_user_auth_tokens(user_handle)
    }

    pub fn prune_unused_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store
            .lock()
            .unwrap()
            .prune_unused_auth_tokens(unused_for_days)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.lock().unwrap().get_all_user_handles()
    }

    pub fn get_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        self.user_store
            .lock()
            .unwrap()
            .resolve_user_permissions(user_id)
    }

    pub fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        self.user_store.lock().unwrap().get_user_roles(user_id)
    }

    pub fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store.lock().unwrap().add_user_role(user_id, role)
    }

    pub fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store
            .lock()
            .unwrap()
            .remove_user_role(user_id, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SqliteUserStore;
    use tempfile::TempDir;

    fn create_manager() -> (UserManager, TempDir) {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = SqliteUserStore::new(tmp_dir.path().join("users.sqlite")).unwrap();
        (UserManager::new(Box::new(store)), tmp_dir)
    }

    #[test]
    fn rejects_empty_and_duplicate_handles() {
        let (manager, _tmp) = create_manager();

        assert!(manager.add_user("").is_err());
        manager.add_user("alice").unwrap();
        let err = manager.add_user("alice").unwrap_err().to_string();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn password_credentials_lifecycle() {
        let (mut manager, _tmp) = create_manager();
        manager.add_user("alice").unwrap();

        assert!(manager
            .update_password_credentials("alice", "pw".to_string())
            .is_err());

        manager
            .create_password_credentials("alice", "pw".to_string())
            .unwrap();
        assert!(manager
            .create_password_credentials("alice", "other".to_string())
            .is_err());

        let credentials = manager.get_user_credentials("alice").unwrap().unwrap();
        let pw = credentials.username_password.unwrap();
        assert!(pw.hasher.verify("pw", &pw.hash, &pw.salt).unwrap());

        manager
            .update_password_credentials("alice", "other".to_string())
            .unwrap();
        let credentials = manager.get_user_credentials("alice").unwrap().unwrap();
        let pw = credentials.username_password.unwrap();
        assert!(pw.hasher.verify("other", &pw.hash, &pw.salt).unwrap());

        manager.delete_password_credentials("alice").unwrap();
        let credentials = manager.get_user_credentials("alice").unwrap().unwrap();
        assert!(credentials.username_password.is_none());
    }

    #[test]
    fn only_the_owner_can_delete_a_token() {
        let (mut manager, _tmp) = create_manager();
        let alice = manager.add_user("alice").unwrap();
        let mallory = manager.add_user("mallory").unwrap();

        let credentials = UserAuthCredentials {
            user_id: alice,
            username_password: None,
        };
        let token = manager.generate_auth_token(&credentials).unwrap();

        assert!(manager.delete_auth_token(&mallory, &token.value).is_err());
        assert!(manager.get_auth_token(&token.value).unwrap().is_some());

        manager.delete_auth_token(&alice, &token.value).unwrap();
        assert!(manager.get_auth_token(&token.value).unwrap().is_none());
    }
}
