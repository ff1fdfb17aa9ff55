use super::auth::{AuthToken, AuthTokenValue, UserAuthCredentials};
use super::permissions::{Permission, UserRole};
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the user's authentication credentials given the user handle.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>>;

    /// Updates the user's authentication credentials.
    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns a user's authentication token given an AuthTokenValue.
    /// Returns Ok(None) if the token does not exist.
    /// Returns Err if there is a database error.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token given the token value.
    /// Returns Ok(None) if the token does not exist.
    /// Returns Err if there is a database error.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates an auth token with the latest timestamp.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    /// Adds a new auth token.
    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Returns all of a user's authentication tokens.
    /// Returns Err if there is a database error.
    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>>;

    /// Prunes auth tokens that haven't been used for the specified duration.
    /// Returns the number of tokens that were deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<usize>;

    /// Returns a user's handle given the user id.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    /// Returns all users' handles.
    /// Returns Err if there is a database error.
    fn get_all_user_handles(&self) -> Result<Vec<String>>;

    /// Returns a user's id given the user handle.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    /// Returns all roles assigned to a user.
    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>>;

    /// Assigns a role to a user.
    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    /// Removes a role from a user.
    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    /// Resolves all permissions for a user from the assigned roles.
    fn resolve_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>>;
}
