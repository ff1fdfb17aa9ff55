//! Test fixtures for end-to-end tests
//!
//! Helpers that seed the user database and the stats store with known
//! data before a test server starts.

use super::constants::*;
use anyhow::Result;
use std::path::Path;
use stats_server::stats::{AlbumSale, SalesStore};
use stats_server::user::{SqliteUserStore, UserManager, UserRole};

/// Creates a user with the given credentials and role
pub fn create_user_with_password_and_role(
    user_manager: &mut UserManager,
    user_handle: &str,
    password: &str,
    role: UserRole,
) -> Result<usize> {
    let user_id = user_manager.add_user(user_handle)?;
    user_manager.create_password_credentials(user_handle, password.to_owned())?;
    user_manager.add_user_role(user_id, role)?;
    Ok(user_id)
}

/// Creates the users database with the standard test users: testuser
/// (Regular), admin (Admin), labeluser (Label) and norole (no role at all).
pub fn create_test_db_with_users(user_db_path: &Path) -> Result<()> {
    let store = SqliteUserStore::new(user_db_path)?;
    let mut user_manager = UserManager::new(Box::new(store));
    create_user_with_password_and_role(&mut user_manager, TEST_USER, TEST_PASS, UserRole::Regular)?;
    create_user_with_password_and_role(&mut user_manager, ADMIN_USER, ADMIN_PASS, UserRole::Admin)?;
    create_user_with_password_and_role(&mut user_manager, LABEL_USER, LABEL_PASS, UserRole::Label)?;
    user_manager.add_user(NOROLE_USER)?;
    user_manager.create_password_credentials(NOROLE_USER, NOROLE_PASS.to_owned())?;
    Ok(())
}

/// Records one album sale directly against the store, bypassing HTTP.
pub fn seed_album_sale(
    store: &dyn SalesStore,
    album_id: &str,
    units: u32,
    amount_cents: i64,
    purchased_at: i64,
    refunded: bool,
) -> Result<usize> {
    store.record_album_sale(&AlbumSale {
        id: None,
        album_id: album_id.to_owned(),
        purchased_at,
        units,
        amount_cents,
        currency: "EUR".to_owned(),
        refunded,
    })
}
