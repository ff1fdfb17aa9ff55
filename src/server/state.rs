use axum::extract::FromRef;

use crate::catalog::CatalogClient;
use crate::stats::{FieldCapabilities, StatsStore};
use crate::user::UserManager;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::ServerConfig;

pub type GuardedStatsStore = Arc<dyn StatsStore>;
pub type GuardedCatalogClient = Arc<dyn CatalogClient>;
pub type GuardedUserManager = Arc<Mutex<UserManager>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub stats_store: GuardedStatsStore,
    pub catalog: GuardedCatalogClient,
    pub user_manager: GuardedUserManager,
    pub capabilities: FieldCapabilities,
    pub hash: String,
}

unsafe impl Send for ServerState {}
unsafe impl Sync for ServerState {}

impl FromRef<ServerState> for GuardedStatsStore {
    fn from_ref(input: &ServerState) -> Self {
        input.stats_store.clone()
    }
}

impl FromRef<ServerState> for GuardedCatalogClient {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for FieldCapabilities {
    fn from_ref(input: &ServerState) -> Self {
        input.capabilities
    }
}
