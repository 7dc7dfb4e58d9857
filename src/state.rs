// src/state.rs

use std::sync::Arc;

use crate::config::Config;
use crate::ranking::RankingService;
use crate::settlement::SettlementEngine;
use crate::store::postgres::PgStore;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub engine: Arc<SettlementEngine>,
    pub ranking: Arc<RankingService>,
}

impl AppState {
    /// Wires the settlement engine and ranking service onto the Postgres store.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));

        Self {
            pool,
            config,
            engine: Arc::new(SettlementEngine::from_store(store.clone())),
            ranking: Arc::new(RankingService::new(store)),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<SettlementEngine> {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Arc<RankingService> {
    fn from_ref(state: &AppState) -> Self {
        state.ranking.clone()
    }
}
