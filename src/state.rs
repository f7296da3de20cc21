// src/state.rs
use std::sync::Arc;

use sqlx::PgPool;

use crate::dosing::DosingPolicy;
use crate::locks::LockRegistry;
use crate::scale::WeightReader;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub scale: Arc<dyn WeightReader>,
    /// Serializes captures per recipe-material id.
    pub dosing_locks: Arc<LockRegistry>,
    /// Serializes ledger writes per material id.
    pub stock_locks: Arc<LockRegistry>,
    pub policy: DosingPolicy,
}

impl AppState {
    pub fn new(db_pool: PgPool, scale: Arc<dyn WeightReader>, policy: DosingPolicy) -> Self {
        Self {
            db_pool,
            scale,
            dosing_locks: Arc::new(LockRegistry::new()),
            stock_locks: Arc::new(LockRegistry::new()),
            policy,
        }
    }
}
