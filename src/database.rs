use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::OnceCell;

use crate::{
    buffer_pool::BufferPool,
    catalog::Catalog,
    transaction::ConcurrentStatus,
    types::Pod,
    utils::HandyRwLock,
};

static DB: OnceCell<Database> = OnceCell::new();

/// We collect all global variables here.
///
/// The buffer pool and the lock table are internally concurrent and are
/// handed out as plain references; wrapping them in an outer lock would
/// serialize every page access of the engine.
pub struct Database {
    catalog: Pod<Catalog>,
    buffer_pool: BufferPool,
    concurrent_status: ConcurrentStatus,
}

impl Database {
    fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog::new())),
            buffer_pool: BufferPool::new(),
            concurrent_status: ConcurrentStatus::new(),
        }
    }

    pub fn global() -> &'static Database {
        DB.get_or_init(Database::new)
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn mut_catalog() -> RwLockWriteGuard<'static, Catalog> {
        Self::global().catalog.wl()
    }

    pub fn buffer_pool() -> &'static BufferPool {
        &Self::global().buffer_pool
    }

    pub fn concurrent_status() -> &'static ConcurrentStatus {
        &Self::global().concurrent_status
    }

    /// Drop every table, cached page and lock. Tests call this to start
    /// from a blank process state.
    pub fn reset() {
        Self::mut_catalog().clear();
        Self::buffer_pool().clear();
        Self::concurrent_status().clear();
    }
}
