use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, RwLock,
};

use log::debug;

use crate::{
    database::Database,
    error::TinyError,
    storage::{
        heap::{HeapPage, HeapPageID},
        tuple::Tuple,
    },
    transaction::{Permission, Transaction, TransactionStatus},
    types::{ConcurrentHashMap, Pod, ResultPod, TinyResult},
    utils::{lock_state, HandyRwLock},
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_PAGES: usize = 50;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// The page cache. Every page access of every transaction funnels through
/// `get_page`, which acquires the page lock for the calling transaction
/// before touching the cache, so the cache itself only needs short
/// critical sections.
///
/// Write policy is FORCE + NO-STEAL: committed work is flushed eagerly,
/// uncommitted work never reaches disk.
pub struct BufferPool {
    buffer: ConcurrentHashMap<HeapPageID, Pod<HeapPage>>,

    capacity: AtomicUsize,

    // serializes miss handling (evict + read + insert) to keep
    // buffer.size() <= capacity
    load_latch: Mutex<()>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            buffer: ConcurrentHashMap::new(),
            capacity: AtomicUsize::new(DEFAULT_PAGES),
            load_latch: Mutex::new(()),
        }
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    /// Change the process-wide page size. Tests use small pages to force
    /// page boundaries early; changing it with live tables is undefined.
    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    pub fn clear(&self) {
        self.buffer.clear();
    }

    /// Retrieve the page under the requested permission on behalf of the
    /// transaction. Blocks while the page lock is contended; a transaction
    /// chosen as deadlock victim gets `TransactionAborted` instead.
    pub fn get_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        // stage 1: lock, with deadlock arbitration
        Database::concurrent_status().request_lock(tx, &perm.to_lock(), pid)?;

        // stage 2: cache hit
        if let Some(page_rc) = self.buffer.get(pid) {
            return Ok(page_rc);
        }

        // stage 3: miss, load from disk
        self.load_page(pid)
    }

    fn load_page(&self, pid: &HeapPageID) -> ResultPod<HeapPage> {
        let _guard = self.load_latch.lock().unwrap();

        // the race loser takes the winner's copy
        if let Some(page_rc) = self.buffer.get(pid) {
            return Ok(page_rc);
        }

        if self.buffer.size() >= self.get_capacity() {
            self.evict_page()?;
        }

        let file = Database::catalog().get_db_file(pid.get_table_id())?;
        let page = file.read_page(pid)?;
        let page_rc: Pod<HeapPage> = Arc::new(RwLock::new(page));
        self.buffer.insert(*pid, page_rc.clone());
        debug!("page {} cached, cache size: {}", pid, self.buffer.size());
        Ok(page_rc)
    }

    /// Discard any clean page. NO-STEAL forbids evicting dirty pages, so a
    /// cache full of uncommitted work is a hard failure.
    fn evict_page(&self) -> TinyResult {
        for (pid, page_rc) in self.buffer.entries() {
            if page_rc.rl().dirty_tid().is_none() {
                debug!("page {} evicted", pid);
                self.buffer.remove(&pid);
                return Ok(());
            }
        }

        Err(TinyError::db(
            "cache exhausted, every buffered page is dirty",
        ))
    }

    /// Insert the tuple into the table on behalf of the transaction and
    /// mark the touched pages dirty.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        table_id: u32,
        t: &mut Tuple,
    ) -> TinyResult {
        let file = Database::catalog().get_db_file(table_id)?;
        let dirty_pages = file.insert_tuple(tx, t)?;
        for page_rc in dirty_pages {
            page_rc.wl().mark_dirty(true, tx.get_id());
        }
        Ok(())
    }

    /// Delete the tuple at its record id, symmetric to `insert_tuple`.
    pub fn delete_tuple(&self, tx: &Transaction, t: &mut Tuple) -> TinyResult {
        let rid = t.get_record_id().ok_or_else(|| {
            TinyError::db("tuple has no record id, cannot delete")
        })?;
        let table_id = rid.get_pid().get_table_id();

        let file = Database::catalog().get_db_file(table_id)?;
        let dirty_pages = file.delete_tuple(tx, t)?;
        for page_rc in dirty_pages {
            page_rc.wl().mark_dirty(true, tx.get_id());
        }
        Ok(())
    }

    /// End the transaction. On commit every page it dirtied is forced to
    /// disk; on abort every page it dirtied is rolled back to the
    /// before-image. Either way all its locks are released afterwards.
    pub fn transaction_complete(
        &self,
        tx: &Transaction,
        commit: bool,
    ) -> TinyResult {
        let concurrent_status = Database::concurrent_status();
        concurrent_status.wait_for_inflight(tx.get_id());

        if commit {
            self.flush_pages(tx)?;
        } else {
            self.recover_pages(tx);
        }

        concurrent_status.set_transaction_status(
            tx.get_id(),
            if commit {
                TransactionStatus::Committed
            } else {
                TransactionStatus::Aborted
            },
        );
        concurrent_status.release_all(tx);
        debug!("{} completed, commit: {}", tx, commit);
        Ok(())
    }

    /// FORCE: write every page dirtied by the transaction to disk and
    /// refresh its before-image, which from now on is the committed state.
    pub fn flush_pages(&self, tx: &Transaction) -> TinyResult {
        for (pid, page_rc) in self.buffer.entries() {
            let dirtied_by_tx =
                page_rc.rl().dirty_tid() == Some(tx.get_id());
            if dirtied_by_tx {
                self.flush_page_rc(&pid, &page_rc)?;
                page_rc.wl().set_before_image();
            }
        }
        Ok(())
    }

    /// Write a single cached page to disk, whoever dirtied it.
    pub fn flush_page(&self, pid: &HeapPageID) -> TinyResult {
        match self.buffer.get(pid) {
            Some(page_rc) => self.flush_page_rc(pid, &page_rc),
            None => Ok(()),
        }
    }

    pub fn flush_all_pages(&self) -> TinyResult {
        for (pid, page_rc) in self.buffer.entries() {
            self.flush_page_rc(&pid, &page_rc)?;
        }
        Ok(())
    }

    fn flush_page_rc(
        &self,
        pid: &HeapPageID,
        page_rc: &Pod<HeapPage>,
    ) -> TinyResult {
        let file = Database::catalog().get_db_file(pid.get_table_id())?;
        debug!("flush page {}, {}", pid, lock_state(Arc::clone(page_rc)));

        let mut page = page_rc.wl();
        file.write_page(&page)?;
        if let Some(tid) = page.dirty_tid() {
            page.mark_dirty(false, tid);
        }
        Ok(())
    }

    /// NO-STEAL rollback: none of the aborting transaction's work reached
    /// disk, so restoring the in-memory before-images erases it entirely.
    fn recover_pages(&self, tx: &Transaction) {
        let tid = tx.get_id();
        for pid in Database::concurrent_status().get_hold_pages(tx) {
            if let Some(page_rc) = self.buffer.get(&pid) {
                let mut page = page_rc.wl();
                if page.dirty_tid() == Some(tid) {
                    let before = page.get_before_image();
                    *page = before;
                    debug!("page {} rolled back", pid);
                }
            }
        }
    }

    /// Hand a lock count back before the transaction ends. Breaks strict
    /// 2PL, reserved for probe locks on pages the transaction never read.
    pub fn release_page(&self, tx: &Transaction, pid: &HeapPageID) {
        Database::concurrent_status().release_lock(tx, pid);
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        Database::concurrent_status().holds_lock(tx, pid)
    }

    /// Drop a page from the cache without flushing it.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.buffer.remove(pid);
    }
}
