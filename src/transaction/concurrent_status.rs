use core::fmt;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, RwLock,
    },
    time::{Duration, Instant},
};

use log::debug;
use rand::Rng;

use crate::{
    error::TinyError,
    storage::heap::HeapPageID,
    transaction::{Transaction, TransactionID, TransactionStatus},
    types::{ConcurrentHashMap, TinyResult},
    utils::HandyRwLock,
};

/// Base wait budget of a single lock acquisition attempt, in milliseconds.
/// Each retry doubles the budget up to `BASE * CEILING_FACTOR`.
pub const DEFAULT_BASE_TIMEOUT_MS: u64 = 200;
const CEILING_FACTOR: u32 = 1024;

static BASE_TIMEOUT_MS: AtomicU64 = AtomicU64::new(DEFAULT_BASE_TIMEOUT_MS);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Lock {
    SLock,
    XLock,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

struct LockState {
    readers: HashMap<TransactionID, usize>,
    writer: Option<TransactionID>,
    writer_count: usize,
    upgrading: Option<TransactionID>,
}

/// Per-page reader/writer lock.
///
/// Both modes are reentrant per transaction (reference counted). The sole
/// reader upgrades to writer in place; with other readers present the
/// upgrade registers itself and drains them: no new reader is admitted
/// while an upgrade is pending, so the upgrader cannot starve.
pub struct PageLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl PageLock {
    fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                readers: HashMap::new(),
                writer: None,
                writer_count: 0,
                upgrading: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Try to acquire within the budget. Returns false on timeout, leaving
    /// the lock untouched (a pending upgrade mark of the caller is
    /// withdrawn).
    fn acquire(
        &self,
        tid: TransactionID,
        kind: Lock,
        budget: Duration,
    ) -> bool {
        let deadline = Instant::now() + budget;
        let mut state = self.state.lock().unwrap();
        loop {
            if Self::try_grant(&mut state, tid, kind) {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                if state.upgrading == Some(tid) {
                    state.upgrading = None;
                    self.cond.notify_all();
                }
                return false;
            }

            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    fn try_grant(
        state: &mut LockState,
        tid: TransactionID,
        kind: Lock,
    ) -> bool {
        match kind {
            Lock::SLock => {
                // a writer reads its own page freely; an existing reader
                // re-enters even while an upgrade is pending elsewhere
                let admitted = state.writer == Some(tid)
                    || state.readers.contains_key(&tid)
                    || (state.writer.is_none() && state.upgrading.is_none());
                if admitted {
                    *state.readers.entry(tid).or_insert(0) += 1;
                }
                admitted
            }
            Lock::XLock => {
                if state.writer == Some(tid) {
                    state.writer_count += 1;
                    return true;
                }
                if state.writer.is_some() {
                    return false;
                }

                let other_readers =
                    state.readers.keys().any(|t| *t != tid);
                if !other_readers {
                    state.writer = Some(tid);
                    state.writer_count = 1;
                    if state.upgrading == Some(tid) {
                        state.upgrading = None;
                    }
                    return true;
                }

                // we hold a read lock among others, stake the upgrade
                // claim so the remaining readers can drain
                if state.readers.contains_key(&tid)
                    && state.upgrading.is_none()
                {
                    state.upgrading = Some(tid);
                }
                false
            }
        }
    }

    /// Drop one held count (the probe-release path of heap file inserts).
    /// Returns true when the transaction still holds the lock.
    fn release_one(&self, tid: TransactionID) -> bool {
        let mut state = self.state.lock().unwrap();

        if let Some(count) = state.readers.get_mut(&tid) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&tid);
            }
        } else if state.writer == Some(tid) {
            state.writer_count -= 1;
            if state.writer_count == 0 {
                state.writer = None;
            }
        }

        let still_holds = state.readers.contains_key(&tid)
            || state.writer == Some(tid);
        if !still_holds && state.upgrading == Some(tid) {
            state.upgrading = None;
        }
        self.cond.notify_all();
        still_holds
    }

    fn release_all(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        state.readers.remove(&tid);
        if state.writer == Some(tid) {
            state.writer = None;
            state.writer_count = 0;
        }
        if state.upgrading == Some(tid) {
            state.upgrading = None;
        }
        self.cond.notify_all();
    }

    fn held_by(&self, tid: TransactionID) -> Option<Lock> {
        let state = self.state.lock().unwrap();
        if state.writer == Some(tid) {
            return Some(Lock::XLock);
        }
        if state.readers.contains_key(&tid) {
            return Some(Lock::SLock);
        }
        None
    }
}

/// The transaction lock table: every page lock, which transaction holds
/// what, transaction statuses, and the deadlock arbitration state.
///
/// Deadlocks are not detected through a wait-for graph. A transaction that
/// times out on an acquisition becomes a suspect; it aborts itself when it
/// is the oldest of at least two suspects, or when its wait budget has
/// reached the ceiling. Every deadlock cycle suspends all its members, so
/// one of them always matches the rule and the cycle breaks in bounded
/// time.
pub struct ConcurrentStatus {
    // page locks live for the whole process, keyed by page id
    locks: ConcurrentHashMap<HeapPageID, Arc<PageLock>>,

    hold_pages: RwLock<HashMap<TransactionID, HashSet<HeapPageID>>>,

    transaction_status: RwLock<HashMap<TransactionID, TransactionStatus>>,

    suspects: Mutex<BTreeSet<TransactionID>>,

    // in-flight acquire counters, drained by transaction_complete before
    // the locks of the transaction go away
    inflight: Mutex<HashMap<TransactionID, usize>>,
    inflight_cond: Condvar,
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            locks: ConcurrentHashMap::new(),
            hold_pages: RwLock::new(HashMap::new()),
            transaction_status: RwLock::new(HashMap::new()),
            suspects: Mutex::new(BTreeSet::new()),
            inflight: Mutex::new(HashMap::new()),
            inflight_cond: Condvar::new(),
        }
    }

    /// Override the base wait budget. Tests use a small value to provoke
    /// deadlock resolution quickly.
    pub fn set_base_timeout_ms(ms: u64) {
        BASE_TIMEOUT_MS.store(ms, Ordering::Relaxed);
    }

    pub fn set_transaction_status(
        &self,
        tid: TransactionID,
        status: TransactionStatus,
    ) {
        self.transaction_status.wl().insert(tid, status);
    }

    pub fn get_transaction_status(
        &self,
        tid: TransactionID,
    ) -> Option<TransactionStatus> {
        self.transaction_status.rl().get(&tid).copied()
    }

    fn is_aborted(&self, tid: TransactionID) -> bool {
        self.get_transaction_status(tid) == Some(TransactionStatus::Aborted)
    }

    fn get_lock(&self, pid: &HeapPageID) -> Arc<PageLock> {
        self.locks
            .get_or_insert(pid, |_| Ok(Arc::new(PageLock::new())))
            .expect("lock creation cannot fail")
    }

    /// Request a lock on the given page. This api is blocking, but every
    /// wait is bounded; the caller either gets the lock or a
    /// `TransactionAborted` failure.
    pub fn request_lock(
        &self,
        tx: &Transaction,
        lock: &Lock,
        pid: &HeapPageID,
    ) -> TinyResult {
        self.begin_acquire(tx.get_id());
        let result = self.request_lock_inner(tx, lock, pid);
        self.end_acquire(tx.get_id());
        result
    }

    fn request_lock_inner(
        &self,
        tx: &Transaction,
        lock: &Lock,
        pid: &HeapPageID,
    ) -> TinyResult {
        let tid = tx.get_id();
        let base =
            Duration::from_millis(BASE_TIMEOUT_MS.load(Ordering::Relaxed));
        let ceiling = base * CEILING_FACTOR;
        let mut budget = base;

        loop {
            if self.is_aborted(tid) {
                return Err(TinyError::aborted(&format!(
                    "{} has been chosen as a deadlock victim",
                    tx
                )));
            }

            let page_lock = self.get_lock(pid);
            if page_lock.acquire(tid, *lock, jitter(budget)) {
                self.clear_suspect(tid);
                self.hold_pages
                    .wl()
                    .entry(tid)
                    .or_insert_with(HashSet::new)
                    .insert(*pid);
                return Ok(());
            }

            debug!(
                "{} timed out waiting for {:?} on {}, budget: {:?}",
                tx, lock, pid, budget
            );

            let at_ceiling = budget >= ceiling;
            if self.arbitrate(tid, at_ceiling) {
                self.set_transaction_status(tid, TransactionStatus::Aborted);
                self.clear_suspect(tid);
                debug!("{} aborted by the deadlock arbiter", tx);
                return Err(TinyError::aborted(&format!(
                    "{} gave up waiting for {:?} on {}",
                    tx, lock, pid
                )));
            }

            budget = std::cmp::min(budget * 2, ceiling);
        }
    }

    /// Register the transaction as a deadlock suspect and decide whether
    /// it has to die. The victim is the oldest of the current suspects;
    /// a lone suspect keeps waiting (it may simply sit behind a slow
    /// holder), unless its budget already hit the ceiling.
    fn arbitrate(&self, tid: TransactionID, at_ceiling: bool) -> bool {
        let mut suspects = self.suspects.lock().unwrap();
        suspects.insert(tid);

        if at_ceiling {
            return true;
        }
        suspects.len() > 1 && suspects.iter().next() == Some(&tid)
    }

    fn clear_suspect(&self, tid: TransactionID) {
        self.suspects.lock().unwrap().remove(&tid);
    }

    /// Drop one held count of the transaction on the page. Used for the
    /// early release of probe locks; unsafe in the 2PL sense, the caller
    /// answers for serializability.
    pub fn release_lock(&self, tx: &Transaction, pid: &HeapPageID) {
        let tid = tx.get_id();
        if let Some(page_lock) = self.locks.get(pid) {
            let still_holds = page_lock.release_one(tid);
            if !still_holds {
                if let Some(pages) = self.hold_pages.wl().get_mut(&tid) {
                    pages.remove(pid);
                }
            }
        }
    }

    /// Release every lock of the transaction and drop its bookkeeping.
    pub fn release_all(&self, tx: &Transaction) {
        let tid = tx.get_id();

        let pages = self
            .hold_pages
            .wl()
            .remove(&tid)
            .unwrap_or_else(HashSet::new);
        for pid in pages {
            if let Some(page_lock) = self.locks.get(&pid) {
                page_lock.release_all(tid);
            }
        }

        self.clear_suspect(tid);
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        self.hold_pages
            .rl()
            .get(&tx.get_id())
            .map(|pages| pages.contains(pid))
            .unwrap_or(false)
    }

    pub fn held_lock_kind(
        &self,
        tx: &Transaction,
        pid: &HeapPageID,
    ) -> Option<Lock> {
        self.locks
            .get(pid)
            .and_then(|l| l.held_by(tx.get_id()))
    }

    pub fn get_hold_pages(&self, tx: &Transaction) -> HashSet<HeapPageID> {
        self.hold_pages
            .rl()
            .get(&tx.get_id())
            .cloned()
            .unwrap_or_else(HashSet::new)
    }

    fn begin_acquire(&self, tid: TransactionID) {
        let mut inflight = self.inflight.lock().unwrap();
        *inflight.entry(tid).or_insert(0) += 1;
    }

    fn end_acquire(&self, tid: TransactionID) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(count) = inflight.get_mut(&tid) {
            *count -= 1;
            if *count == 0 {
                inflight.remove(&tid);
            }
        }
        self.inflight_cond.notify_all();
    }

    /// Block until no acquisition of the transaction is in flight, so a
    /// completion never races a waiter of the same transaction.
    pub fn wait_for_inflight(&self, tid: TransactionID) {
        let mut inflight = self.inflight.lock().unwrap();
        while inflight.get(&tid).copied().unwrap_or(0) > 0 {
            inflight = self.inflight_cond.wait(inflight).unwrap();
        }
    }

    pub fn clear(&self) {
        self.locks.clear();
        self.hold_pages.wl().clear();
        self.transaction_status.wl().clear();
        self.suspects.lock().unwrap().clear();
        self.inflight.lock().unwrap().clear();
        BASE_TIMEOUT_MS.store(DEFAULT_BASE_TIMEOUT_MS, Ordering::Relaxed);
    }
}

/// Spread wake-ups of competing waiters by ±10%.
fn jitter(budget: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let pct: u64 = rng.gen_range(90, 111);
    budget * pct as u32 / 100
}

impl fmt::Display for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut depiction = "\n".to_string();

        depiction.push_str("hold_pages: {");
        for (tid, pages) in self.hold_pages.rl().iter() {
            depiction.push_str(&format!("\n\ttx_{} -> [", tid));
            for pid in pages {
                depiction.push_str(&format!("{}, ", pid.get_short_repr()));
            }
            depiction.push_str("]");
        }
        depiction.push_str("\n}\n");

        depiction.push_str("transaction_status: {");
        for (tid, status) in self.transaction_status.rl().iter() {
            depiction.push_str(&format!("\n\ttx_{} -> {:?}, ", tid, status));
        }
        depiction.push_str("\n}\n");

        write!(f, "{}", depiction)
    }
}

impl fmt::Debug for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
