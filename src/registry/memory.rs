//! In-process coordination service
//!
//! `MemCoordinator` keeps the whole store behind one mutex, so every call
//! (transactions included) is trivially linearizable. Leases are reaped by a
//! background thread that exits once the coordinator is dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Result, ShardError};

use super::coordinator::{
    Coordinator, KeyValue, LeaseId, RangeResponse, Txn, TxnOp, TxnResponse, WatchEvent,
    WatchEventKind,
};

/// How often the reaper looks for expired leases
const REAP_INTERVAL: Duration = Duration::from_millis(20);

struct Lease {
    ttl: Duration,
    deadline: Instant,
    keys: BTreeSet<String>,
}

struct Watcher {
    prefix: String,
    tx: Sender<WatchEvent>,
}

#[derive(Default)]
struct State {
    revision: i64,
    data: BTreeMap<String, KeyValue>,
    leases: HashMap<LeaseId, Lease>,
    next_lease: LeaseId,
    watchers: Vec<Watcher>,
}

impl State {
    fn range<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a KeyValue> + 'a {
        self.data
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(_, kv)| kv)
    }

    fn notify(&mut self, event: WatchEvent) {
        self.watchers.retain(|w| {
            if !event.kv.key.starts_with(&w.prefix) {
                return true;
            }
            w.tx.send(event.clone()).is_ok()
        });
    }

    fn put(&mut self, revision: i64, key: &str, value: Vec<u8>, lease: Option<LeaseId>) {
        let previous = self.data.get(key).cloned();
        if let Some(old_lease) = previous.as_ref().and_then(|kv| kv.lease) {
            if Some(old_lease) != lease {
                if let Some(l) = self.leases.get_mut(&old_lease) {
                    l.keys.remove(key);
                }
            }
        }
        if let Some(l) = lease.and_then(|id| self.leases.get_mut(&id)) {
            l.keys.insert(key.to_string());
        }

        let kv = KeyValue {
            key: key.to_string(),
            value,
            create_revision: previous.as_ref().map_or(revision, |kv| kv.create_revision),
            mod_revision: revision,
            version: previous.as_ref().map_or(1, |kv| kv.version + 1),
            lease,
        };
        self.data.insert(key.to_string(), kv.clone());
        self.notify(WatchEvent {
            kind: WatchEventKind::Put,
            kv,
        });
    }

    fn delete(&mut self, revision: i64, key: &str) -> bool {
        let Some(old) = self.data.remove(key) else {
            return false;
        };
        if let Some(l) = old.lease.and_then(|id| self.leases.get_mut(&id)) {
            l.keys.remove(key);
        }
        self.notify(WatchEvent {
            kind: WatchEventKind::Delete,
            kv: KeyValue {
                value: Vec::new(),
                mod_revision: revision,
                ..old
            },
        });
        true
    }

    fn delete_prefix(&mut self, revision: i64, prefix: &str) -> usize {
        let doomed: Vec<String> = self.range(prefix).map(|kv| kv.key.clone()).collect();
        for key in &doomed {
            self.delete(revision, key);
        }
        doomed.len()
    }

    /// Does `op` change anything at all
    fn touches(&self, op: &TxnOp) -> bool {
        match op {
            TxnOp::Put { .. } => true,
            TxnOp::Delete { key } => self.data.contains_key(key),
            TxnOp::DeletePrefix { prefix } => self.range(prefix).next().is_some(),
        }
    }

    fn drop_lease(&mut self, id: LeaseId) -> bool {
        let Some(lease) = self.leases.remove(&id) else {
            return false;
        };
        if lease.keys.is_empty() {
            return true;
        }
        self.revision += 1;
        let revision = self.revision;
        for key in &lease.keys {
            self.delete(revision, key);
        }
        true
    }

    fn reap(&mut self, now: Instant) {
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, l)| l.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            tracing::debug!(lease = id, "lease expired");
            self.drop_lease(id);
        }
    }
}

/// An in-memory [`Coordinator`]
pub struct MemCoordinator {
    state: Mutex<State>,
    reachable: AtomicBool,
}

impl MemCoordinator {
    /// Create a coordinator and start its lease reaper
    pub fn new() -> Arc<Self> {
        let coordinator = Arc::new(Self {
            state: Mutex::new(State::default()),
            reachable: AtomicBool::new(true),
        });

        let weak: Weak<Self> = Arc::downgrade(&coordinator);
        thread::Builder::new()
            .name("mem-coordinator-reaper".to_string())
            .spawn(move || {
                let ticker = channel::tick(REAP_INTERVAL);
                while ticker.recv().is_ok() {
                    match weak.upgrade() {
                        Some(c) => c.expire_leases(),
                        None => break,
                    }
                }
            })
            .ok();

        coordinator
    }

    /// Simulate a network partition: while unreachable every call fails with
    /// `Unavailable`, and leases keep expiring because nobody can renew them
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Reap every lease whose deadline has passed
    pub fn expire_leases(&self) {
        self.state.lock().reap(Instant::now());
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ShardError::Unavailable("coordinator unreachable".to_string()))
        }
    }

    /// Lock the state after reaping leases that expired since the last call
    fn lock(&self) -> Result<parking_lot::MutexGuard<'_, State>> {
        self.check_reachable()?;
        let mut state = self.state.lock();
        state.reap(Instant::now());
        Ok(state)
    }
}

impl Coordinator for MemCoordinator {
    fn get(&self, key: &str) -> Result<Option<KeyValue>> {
        Ok(self.lock()?.data.get(key).cloned())
    }

    fn range(&self, prefix: &str) -> Result<RangeResponse> {
        let state = self.lock()?;
        Ok(RangeResponse {
            kvs: state.range(prefix).cloned().collect(),
            revision: state.revision,
        })
    }

    fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> Result<i64> {
        let mut state = self.lock()?;
        if let Some(id) = lease {
            if !state.leases.contains_key(&id) {
                return Err(ShardError::NotFound(format!("lease {}", id)));
            }
        }
        state.revision += 1;
        let revision = state.revision;
        state.put(revision, key, value, lease);
        Ok(revision)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut state = self.lock()?;
        if state.range(prefix).next().is_none() {
            return Ok(0);
        }
        state.revision += 1;
        let revision = state.revision;
        Ok(state.delete_prefix(revision, prefix))
    }

    fn txn(&self, txn: Txn) -> Result<TxnResponse> {
        let mut state = self.lock()?;

        let failed_compare = txn
            .compares
            .iter()
            .position(|c| !c.evaluate(state.data.get(&c.key)));
        if failed_compare.is_some() {
            return Ok(TxnResponse {
                succeeded: false,
                failed_compare,
                revision: state.revision,
            });
        }

        for op in &txn.success {
            if let TxnOp::Put { lease: Some(id), .. } = op {
                if !state.leases.contains_key(id) {
                    return Err(ShardError::NotFound(format!("lease {}", id)));
                }
            }
        }

        if txn.success.iter().any(|op| state.touches(op)) {
            state.revision += 1;
            let revision = state.revision;
            for op in txn.success {
                match op {
                    TxnOp::Put { key, value, lease } => state.put(revision, &key, value, lease),
                    TxnOp::Delete { key } => {
                        state.delete(revision, &key);
                    }
                    TxnOp::DeletePrefix { prefix } => {
                        state.delete_prefix(revision, &prefix);
                    }
                }
            }
        }

        Ok(TxnResponse {
            succeeded: true,
            failed_compare: None,
            revision: state.revision,
        })
    }

    fn watch_prefix(&self, prefix: &str) -> Result<Receiver<WatchEvent>> {
        let mut state = self.lock()?;
        let (tx, rx) = channel::unbounded();
        state.watchers.push(Watcher {
            prefix: prefix.to_string(),
            tx,
        });
        Ok(rx)
    }

    fn grant_lease(&self, ttl: Duration) -> Result<LeaseId> {
        let mut state = self.lock()?;
        state.next_lease += 1;
        let id = state.next_lease;
        state.leases.insert(
            id,
            Lease {
                ttl,
                deadline: Instant::now() + ttl,
                keys: BTreeSet::new(),
            },
        );
        Ok(id)
    }

    fn keep_alive(&self, lease: LeaseId) -> Result<()> {
        let mut state = self.lock()?;
        let l = state
            .leases
            .get_mut(&lease)
            .ok_or_else(|| ShardError::NotFound(format!("lease {}", lease)))?;
        l.deadline = Instant::now() + l.ttl;
        Ok(())
    }

    fn revoke_lease(&self, lease: LeaseId) -> Result<()> {
        let mut state = self.lock()?;
        state.drop_lease(lease);
        Ok(())
    }

    fn current_revision(&self) -> Result<i64> {
        Ok(self.lock()?.revision)
    }
}
