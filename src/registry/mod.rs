//! Registry Module
//!
//! The partition registry: the control-plane view of which nodes exist, which
//! namespaces and partitions exist, where each partition's replicas live and
//! who the placement-driver leader is. All state lives in a [`Coordinator`];
//! a [`Registry`] is just a handle onto it.
//!
//! ## Write rules
//! - Namespace and partition writes are leader-gated: each is one coordinator
//!   transaction that also compares the election key against the caller's
//!   leadership token, so there is no check-then-write window
//! - Replica assignments are epoch-CAS: a write names the epoch it read and
//!   stores `epoch + 1`, or fails with `Conflict`
//! - Node registration is done by the node itself and is not gated
//!
//! ## Background work
//! Data-node keepalives, watches and leader campaigns each run on their own
//! thread and stop on cancel or on [`Registry::stop`].

mod coordinator;
mod election;
mod memory;
mod paths;
mod types;
mod watch;

pub use coordinator::{
    Compare, CompareResult, CompareTarget, Coordinator, KeyValue, LeaseId, RangeResponse, Txn,
    TxnOp, TxnResponse, WatchEvent, WatchEventKind,
};
pub use memory::MemCoordinator;
pub use types::{NamespaceMetaInfo, NodeInfo, PartitionMetaInfo, PartitionReplicaInfo};
pub use watch::Subscription;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RegistryConfig;
use crate::error::{Result, ShardError};

use election::LeaderClaim;
use paths::{validate_name, NamespaceKey, Paths};
use watch::{stop_channel, wait_for_change, Wake};

// =============================================================================
// Shared state
// =============================================================================

/// A running data-node keepalive
struct KeepAlive {
    lease: Arc<AtomicI64>,
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

/// State shared between a registry handle and its background threads
pub(crate) struct Inner {
    coordinator: Arc<dyn Coordinator>,
    config: RegistryConfig,
    paths: Paths,

    /// Leadership held by this handle, if any
    claim: Mutex<Option<LeaderClaim>>,

    /// Keepalives of data nodes registered through this handle, by node id
    keepalives: Mutex<HashMap<String, KeepAlive>>,

    /// Every other background loop still running
    workers: Mutex<Vec<Worker>>,
}

/// A background loop's stop sender, and a token that dies with the loop
struct Worker {
    stop: Sender<()>,
    alive: Weak<()>,
}

impl Worker {
    fn is_running(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

impl Inner {
    /// Track a new loop; it must hold the returned token until it exits
    fn register_worker(&self) -> (Sender<()>, Receiver<()>, Arc<()>) {
        let (tx, rx) = stop_channel();
        let alive = Arc::new(());
        let mut workers = self.workers.lock();
        workers.retain(Worker::is_running);
        workers.push(Worker {
            stop: tx.clone(),
            alive: Arc::downgrade(&alive),
        });
        (tx, rx, alive)
    }
}

pub(crate) fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(record)?)
}

pub(crate) fn decode_record<T: DeserializeOwned>(raw: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(raw)?)
}

/// Handle onto the partition registry of one cluster
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    /// Create a handle over an explicit coordinator
    pub fn new(coordinator: Arc<dyn Coordinator>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let paths = Paths::new(&config.root, &config.cluster_id);
        Ok(Self {
            inner: Arc::new(Inner {
                coordinator,
                config,
                paths,
                claim: Mutex::new(None),
                keepalives: Mutex::new(HashMap::new()),
                workers: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Number of watch, campaign and notify loops still running
    pub fn active_workers(&self) -> usize {
        let mut workers = self.inner.workers.lock();
        workers.retain(Worker::is_running);
        workers.len()
    }

    /// Stop keepalives and background loops and resign leadership
    ///
    /// Nodes registered through this handle are left to expire with their
    /// leases.
    pub fn stop(&self) {
        let keepalives: Vec<KeepAlive> = self.inner.keepalives.lock().drain().map(|(_, k)| k).collect();
        for mut keepalive in keepalives {
            let _ = keepalive.stop.try_send(());
            if let Some(handle) = keepalive.handle.take() {
                let _ = handle.join();
            }
        }
        for worker in self.inner.workers.lock().drain(..) {
            let _ = worker.stop.try_send(());
        }
        election::resign_held(&self.inner);
        tracing::info!(cluster = %self.inner.config.cluster_id, "registry stopped");
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Register or update a placement-driver node
    pub fn register_pd_node(&self, node: &NodeInfo) -> Result<()> {
        validate_name("node", &node.id)?;
        self.inner
            .coordinator
            .put(&self.inner.paths.pd_node(&node.id), encode_record(node)?, None)?;
        Ok(())
    }

    /// Remove a placement-driver node; a missing node is not an error
    pub fn unregister_pd_node(&self, id: &str) -> Result<()> {
        validate_name("node", id)?;
        let txn = Txn::new().delete(self.inner.paths.pd_node(id));
        self.inner.coordinator.txn(txn)?;
        Ok(())
    }

    /// Register or update a data node
    ///
    /// The record is attached to a lease renewed by a background keepalive
    /// until [`Registry::unregister_node`] or [`Registry::stop`]; if the lease
    /// is lost (for example across a partition) the keepalive re-registers.
    pub fn register_node(&self, node: &NodeInfo) -> Result<()> {
        validate_name("node", &node.id)?;
        let inner = &self.inner;
        let path = inner.paths.data_node(&node.id);
        let record = encode_record(node)?;

        let mut keepalives = inner.keepalives.lock();
        if let Some(existing) = keepalives.get(&node.id) {
            let lease = existing.lease.load(Ordering::SeqCst);
            inner.coordinator.put(&path, record, Some(lease))?;
            return Ok(());
        }

        let lease = inner.coordinator.grant_lease(inner.config.node_ttl)?;
        inner.coordinator.put(&path, record.clone(), Some(lease))?;

        let lease = Arc::new(AtomicI64::new(lease));
        let (stop_tx, stop_rx) = stop_channel();
        let handle = {
            let inner = Arc::clone(inner);
            let lease = Arc::clone(&lease);
            thread::Builder::new()
                .name(format!("keepalive-{}", node.id))
                .spawn(move || keepalive_loop(inner, path, record, lease, stop_rx))?
        };
        keepalives.insert(
            node.id.clone(),
            KeepAlive {
                lease,
                stop: stop_tx,
                handle: Some(handle),
            },
        );
        tracing::info!(node = %node.id, "data node registered");
        Ok(())
    }

    /// Remove a data node; a missing node is not an error
    pub fn unregister_node(&self, id: &str) -> Result<()> {
        validate_name("node", id)?;
        let keepalive = self.inner.keepalives.lock().remove(id);
        if let Some(mut keepalive) = keepalive {
            let _ = keepalive.stop.try_send(());
            if let Some(handle) = keepalive.handle.take() {
                let _ = handle.join();
            }
            self.inner
                .coordinator
                .revoke_lease(keepalive.lease.load(Ordering::SeqCst))?;
        }
        let txn = Txn::new().delete(self.inner.paths.data_node(id));
        self.inner.coordinator.txn(txn)?;
        tracing::info!(node = %id, "data node unregistered");
        Ok(())
    }

    pub fn get_all_pd_nodes(&self) -> Result<Vec<NodeInfo>> {
        list_nodes(&self.inner, &self.inner.paths.pd_nodes())
    }

    pub fn get_data_nodes(&self) -> Result<Vec<NodeInfo>> {
        list_nodes(&self.inner, &self.inner.paths.data_nodes())
    }

    /// Data-node membership: the current snapshot, then a fresh snapshot after
    /// every change, until cancelled
    pub fn watch_data_nodes(&self) -> Result<Subscription<Vec<NodeInfo>>> {
        let inner = Arc::clone(&self.inner);
        let events = inner.coordinator.watch_prefix(&inner.paths.data_nodes())?;
        let first = self.get_data_nodes()?;
        let (stop_tx, stop_rx, alive) = inner.register_worker();

        Ok(Subscription::spawn("watch-data-nodes", stop_tx, stop_rx, move |publisher, stop| {
            let _alive = alive;
            publisher.publish(first);
            let mut events = events;
            let mut stale = false;
            loop {
                match wait_for_change(&stop, &events, inner.config.keepalive_interval) {
                    Wake::Stop => break,
                    Wake::Closed => {
                        tracing::warn!("data node watch disconnected");
                        events = channel::never();
                        continue;
                    }
                    Wake::Tick if !stale => continue,
                    Wake::Event | Wake::Tick => {}
                }
                match list_nodes(&inner, &inner.paths.data_nodes()) {
                    Ok(nodes) => {
                        stale = false;
                        publisher.publish(nodes);
                    }
                    Err(e) => {
                        stale = true;
                        tracing::debug!(error = %e, "failed to refresh data nodes");
                    }
                }
            }
            tracing::debug!("data node watch exited");
        }))
    }

    // =========================================================================
    // Leadership
    // =========================================================================

    /// Campaign for placement-driver leadership and emit the leader on every
    /// change until cancelled; cancelling resigns if this handle leads
    pub fn acquire_and_watch_leader(&self, me: &NodeInfo) -> Result<Subscription<NodeInfo>> {
        validate_name("node", &me.id)?;
        let inner = Arc::clone(&self.inner);
        let me = me.clone();
        let (stop_tx, stop_rx, alive) = inner.register_worker();
        Ok(Subscription::spawn("pd-leader", stop_tx, stop_rx, move |publisher, stop| {
            let _alive = alive;
            election::leader_loop(inner, Some(me), publisher, stop)
        }))
    }

    /// Emit the current leader on every change without campaigning
    pub fn watch_leader(&self) -> Result<Subscription<NodeInfo>> {
        let inner = Arc::clone(&self.inner);
        let (stop_tx, stop_rx, alive) = inner.register_worker();
        Ok(Subscription::spawn("watch-leader", stop_tx, stop_rx, move |publisher, stop| {
            let _alive = alive;
            election::leader_loop(inner, None, publisher, stop)
        }))
    }

    /// The current leader, if any
    pub fn get_leader(&self) -> Result<Option<NodeInfo>> {
        let leader = election::current_leader(self.inner.coordinator.as_ref(), &self.inner.paths.leader())?;
        Ok(leader.map(|(node, _)| node))
    }

    /// Whether this handle currently holds leadership
    pub fn is_leader(&self) -> bool {
        self.inner.claim.lock().is_some()
    }

    // =========================================================================
    // Namespaces and partitions (leader-gated)
    // =========================================================================

    /// Create a namespace; `AlreadyExists` if a live one has that name
    ///
    /// Returns the stored meta with its freshly minted magic code.
    pub fn create_namespace(&self, ns: &str, meta: &NamespaceMetaInfo) -> Result<NamespaceMetaInfo> {
        validate_name("namespace", ns)?;
        if meta.partition_num == 0 || meta.replica == 0 {
            return Err(ShardError::invalid("partition count and replica count must be positive"));
        }
        let key = self.inner.paths.namespace_meta(ns);
        let stored = NamespaceMetaInfo {
            magic_code: 0,
            meta_epoch: 0,
            ..meta.clone()
        };

        let txn = Txn::new()
            .when(Compare::create_revision(&key, CompareResult::Equal, 0))
            .put(&key, encode_record(&stored)?, None);
        let resp = self.gated_txn(txn)?;
        if !resp.succeeded {
            return Err(ShardError::AlreadyExists(format!("namespace {}", ns)));
        }

        tracing::info!(namespace = ns, magic_code = resp.revision, "namespace created");
        Ok(NamespaceMetaInfo {
            magic_code: resp.revision,
            ..stored
        })
    }

    /// Create a partition of an existing namespace; re-creating is a no-op
    pub fn create_namespace_partition(&self, ns: &str, partition: u32) -> Result<()> {
        let meta = self.get_namespace_meta_info(ns)?;
        if partition >= meta.partition_num {
            return Err(ShardError::invalid(format!(
                "partition {} out of range for {} partitions",
                partition, meta.partition_num
            )));
        }

        let paths = &self.inner.paths;
        let info_key = paths.partition_info(ns, partition);
        let txn = Txn::new()
            .when(Compare::create_revision(paths.namespace_meta(ns), CompareResult::Equal, meta.magic_code))
            .when(Compare::create_revision(&info_key, CompareResult::Equal, 0))
            .put(&info_key, encode_record(&partition)?, None);

        let resp = self.gated_txn(txn)?;
        match resp.failed_compare {
            None => {
                tracing::info!(namespace = ns, partition, "partition created");
                Ok(())
            }
            Some(1) => Err(ShardError::Conflict(format!("namespace {} was recreated", ns))),
            Some(_) => Ok(()),
        }
    }

    /// Epoch-CAS update of a partition's replica assignment
    ///
    /// The first write (no assignment stored yet) always succeeds. Later
    /// writes must present the stored epoch as `old_gen`. Success stores
    /// `epoch = old_gen + 1` and returns it.
    pub fn update_namespace_part_replica_info(
        &self,
        ns: &str,
        partition: u32,
        info: &PartitionReplicaInfo,
        old_gen: i64,
    ) -> Result<i64> {
        let meta = self.get_namespace_meta_info(ns)?;
        self.cas_replica_info(ns, partition, meta.magic_code, info, old_gen)
    }

    /// Like [`Registry::update_namespace_part_replica_info`], fenced on the
    /// magic code and epoch of a previously read partition
    ///
    /// Fails with `Conflict` if the namespace was recreated since `meta` was
    /// read, even when the epochs happen to match.
    pub fn update_partition_replica_info(
        &self,
        meta: &PartitionMetaInfo,
        info: &PartitionReplicaInfo,
    ) -> Result<i64> {
        self.cas_replica_info(
            &meta.name,
            meta.partition,
            meta.namespace.magic_code,
            info,
            meta.replica.epoch,
        )
    }

    fn cas_replica_info(
        &self,
        ns: &str,
        partition: u32,
        magic_code: i64,
        info: &PartitionReplicaInfo,
        old_gen: i64,
    ) -> Result<i64> {
        validate_name("namespace", ns)?;
        info.validate()?;

        let paths = &self.inner.paths;
        let coordinator = &self.inner.coordinator;
        let info_key = paths.partition_info(ns, partition);
        let replicas_key = paths.partition_replicas(ns, partition);

        let part = coordinator
            .get(&info_key)?
            .ok_or_else(|| ShardError::NotFound(format!("partition {}-{}", ns, partition)))?;

        let stored = coordinator.get(&replicas_key)?;
        let replicas_guard = match &stored {
            None => Compare::create_revision(&replicas_key, CompareResult::Equal, 0),
            Some(kv) => {
                let current: PartitionReplicaInfo = decode_record(&kv.value)?;
                if current.epoch != old_gen {
                    return Err(ShardError::Conflict(format!(
                        "replica epoch of {}-{} is {}, not {}",
                        ns, partition, current.epoch, old_gen
                    )));
                }
                if info.max_raft_id < current.max_raft_id {
                    return Err(ShardError::invalid(format!(
                        "max raft id may not decrease ({} < {})",
                        info.max_raft_id, current.max_raft_id
                    )));
                }
                Compare::mod_revision(&replicas_key, CompareResult::Equal, kv.mod_revision)
            }
        };

        let epoch = old_gen + 1;
        let record = PartitionReplicaInfo {
            epoch,
            ..info.clone()
        };
        let txn = Txn::new()
            .when(Compare::create_revision(paths.namespace_meta(ns), CompareResult::Equal, magic_code))
            .when(Compare::create_revision(&info_key, CompareResult::Equal, part.create_revision))
            .when(replicas_guard)
            .put(&replicas_key, encode_record(&record)?, None);

        let resp = self.gated_txn(txn)?;
        match resp.failed_compare {
            None => {
                tracing::debug!(namespace = ns, partition, epoch, "replica info updated");
                Ok(epoch)
            }
            Some(1) => Err(ShardError::Conflict(format!("namespace {} was recreated", ns))),
            Some(2) => Err(ShardError::Conflict(format!("partition {}-{} was recreated", ns, partition))),
            Some(_) => Err(ShardError::Conflict(format!(
                "replica info of {}-{} changed concurrently",
                ns, partition
            ))),
        }
    }

    /// Remove one partition and its replica assignment; missing is not an error
    pub fn delete_namespace_part(&self, ns: &str, partition: u32) -> Result<()> {
        validate_name("namespace", ns)?;
        let txn = Txn::new().delete_prefix(self.inner.paths.partition(ns, partition));
        self.gated_txn(txn)?;
        tracing::info!(namespace = ns, partition, "partition deleted");
        Ok(())
    }

    /// Remove a namespace and everything under it; missing is not an error
    pub fn delete_whole_namespace(&self, ns: &str) -> Result<()> {
        validate_name("namespace", ns)?;
        let txn = Txn::new().delete_prefix(self.inner.paths.namespace(ns));
        self.gated_txn(txn)?;
        tracing::info!(namespace = ns, "namespace deleted");
        Ok(())
    }

    /// Run a transaction fenced on this handle's leadership token
    ///
    /// The leader compare goes first, so `failed_compare` indexes in the
    /// returned response match the caller's own compares plus one. A write
    /// also bumps the cluster epoch record.
    fn gated_txn(&self, txn: Txn) -> Result<TxnResponse> {
        let held = *self.inner.claim.lock();
        let token = held.map(|c| c.token).ok_or(ShardError::NotLeader)?;
        let paths = &self.inner.paths;

        let mut gated = Txn::new().when(Compare::create_revision(paths.leader(), CompareResult::Equal, token));
        gated.compares.extend(txn.compares);
        gated.success = txn.success;
        gated = gated.put(paths.epoch(), Vec::new(), None);

        let resp = self.inner.coordinator.txn(gated)?;
        if resp.failed_compare == Some(0) {
            return Err(ShardError::NotLeader);
        }
        Ok(resp)
    }

    // =========================================================================
    // Namespace reads
    // =========================================================================

    /// Modification revision of the last topology write (0 before any)
    pub fn get_cluster_epoch(&self) -> Result<i64> {
        Ok(self
            .inner
            .coordinator
            .get(&self.inner.paths.epoch())?
            .map_or(0, |kv| kv.mod_revision))
    }

    pub fn is_exist_namespace(&self, ns: &str) -> Result<bool> {
        validate_name("namespace", ns)?;
        Ok(self.inner.coordinator.get(&self.inner.paths.namespace_meta(ns))?.is_some())
    }

    pub fn is_exist_namespace_partition(&self, ns: &str, partition: u32) -> Result<bool> {
        validate_name("namespace", ns)?;
        Ok(self
            .inner
            .coordinator
            .get(&self.inner.paths.partition_info(ns, partition))?
            .is_some())
    }

    pub fn get_namespace_meta_info(&self, ns: &str) -> Result<NamespaceMetaInfo> {
        validate_name("namespace", ns)?;
        let kv = self
            .inner
            .coordinator
            .get(&self.inner.paths.namespace_meta(ns))?
            .ok_or_else(|| ShardError::NotFound(format!("namespace {}", ns)))?;
        decode_meta(&kv)
    }

    /// One partition, with namespace meta and replica assignment read fresh
    pub fn get_namespace_part_info(&self, ns: &str, partition: u32) -> Result<PartitionMetaInfo> {
        self.get_namespace_info(ns)?
            .into_iter()
            .find(|p| p.partition == partition)
            .ok_or_else(|| ShardError::NotFound(format!("partition {}-{}", ns, partition)))
    }

    /// Every partition of one namespace, in partition order, from one read
    pub fn get_namespace_info(&self, ns: &str) -> Result<Vec<PartitionMetaInfo>> {
        validate_name("namespace", ns)?;
        let resp = self.inner.coordinator.range(&self.inner.paths.namespace(ns))?;
        let mut all = assemble_namespaces(&self.inner.paths, &resp.kvs)?;
        all.remove(ns)
            .ok_or_else(|| ShardError::NotFound(format!("namespace {}", ns)))
    }

    /// Every namespace and its partitions, from one read
    pub fn get_all_namespaces(&self) -> Result<BTreeMap<String, Vec<PartitionMetaInfo>>> {
        let resp = self.inner.coordinator.range(&self.inner.paths.namespaces())?;
        assemble_namespaces(&self.inner.paths, &resp.kvs)
    }

    /// A signal fired after any change under the cluster root
    ///
    /// Signals coalesce: at most one is pending, so a slow reader re-polls once
    /// for any number of changes. The channel disconnects on [`Registry::stop`].
    pub fn namespaces_notify(&self) -> Result<Receiver<()>> {
        let inner = Arc::clone(&self.inner);
        let events = inner.coordinator.watch_prefix(&inner.paths.cluster_prefix())?;
        let (_, stop, alive) = inner.register_worker();
        let (tx, rx) = channel::bounded(1);

        thread::Builder::new()
            .name("namespaces-notify".to_string())
            .spawn(move || {
                let _alive = alive;
                loop {
                    match wait_for_change(&stop, &events, inner.config.keepalive_interval) {
                        Wake::Stop | Wake::Closed => break,
                        Wake::Tick => continue,
                        Wake::Event => {}
                    }
                    if let Err(TrySendError::Disconnected(())) = tx.try_send(()) {
                        break;
                    }
                }
                tracing::debug!("namespace notifier exited");
            })?;
        Ok(rx)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn list_nodes(inner: &Inner, prefix: &str) -> Result<Vec<NodeInfo>> {
    let resp = inner.coordinator.range(prefix)?;
    resp.kvs
        .iter()
        .map(|kv| {
            let mut node: NodeInfo = decode_record(&kv.value)?;
            node.epoch = kv.mod_revision;
            Ok(node)
        })
        .collect()
}

fn decode_meta(kv: &KeyValue) -> Result<NamespaceMetaInfo> {
    let mut meta: NamespaceMetaInfo = decode_record(&kv.value)?;
    meta.magic_code = kv.create_revision;
    Ok(meta)
}

/// Group namespace records into per-namespace partition lists
///
/// Partitions whose namespace meta is missing are ignored.
fn assemble_namespaces(paths: &Paths, kvs: &[KeyValue]) -> Result<BTreeMap<String, Vec<PartitionMetaInfo>>> {
    let mut metas: BTreeMap<&str, NamespaceMetaInfo> = BTreeMap::new();
    let mut parts: BTreeMap<(&str, u32), Option<PartitionReplicaInfo>> = BTreeMap::new();

    for kv in kvs {
        match paths.parse_namespace_key(&kv.key) {
            Some(NamespaceKey::Meta { ns }) => {
                metas.insert(ns, decode_meta(kv)?);
            }
            Some(NamespaceKey::PartitionInfo { ns, partition }) => {
                parts.entry((ns, partition)).or_insert(None);
            }
            Some(NamespaceKey::Replicas { ns, partition }) => {
                parts.insert((ns, partition), Some(decode_record(&kv.value)?));
            }
            None => {}
        }
    }

    let mut out: BTreeMap<String, Vec<PartitionMetaInfo>> = metas
        .keys()
        .map(|ns| (ns.to_string(), Vec::new()))
        .collect();
    for ((ns, partition), replica) in parts {
        let (Some(meta), Some(list)) = (metas.get(ns), out.get_mut(ns)) else {
            continue;
        };
        list.push(PartitionMetaInfo {
            name: ns.to_string(),
            partition,
            namespace: meta.clone(),
            replica: replica.unwrap_or_default(),
        });
    }
    Ok(out)
}

/// Renew a data node's lease until stopped; re-register if it was lost
fn keepalive_loop(inner: Arc<Inner>, path: String, record: Vec<u8>, lease: Arc<AtomicI64>, stop: Receiver<()>) {
    let events: Receiver<()> = channel::never();
    loop {
        if wait_for_change(&stop, &events, inner.config.keepalive_interval) == Wake::Stop {
            break;
        }

        let current = lease.load(Ordering::SeqCst);
        match inner.coordinator.keep_alive(current) {
            Ok(()) => {}
            Err(ShardError::NotFound(_)) => {
                tracing::warn!(path = %path, "node lease lost, re-registering");
                let renewed = inner
                    .coordinator
                    .grant_lease(inner.config.node_ttl)
                    .and_then(|id| inner.coordinator.put(&path, record.clone(), Some(id)).map(|_| id));
                match renewed {
                    Ok(id) => lease.store(id, Ordering::SeqCst),
                    Err(e) => tracing::warn!(error = %e, "failed to re-register node"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to renew node lease"),
        }
    }
    tracing::debug!(path = %path, "keepalive exited");
}
