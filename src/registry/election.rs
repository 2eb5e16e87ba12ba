//! Leader election
//!
//! A placement driver becomes leader by creating the election key under a
//! lease, guarded by "the key does not exist". The creation revision of that
//! key is the leadership token: leader-gated writes compare against it, so a
//! deposed leader's writes fail even if it has not noticed yet.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver};

use crate::error::{Result, ShardError};

use super::coordinator::{Compare, CompareResult, Coordinator, LeaseId, Txn, TxnOp};
use super::watch::{wait_for_change, Publisher, Wake};
use super::{decode_record, encode_record, Inner, NodeInfo};

/// Proof of holding leadership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeaderClaim {
    pub(crate) lease: LeaseId,
    pub(crate) token: i64,
}

/// Try once to become leader; `None` if someone else holds the key
pub(crate) fn campaign(inner: &Inner, me: &NodeInfo) -> Result<Option<LeaderClaim>> {
    let key = inner.paths.leader();
    let coordinator = &inner.coordinator;

    let lease = coordinator.grant_lease(inner.config.leader_ttl)?;
    let txn = Txn::new()
        .when(Compare::create_revision(&key, CompareResult::Equal, 0))
        .put(&key, encode_record(me)?, Some(lease));
    let resp = coordinator.txn(txn)?;

    if !resp.succeeded {
        coordinator.revoke_lease(lease)?;
        return Ok(None);
    }
    Ok(Some(LeaderClaim {
        lease,
        token: resp.revision,
    }))
}

/// Current leader and its token
pub(crate) fn current_leader(coordinator: &dyn Coordinator, key: &str) -> Result<Option<(NodeInfo, i64)>> {
    match coordinator.get(key)? {
        Some(kv) => {
            let mut node: NodeInfo = decode_record(&kv.value)?;
            node.epoch = kv.create_revision;
            Ok(Some((node, kv.create_revision)))
        }
        None => Ok(None),
    }
}

/// Give up leadership if still held; safe to call after the claim was lost
pub(crate) fn resign(inner: &Inner, claim: LeaderClaim) -> Result<()> {
    let key = inner.paths.leader();
    let txn = Txn::new()
        .when(Compare::create_revision(&key, CompareResult::Equal, claim.token))
        .then(TxnOp::Delete { key });
    inner.coordinator.txn(txn)?;
    inner.coordinator.revoke_lease(claim.lease)
}

/// Drop the registry's claim and resign it
pub(crate) fn resign_held(inner: &Inner) {
    let claim = inner.claim.lock().take();
    if let Some(claim) = claim {
        match resign(inner, claim) {
            Ok(()) => tracing::info!(token = claim.token, "resigned leadership"),
            Err(e) => tracing::warn!(error = %e, "failed to resign leadership"),
        }
    }
}

/// Keep campaigning and publish every leader change until stopped
///
/// With `me = None` the loop only observes.
pub(crate) fn leader_loop(
    inner: Arc<Inner>,
    me: Option<NodeInfo>,
    publisher: Publisher<NodeInfo>,
    stop: Receiver<()>,
) {
    let key = inner.paths.leader();
    let mut events = inner.coordinator.watch_prefix(&key).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "leader watch unavailable, polling");
        channel::never()
    });
    let mut last: Option<i64> = None;

    loop {
        if let Some(me) = &me {
            renew_or_campaign(&inner, me);
        }

        match current_leader(inner.coordinator.as_ref(), &key) {
            Ok(Some((node, token))) => {
                let mut claim = inner.claim.lock();
                if me.is_some() && claim.map_or(false, |c| c.token != token) {
                    tracing::warn!(leader = %node.id, "leadership lost");
                    *claim = None;
                }
                drop(claim);

                if last != Some(token) {
                    tracing::info!(leader = %node.id, token, "leader changed");
                    last = Some(token);
                    publisher.publish(node);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "failed to read leader"),
        }

        match wait_for_change(&stop, &events, inner.config.keepalive_interval) {
            Wake::Stop => break,
            Wake::Closed => events = channel::never(),
            Wake::Event | Wake::Tick => {}
        }
    }

    if me.is_some() {
        resign_held(&inner);
    }
    tracing::debug!("leader loop exited");
}

fn renew_or_campaign(inner: &Inner, me: &NodeInfo) {
    let held = *inner.claim.lock();
    match held {
        Some(claim) => match inner.coordinator.keep_alive(claim.lease) {
            Ok(()) => {}
            Err(ShardError::NotFound(_)) => {
                tracing::warn!(token = claim.token, "leadership lease expired");
                let mut current = inner.claim.lock();
                if *current == Some(claim) {
                    *current = None;
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to renew leadership lease"),
        },
        None => match campaign(inner, me) {
            Ok(Some(claim)) => {
                tracing::info!(node = %me.id, token = claim.token, "acquired leadership");
                *inner.claim.lock() = Some(claim);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "campaign failed"),
        },
    }
}
