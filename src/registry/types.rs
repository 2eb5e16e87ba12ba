//! Registry records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};

/// A cluster member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub node_ip: String,
    pub tcp_port: u16,
    pub http_port: u16,
    pub rpc_port: u16,
    /// Modification revision of the node record, filled in on read
    pub epoch: i64,
}

impl NodeInfo {
    pub fn new(id: impl Into<String>, node_ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_ip: node_ip.into(),
            ..Default::default()
        }
    }
}

/// Static sharding configuration of one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMetaInfo {
    pub partition_num: u32,
    pub replica: u32,
    /// Incarnation marker; the creation revision of the namespace record
    pub magic_code: i64,
    pub meta_epoch: i64,
}

impl NamespaceMetaInfo {
    pub fn new(partition_num: u32, replica: u32) -> Self {
        Self {
            partition_num,
            replica,
            ..Default::default()
        }
    }
}

/// Replica assignment of one partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReplicaInfo {
    /// Member node ids, in order
    pub raft_nodes: Vec<String>,
    /// Largest internal id ever handed out for this partition
    pub max_raft_id: u64,
    /// Member node id → internal id
    pub raft_ids: BTreeMap<String, u64>,
    pub epoch: i64,
}

impl PartitionReplicaInfo {
    /// Every internal id must be covered by `max_raft_id`
    pub fn validate(&self) -> Result<()> {
        if let Some((node, id)) = self.raft_ids.iter().find(|(_, id)| **id > self.max_raft_id) {
            return Err(ShardError::invalid(format!(
                "raft id {} of {} exceeds max raft id {}",
                id, node, self.max_raft_id
            )));
        }
        Ok(())
    }
}

/// Everything known about one partition, read in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMetaInfo {
    pub name: String,
    pub partition: u32,
    pub namespace: NamespaceMetaInfo,
    pub replica: PartitionReplicaInfo,
}

impl PartitionMetaInfo {
    /// Canonical description: `"{name}-{partition}"`
    pub fn desp(&self) -> String {
        format!("{}-{}", self.name, self.partition)
    }

    pub fn partition_num(&self) -> u32 {
        self.namespace.partition_num
    }

    pub fn replica_count(&self) -> u32 {
        self.namespace.replica
    }

    pub fn magic_code(&self) -> i64 {
        self.namespace.magic_code
    }

    pub fn meta_epoch(&self) -> i64 {
        self.namespace.meta_epoch
    }

    pub fn raft_nodes(&self) -> &[String] {
        &self.replica.raft_nodes
    }

    pub fn max_raft_id(&self) -> u64 {
        self.replica.max_raft_id
    }

    pub fn raft_ids(&self) -> &BTreeMap<String, u64> {
        &self.replica.raft_ids
    }

    /// Epoch of the replica assignment
    pub fn epoch(&self) -> i64 {
        self.replica.epoch
    }
}
