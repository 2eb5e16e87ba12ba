//! Coordinator key layout
//!
//! ```text
//! {root}/{cluster}/
//!   ├── epoch                               bumped by every topology write
//!   ├── pd_leader                           election key
//!   ├── pd_nodes/{id}
//!   ├── data_nodes/{id}                     leased
//!   └── namespaces/{ns}/
//!         ├── meta                          NamespaceMetaInfo
//!         └── parts/{p}/
//!               ├── info                    partition marker
//!               └── replicas                PartitionReplicaInfo
//! ```

use crate::error::{Result, ShardError};

#[derive(Debug, Clone)]
pub(crate) struct Paths {
    cluster: String,
}

impl Paths {
    pub(crate) fn new(root: &str, cluster_id: &str) -> Self {
        Self {
            cluster: format!("{}/{}", root.trim_end_matches('/'), cluster_id),
        }
    }

    pub(crate) fn cluster_prefix(&self) -> String {
        format!("{}/", self.cluster)
    }

    pub(crate) fn epoch(&self) -> String {
        format!("{}/epoch", self.cluster)
    }

    pub(crate) fn leader(&self) -> String {
        format!("{}/pd_leader", self.cluster)
    }

    pub(crate) fn pd_nodes(&self) -> String {
        format!("{}/pd_nodes/", self.cluster)
    }

    pub(crate) fn pd_node(&self, id: &str) -> String {
        format!("{}{}", self.pd_nodes(), id)
    }

    pub(crate) fn data_nodes(&self) -> String {
        format!("{}/data_nodes/", self.cluster)
    }

    pub(crate) fn data_node(&self, id: &str) -> String {
        format!("{}{}", self.data_nodes(), id)
    }

    pub(crate) fn namespaces(&self) -> String {
        format!("{}/namespaces/", self.cluster)
    }

    pub(crate) fn namespace(&self, ns: &str) -> String {
        format!("{}{}/", self.namespaces(), ns)
    }

    pub(crate) fn namespace_meta(&self, ns: &str) -> String {
        format!("{}meta", self.namespace(ns))
    }

    pub(crate) fn partition(&self, ns: &str, partition: u32) -> String {
        format!("{}parts/{}/", self.namespace(ns), partition)
    }

    pub(crate) fn partition_info(&self, ns: &str, partition: u32) -> String {
        format!("{}info", self.partition(ns, partition))
    }

    pub(crate) fn partition_replicas(&self, ns: &str, partition: u32) -> String {
        format!("{}replicas", self.partition(ns, partition))
    }

    /// Classify a key under the namespaces prefix
    pub(crate) fn parse_namespace_key<'k>(&self, key: &'k str) -> Option<NamespaceKey<'k>> {
        let rest = key.strip_prefix(self.namespaces().as_str())?;
        let (ns, rest) = rest.split_once('/')?;
        if rest == "meta" {
            return Some(NamespaceKey::Meta { ns });
        }
        let rest = rest.strip_prefix("parts/")?;
        let (partition, leaf) = rest.split_once('/')?;
        let partition = partition.parse().ok()?;
        match leaf {
            "info" => Some(NamespaceKey::PartitionInfo { ns, partition }),
            "replicas" => Some(NamespaceKey::Replicas { ns, partition }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamespaceKey<'k> {
    Meta { ns: &'k str },
    PartitionInfo { ns: &'k str, partition: u32 },
    Replicas { ns: &'k str, partition: u32 },
}

/// Names become path segments, so they must be non-empty and slash-free
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(ShardError::invalid(format!("invalid {} name: {:?}", kind, name)));
    }
    Ok(())
}
