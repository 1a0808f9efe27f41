use serde::{Deserialize, Serialize};

use super::{Cluster, ClusterPhase, Provider};

/// Read-facing projection of a stored cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub cluster: Cluster,
    pub node_size: usize,
    pub status: ClusterPhase,
    pub provider: Provider,
}

impl From<Cluster> for ClusterView {
    fn from(cluster: Cluster) -> Self {
        Self {
            node_size: cluster.nodes.len(),
            status: cluster.status.phase,
            provider: cluster.spec.provider,
            cluster,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterPage {
    pub items: Vec<ClusterView>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebkubectlToken {
    pub token: String,
}
