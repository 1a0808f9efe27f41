use serde::{Deserialize, Serialize};

use super::{NodeRole, Provider};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreate {
    pub name: String,
    pub version: String,
    pub provider: Provider,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub worker_amount: u32,
    pub runtime_type: String,
    #[serde(default)]
    pub docker_storage_dir: String,
    #[serde(default)]
    pub containerd_storage_dir: String,
    pub network_type: String,
    #[serde(default)]
    pub calico_ipv4pool_ipip: String,
    #[serde(default)]
    pub flannel_backend: String,
    pub kube_pod_subnet: String,
    pub kube_service_subnet: String,
    pub kube_max_pods: u32,
    pub kube_proxy_mode: String,
    #[serde(default)]
    pub ingress_controller_type: String,
    #[serde(default)]
    pub architectures: String,
    #[serde(default)]
    pub nodes: Vec<NodeCreate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCreate {
    pub host_name: String,
    pub role: NodeRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterBatch {
    pub operation: BatchOperation,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub name: String,
}

impl From<&str> for BatchItem {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_num: Option<usize>,
    pub page_size: Option<usize>,
}
