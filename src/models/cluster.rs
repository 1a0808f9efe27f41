use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// API server port used unless `DEFAULT_API_SERVER_PORT` configures another.
pub const DEFAULT_API_SERVER_PORT: u16 = 8443;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: Uuid,
    pub name: String,
    pub source: ClusterSource,
    pub plan_id: Option<Uuid>,
    pub spec: ClusterSpec,
    pub status: ClusterStatus,
    // Credentials are served only through the secrets endpoint.
    #[serde(skip)]
    pub secret: ClusterSecret,
    pub nodes: Vec<ClusterNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cluster {
    /// First master in stored node order.
    pub fn first_master(&self) -> Option<&ClusterNode> {
        self.nodes.iter().find(|n| n.role == NodeRole::Master)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSource {
    Local,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "bareMetal")]
    BareMetal,
    #[serde(rename = "plan")]
    Plan,
}

impl Provider {
    /// Providers other than bare metal size their machines from a plan.
    pub fn requires_plan(&self) -> bool {
        !matches!(self, Provider::BareMetal)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::BareMetal => write!(f, "bareMetal"),
            Provider::Plan => write!(f, "plan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub id: Uuid,
    pub runtime_type: String,
    pub docker_storage_dir: String,
    pub containerd_storage_dir: String,
    pub network_type: String,
    pub kube_pod_subnet: String,
    pub kube_service_subnet: String,
    pub version: String,
    pub provider: Provider,
    pub flannel_backend: String,
    pub calico_ipv4pool_ipip: String,
    pub kube_max_pods: u32,
    pub kube_proxy_mode: String,
    pub ingress_controller_type: String,
    pub architectures: String,
    pub kube_api_server_port: u16,
    pub kube_router: String,
    pub lb_kube_apiserver_ip: Option<String>,
    pub worker_amount: u32,
}

impl ClusterSpec {
    /// Load balancer address, if one is configured and not blank.
    pub fn load_balancer(&self) -> Option<&str> {
        self.lb_kube_apiserver_ip
            .as_deref()
            .filter(|ip| !ip.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    pub id: Uuid,
    pub phase: ClusterPhase,
    pub message: Option<String>,
    /// Provisioning steps reported by the workflows, in execution order.
    #[serde(default)]
    pub conditions: Vec<ClusterStatusCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatusCondition {
    pub name: String,
    pub status: ConditionStatus,
    pub message: Option<String>,
    pub order_num: u32,
    pub last_transition_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterPhase {
    Waiting,
    Initializing,
    Running,
    Failed,
    Terminating,
    NotReady,
    #[serde(other)]
    Unknown,
}

impl ClusterPhase {
    /// Phases whose infrastructure exists and must go through termination.
    pub fn is_provisioned(&self) -> bool {
        matches!(self, ClusterPhase::Running | ClusterPhase::Failed)
    }
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            ClusterPhase::Waiting => "Waiting",
            ClusterPhase::Initializing => "Initializing",
            ClusterPhase::Running => "Running",
            ClusterPhase::Failed => "Failed",
            ClusterPhase::Terminating => "Terminating",
            ClusterPhase::NotReady => "NotReady",
            ClusterPhase::Unknown => "Unknown",
        };
        f.write_str(phase)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecret {
    pub id: Uuid,
    pub kubeadm_token: String,
    pub kubernetes_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub id: Uuid,
    pub name: String,
    pub role: NodeRole,
    pub cluster_id: Uuid,
    pub host: Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Master,
    Worker,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Master => "master",
            NodeRole::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: Uuid,
    pub name: String,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub deploy_template: Option<String>,
}

/// Network address a client dials. Router endpoints carry no port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: Option<u16>,
}
