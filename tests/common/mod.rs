#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use kubeatlas_clusters::{
    error::{ClusterError, Result},
    models::{
        Cluster, ClusterCreate, ClusterNode, ClusterSecret, ClusterSpec, ClusterStatus, Host,
        NodeCreate, NodeRole, Plan, Provider,
    },
    services::{ClusterInitializer, ClusterTerminator, ConnectTokenExchange, WorkflowHandle},
    store::{ClusterStore, MemoryClusterStore},
    ClusterService, ReadPolicy,
};

/// Records every workflow dispatch; can be told to refuse them.
#[derive(Default)]
pub struct RecordingWorkflows {
    pub initialized: Mutex<Vec<String>>,
    pub terminated: Mutex<Vec<String>>,
    pub fail_init: bool,
    pub fail_terminate: bool,
}

impl RecordingWorkflows {
    pub fn initialized(&self) -> Vec<String> {
        self.initialized.lock().unwrap().clone()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.terminated.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterInitializer for RecordingWorkflows {
    async fn init(&self, cluster_name: &str) -> Result<WorkflowHandle> {
        if self.fail_init {
            return Err(ClusterError::workflow("init queue unavailable"));
        }
        self.initialized.lock().unwrap().push(cluster_name.to_string());
        Ok(WorkflowHandle::dispatched(cluster_name))
    }
}

#[async_trait]
impl ClusterTerminator for RecordingWorkflows {
    async fn terminate(&self, cluster: &Cluster) -> Result<WorkflowHandle> {
        self.terminated.lock().unwrap().push(cluster.name.clone());
        if self.fail_terminate {
            return Err(ClusterError::workflow("terminal queue unavailable"));
        }
        Ok(WorkflowHandle::dispatched(cluster.name.as_str()))
    }
}

/// Token exchange returning a fixed token and recording its inputs.
#[derive(Default)]
pub struct StaticTokens {
    pub token: Option<String>,
    pub calls: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl ConnectTokenExchange for StaticTokens {
    async fn get_connect_token(
        &self,
        name: &str,
        api_server: &str,
        access_token: &str,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), api_server.to_string(), access_token.to_string()));
        self.token
            .clone()
            .ok_or_else(|| ClusterError::exchange("webkubectl unreachable"))
    }
}

/// Store whose every call fails with a transport error.
pub struct FailingStore;

fn down<T>() -> Result<T> {
    Err(ClusterError::store("connection refused"))
}

#[async_trait]
impl ClusterStore for FailingStore {
    async fn get(&self, _: &str) -> Result<Cluster> {
        down()
    }
    async fn list(&self) -> Result<Vec<Cluster>> {
        down()
    }
    async fn page(&self, _: usize, _: usize) -> Result<(usize, Vec<Cluster>)> {
        down()
    }
    async fn save(&self, _: &Cluster) -> Result<()> {
        down()
    }
    async fn delete(&self, _: &str) -> Result<()> {
        down()
    }
    async fn get_spec(&self, _: Uuid) -> Result<ClusterSpec> {
        down()
    }
    async fn get_status(&self, _: Uuid) -> Result<ClusterStatus> {
        down()
    }
    async fn get_secret(&self, _: Uuid) -> Result<ClusterSecret> {
        down()
    }
    async fn first_master(&self, _: Uuid) -> Result<ClusterNode> {
        down()
    }
    async fn get_host(&self, _: &str) -> Result<Host> {
        down()
    }
    async fn get_plan(&self, _: &str) -> Result<Plan> {
        down()
    }
    async fn get_plan_by_id(&self, _: Uuid) -> Result<Plan> {
        down()
    }
}

/// Memory store wrapper whose deletes always fail.
pub struct UndeletableStore(pub MemoryClusterStore);

#[async_trait]
impl ClusterStore for UndeletableStore {
    async fn get(&self, name: &str) -> Result<Cluster> {
        self.0.get(name).await
    }
    async fn list(&self) -> Result<Vec<Cluster>> {
        self.0.list().await
    }
    async fn page(&self, num: usize, size: usize) -> Result<(usize, Vec<Cluster>)> {
        self.0.page(num, size).await
    }
    async fn save(&self, cluster: &Cluster) -> Result<()> {
        self.0.save(cluster).await
    }
    async fn delete(&self, _: &str) -> Result<()> {
        Err(ClusterError::store("delete rejected"))
    }
    async fn get_spec(&self, id: Uuid) -> Result<ClusterSpec> {
        self.0.get_spec(id).await
    }
    async fn get_status(&self, id: Uuid) -> Result<ClusterStatus> {
        self.0.get_status(id).await
    }
    async fn get_secret(&self, id: Uuid) -> Result<ClusterSecret> {
        self.0.get_secret(id).await
    }
    async fn first_master(&self, cluster_id: Uuid) -> Result<ClusterNode> {
        self.0.first_master(cluster_id).await
    }
    async fn get_host(&self, name: &str) -> Result<Host> {
        self.0.get_host(name).await
    }
    async fn get_plan(&self, name: &str) -> Result<Plan> {
        self.0.get_plan(name).await
    }
    async fn get_plan_by_id(&self, id: Uuid) -> Result<Plan> {
        self.0.get_plan_by_id(id).await
    }
}

pub struct Harness {
    pub store: MemoryClusterStore,
    pub workflows: Arc<RecordingWorkflows>,
    pub tokens: Arc<StaticTokens>,
    pub service: ClusterService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingWorkflows::default(), StaticTokens::default(), ReadPolicy::BestEffort)
    }

    pub fn with(workflows: RecordingWorkflows, tokens: StaticTokens, policy: ReadPolicy) -> Self {
        let store = MemoryClusterStore::new();
        let workflows = Arc::new(workflows);
        let tokens = Arc::new(tokens);
        let service = ClusterService::new(
            Arc::new(store.clone()),
            workflows.clone(),
            workflows.clone(),
            tokens.clone(),
        )
        .with_read_policy(policy);

        Self {
            store,
            workflows,
            tokens,
            service,
        }
    }
}

pub fn node(host: &str, role: NodeRole) -> NodeCreate {
    NodeCreate {
        host_name: host.to_string(),
        role,
    }
}

/// Bare-metal creation request with the given nodes
pub fn create_request(name: &str, nodes: Vec<NodeCreate>) -> ClusterCreate {
    ClusterCreate {
        name: name.to_string(),
        version: "v1.18.6".to_string(),
        provider: Provider::BareMetal,
        plan: String::new(),
        worker_amount: 0,
        runtime_type: "docker".to_string(),
        docker_storage_dir: "/var/lib/docker".to_string(),
        containerd_storage_dir: "/var/lib/containerd".to_string(),
        network_type: "flannel".to_string(),
        calico_ipv4pool_ipip: String::new(),
        flannel_backend: "vxlan".to_string(),
        kube_pod_subnet: "179.10.0.0/16".to_string(),
        kube_service_subnet: "179.20.0.0/16".to_string(),
        kube_max_pods: 110,
        kube_proxy_mode: "iptables".to_string(),
        ingress_controller_type: "nginx".to_string(),
        architectures: "amd64".to_string(),
        nodes,
    }
}
