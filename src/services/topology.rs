//! Assembly of a new cluster aggregate from a creation request
//!
//! Everything here works on an in-memory [`Cluster`]; nothing is written to the
//! store until the caller saves the finished aggregate.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClusterError, Result};
use crate::models::{
    Cluster, ClusterCreate, ClusterNode, ClusterPhase, ClusterSecret, ClusterSource, ClusterSpec,
    ClusterStatus, NodeCreate, NodeRole,
};
use crate::store::ClusterStore;

/// Display names for the requested nodes, in request order.
///
/// Each role counts from 1 independently: `master-1`, `worker-1`, `master-2`, ...
pub fn assign_node_names(nodes: &[NodeCreate]) -> Vec<String> {
    let mut counters: HashMap<NodeRole, usize> = HashMap::new();
    nodes
        .iter()
        .map(|node| {
            let n = counters.entry(node.role).or_insert(0);
            *n += 1;
            format!("{}-{}", node.role, n)
        })
        .collect()
}

/// Random kubeadm join token in the `[a-z0-9]{6}.[a-z0-9]{16}` format.
pub fn generate_kubeadm_token() -> String {
    let mut rng = rand::thread_rng();
    let mut part = |len: usize| -> String {
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .map(|c| char::from(c).to_ascii_lowercase())
            .take(len)
            .collect()
    };
    let id = part(6);
    let secret = part(16);
    format!("{}.{}", id, secret)
}

pub struct TopologyBuilder<'a> {
    store: &'a dyn ClusterStore,
    api_server_port: u16,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(store: &'a dyn ClusterStore, api_server_port: u16) -> Self {
        Self {
            store,
            api_server_port,
        }
    }

    /// Resolve plan and hosts and build the aggregate, ready to be saved.
    pub async fn build(&self, request: &ClusterCreate) -> Result<Cluster> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ClusterError::validation("cluster name must not be empty"));
        }

        let cluster_id = Uuid::new_v4();
        let now = Utc::now();

        let mut spec = ClusterSpec {
            id: Uuid::new_v4(),
            runtime_type: request.runtime_type.clone(),
            docker_storage_dir: request.docker_storage_dir.clone(),
            containerd_storage_dir: request.containerd_storage_dir.clone(),
            network_type: request.network_type.clone(),
            kube_pod_subnet: request.kube_pod_subnet.clone(),
            kube_service_subnet: request.kube_service_subnet.clone(),
            version: request.version.clone(),
            provider: request.provider,
            flannel_backend: request.flannel_backend.clone(),
            calico_ipv4pool_ipip: request.calico_ipv4pool_ipip.clone(),
            kube_max_pods: request.kube_max_pods,
            kube_proxy_mode: request.kube_proxy_mode.clone(),
            ingress_controller_type: request.ingress_controller_type.clone(),
            architectures: request.architectures.clone(),
            kube_api_server_port: self.api_server_port,
            kube_router: String::new(),
            lb_kube_apiserver_ip: None,
            worker_amount: 0,
        };

        let status = ClusterStatus {
            id: Uuid::new_v4(),
            phase: ClusterPhase::Waiting,
            message: None,
            conditions: Vec::new(),
        };

        let secret = ClusterSecret {
            id: Uuid::new_v4(),
            kubeadm_token: generate_kubeadm_token(),
            kubernetes_token: String::new(),
        };

        let mut plan_id = None;
        if request.provider.requires_plan() {
            spec.worker_amount = request.worker_amount;
            let plan = self.store.get_plan(&request.plan).await?;
            debug!("Cluster '{}' sized by plan '{}'", name, plan.name);
            plan_id = Some(plan.id);
        }

        let names = assign_node_names(&request.nodes);
        let mut nodes = Vec::with_capacity(request.nodes.len());
        for (descriptor, node_name) in request.nodes.iter().zip(names) {
            let host = self.store.get_host(&descriptor.host_name).await?;
            nodes.push(ClusterNode {
                id: Uuid::new_v4(),
                name: node_name,
                role: descriptor.role,
                cluster_id,
                host,
            });
        }

        // Router follows the first requested node, whatever its role.
        if let Some(first) = nodes.first() {
            spec.kube_router = first.host.ip.clone();
        }

        Ok(Cluster {
            id: cluster_id,
            name: name.to_string(),
            source: ClusterSource::Local,
            plan_id,
            spec,
            status,
            secret,
            nodes,
            created_at: now,
            updated_at: now,
        })
    }
}
