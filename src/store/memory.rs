use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{paginate, ClusterStore};
use crate::error::{ClusterError, Result};
use crate::models::{
    Cluster, ClusterNode, ClusterPhase, ClusterSecret, ClusterSpec, ClusterStatus,
    ClusterStatusCondition, Host, Plan,
};

#[derive(Default)]
struct MemoryState {
    clusters: DashMap<String, Cluster>,
    hosts: DashMap<String, Host>,
    plans: DashMap<String, Plan>,
}

/// Process-local store used for local runs and tests.
#[derive(Clone, Default)]
pub struct MemoryClusterStore {
    state: Arc<MemoryState>,
}

impl MemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host so creation requests can reference it by name.
    pub fn add_host(&self, name: &str, ip: &str) -> Host {
        let host = Host {
            id: Uuid::new_v4(),
            name: name.to_string(),
            ip: ip.to_string(),
        };
        self.state.hosts.insert(host.name.clone(), host.clone());
        host
    }

    pub fn add_plan(&self, name: &str) -> Plan {
        let plan = Plan {
            id: Uuid::new_v4(),
            name: name.to_string(),
            region: None,
            zone: None,
            deploy_template: None,
        };
        self.state.plans.insert(plan.name.clone(), plan.clone());
        plan
    }

    /// Overwrite a stored cluster's phase, the way an external workflow would.
    pub fn set_phase(&self, name: &str, phase: ClusterPhase) -> Result<()> {
        let mut cluster = self
            .state
            .clusters
            .get_mut(name)
            .ok_or_else(|| ClusterError::not_found("cluster", name))?;
        cluster.status.phase = phase;
        Ok(())
    }

    /// Record a provisioning step against a stored cluster.
    pub fn push_condition(&self, name: &str, condition: ClusterStatusCondition) -> Result<()> {
        let mut cluster = self
            .state
            .clusters
            .get_mut(name)
            .ok_or_else(|| ClusterError::not_found("cluster", name))?;
        cluster.status.conditions.push(condition);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.clusters.contains_key(name)
    }

    pub fn cluster_count(&self) -> usize {
        self.state.clusters.len()
    }

    fn find_by<T>(
        &self,
        kind: &'static str,
        id: Uuid,
        f: impl Fn(&Cluster) -> Option<T>,
    ) -> Result<T> {
        self.state
            .clusters
            .iter()
            .find_map(|entry| f(entry.value()))
            .ok_or_else(|| ClusterError::not_found(kind, id.to_string()))
    }

    fn sorted(&self) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = self
            .state
            .clusters
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        clusters.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        clusters
    }
}

#[async_trait]
impl ClusterStore for MemoryClusterStore {
    async fn get(&self, name: &str) -> Result<Cluster> {
        self.state
            .clusters
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ClusterError::not_found("cluster", name))
    }

    async fn list(&self) -> Result<Vec<Cluster>> {
        Ok(self.sorted())
    }

    async fn page(&self, num: usize, size: usize) -> Result<(usize, Vec<Cluster>)> {
        let clusters = self.sorted();
        let total = clusters.len();
        Ok((total, paginate(clusters, num, size)))
    }

    async fn save(&self, cluster: &Cluster) -> Result<()> {
        self.state
            .clusters
            .insert(cluster.name.clone(), cluster.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.state
            .clusters
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClusterError::not_found("cluster", name))
    }

    async fn get_spec(&self, id: Uuid) -> Result<ClusterSpec> {
        self.find_by("cluster spec", id, |c| (c.spec.id == id).then(|| c.spec.clone()))
    }

    async fn get_status(&self, id: Uuid) -> Result<ClusterStatus> {
        self.find_by("cluster status", id, |c| (c.status.id == id).then(|| c.status.clone()))
    }

    async fn get_secret(&self, id: Uuid) -> Result<ClusterSecret> {
        self.find_by("cluster secret", id, |c| (c.secret.id == id).then(|| c.secret.clone()))
    }

    async fn first_master(&self, cluster_id: Uuid) -> Result<ClusterNode> {
        self.find_by("master node of cluster", cluster_id, |c| {
            if c.id == cluster_id {
                c.first_master().cloned()
            } else {
                None
            }
        })
    }

    async fn get_host(&self, name: &str) -> Result<Host> {
        self.state
            .hosts
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ClusterError::not_found("host", name))
    }

    async fn get_plan(&self, name: &str) -> Result<Plan> {
        self.state
            .plans
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ClusterError::not_found("plan", name))
    }

    async fn get_plan_by_id(&self, id: Uuid) -> Result<Plan> {
        self.state
            .plans
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ClusterError::not_found("plan", id.to_string()))
    }
}
