//! Cluster lifecycle coordinator
//!
//! Entry point for every public cluster operation: creation, endpoint
//! resolution, read projections and (batch) decommissioning.
//!
//! Reads and decommissioning may degrade instead of failing; see the notes on
//! [`ClusterService::list`], [`ClusterService::page`],
//! [`ClusterService::get_webkubectl_token`] and [`ClusterService::batch`].

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, ReadPolicy};
use crate::error::{ClusterError, Result};
use crate::models::{
    BatchItemResult, BatchOperation, ClusterBatch, ClusterCreate, ClusterPage, ClusterSecret,
    ClusterSpec, ClusterStatus, ClusterView, Endpoint, Plan, WebkubectlToken,
    DEFAULT_API_SERVER_PORT,
};
use crate::services::locks::NameLocks;
use crate::services::topology::TopologyBuilder;
use crate::services::webkubectl::ConnectTokenExchange;
use crate::services::workflow::{ClusterInitializer, ClusterTerminator, WorkflowHandle};
use crate::store::ClusterStore;

/// What happened to one cluster of a batch.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Record removed directly from the store
    Deleted,
    /// Direct delete failed; the batch carried on
    DeleteFailed(ClusterError),
    /// Termination workflow dispatched; the record stays until it completes
    Terminating(WorkflowHandle),
    /// Termination could not be dispatched; the batch carried on
    TerminationFailed(ClusterError),
}

impl BatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Deleted => "deleted",
            BatchOutcome::DeleteFailed(_) => "delete_failed",
            BatchOutcome::Terminating(_) => "terminating",
            BatchOutcome::TerminationFailed(_) => "termination_failed",
        }
    }

    pub fn error(&self) -> Option<&ClusterError> {
        match self {
            BatchOutcome::DeleteFailed(e) | BatchOutcome::TerminationFailed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<(String, BatchOutcome)>,
}

impl BatchReport {
    pub fn outcome(&self, name: &str) -> Option<&BatchOutcome> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    /// True when some item failed without aborting the batch.
    pub fn has_absorbed_failures(&self) -> bool {
        self.items.iter().any(|(_, o)| o.error().is_some())
    }

    pub fn results(&self) -> Vec<BatchItemResult> {
        self.items
            .iter()
            .map(|(name, outcome)| BatchItemResult {
                name: name.clone(),
                outcome: outcome.as_str().to_string(),
                error: outcome.error().map(|e| e.to_string()),
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct ClusterService {
    store: Arc<dyn ClusterStore>,
    initializer: Arc<dyn ClusterInitializer>,
    terminator: Arc<dyn ClusterTerminator>,
    tokens: Arc<dyn ConnectTokenExchange>,
    read_policy: ReadPolicy,
    api_server_port: u16,
    locks: NameLocks,
}

impl ClusterService {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        initializer: Arc<dyn ClusterInitializer>,
        terminator: Arc<dyn ClusterTerminator>,
        tokens: Arc<dyn ConnectTokenExchange>,
    ) -> Self {
        Self {
            store,
            initializer,
            terminator,
            tokens,
            read_policy: ReadPolicy::default(),
            api_server_port: DEFAULT_API_SERVER_PORT,
            locks: NameLocks::new(),
        }
    }

    pub fn with_config(self, config: &Config) -> Self {
        self.with_read_policy(config.read_policy)
            .with_api_server_port(config.default_api_server_port)
    }

    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn with_api_server_port(mut self, port: u16) -> Self {
        self.api_server_port = port;
        self
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    pub async fn get(&self, name: &str) -> Result<ClusterView> {
        let cluster = self.store.get(name).await?;
        Ok(ClusterView::from(cluster))
    }

    /// All clusters.
    ///
    /// Under [`ReadPolicy::BestEffort`] a store failure yields an empty list
    /// and `Ok`, so an empty result does not prove the store is healthy.
    pub async fn list(&self) -> Result<Vec<ClusterView>> {
        match self.store.list().await {
            Ok(clusters) => Ok(clusters.into_iter().map(ClusterView::from).collect()),
            Err(e) if self.read_policy.is_best_effort() => {
                warn!("Listing clusters failed, returning empty result: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// One page of clusters, `num` starting at 1.
    ///
    /// Same degradation as [`ClusterService::list`]: an empty page with a
    /// zero total under [`ReadPolicy::BestEffort`].
    pub async fn page(&self, num: usize, size: usize) -> Result<ClusterPage> {
        match self.store.page(num, size).await {
            Ok((total, clusters)) => Ok(ClusterPage {
                items: clusters.into_iter().map(ClusterView::from).collect(),
                total,
            }),
            Err(e) if self.read_policy.is_best_effort() => {
                warn!("Paging clusters failed, returning empty page: {}", e);
                Ok(ClusterPage::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_status(&self, name: &str) -> Result<ClusterStatus> {
        let cluster = self.store.get(name).await?;
        self.store.get_status(cluster.status.id).await
    }

    pub async fn get_secrets(&self, name: &str) -> Result<ClusterSecret> {
        let cluster = self.store.get(name).await?;
        self.store.get_secret(cluster.secret.id).await
    }

    pub async fn get_spec(&self, name: &str) -> Result<ClusterSpec> {
        let cluster = self.store.get(name).await?;
        self.store.get_spec(cluster.spec.id).await
    }

    /// Sizing plan of the cluster; `None` for bare-metal clusters.
    pub async fn get_plan(&self, name: &str) -> Result<Option<Plan>> {
        let cluster = self.store.get(name).await?;
        match cluster.plan_id {
            Some(id) => Ok(Some(self.store.get_plan_by_id(id).await?)),
            None => Ok(None),
        }
    }

    /// Address clients use to reach the Kubernetes API server.
    ///
    /// A configured load balancer always wins; otherwise the host of the
    /// first master node is used.
    pub async fn get_api_server_endpoint(&self, name: &str) -> Result<Endpoint> {
        let cluster = self.store.get(name).await?;
        let port = Some(cluster.spec.kube_api_server_port);

        if let Some(lb) = cluster.spec.load_balancer() {
            return Ok(Endpoint {
                address: lb.to_string(),
                port,
            });
        }

        let master = self.store.first_master(cluster.id).await?;
        Ok(Endpoint {
            address: master.host.ip,
            port,
        })
    }

    pub async fn get_router_endpoint(&self, name: &str) -> Result<Endpoint> {
        let cluster = self.store.get(name).await?;
        Ok(Endpoint {
            address: cluster.spec.kube_router,
            port: None,
        })
    }

    /// Short-lived token for the web console.
    ///
    /// Endpoint resolution errors always propagate. Under
    /// [`ReadPolicy::BestEffort`] a failed secret lookup or token exchange is
    /// logged and an empty token is returned with `Ok`.
    pub async fn get_webkubectl_token(&self, name: &str) -> Result<WebkubectlToken> {
        let endpoint = self.get_api_server_endpoint(name).await?;
        let address = format!(
            "https://{}:{}",
            endpoint.address,
            endpoint.port.unwrap_or(self.api_server_port)
        );

        let secret = match self.get_secrets(name).await {
            Ok(secret) => secret,
            Err(e) if self.read_policy.is_best_effort() => {
                warn!("No secret for cluster '{}', console token left empty: {}", name, e);
                return Ok(WebkubectlToken::default());
            }
            Err(e) => return Err(e),
        };

        match self
            .tokens
            .get_connect_token(name, &address, &secret.kubernetes_token)
            .await
        {
            Ok(token) => Ok(WebkubectlToken { token }),
            Err(e) if self.read_policy.is_best_effort() => {
                warn!("Console token exchange for '{}' failed: {}", name, e);
                Ok(WebkubectlToken::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Remove a cluster record directly, without any teardown.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.locks.lock(name).await;
        self.store.delete(name).await?;
        info!("Deleted cluster '{}'", name);
        Ok(())
    }

    /// Build, store and start provisioning a new cluster.
    ///
    /// Nothing is stored unless every plan and host resolves. If provisioning
    /// cannot be dispatched the error is returned and the cluster stays stored
    /// in the `Waiting` phase.
    pub async fn create(&self, request: ClusterCreate) -> Result<WorkflowHandle> {
        let _guard = self.locks.lock(request.name.trim()).await;

        match self.store.get(request.name.trim()).await {
            Ok(_) => {
                return Err(ClusterError::validation(format!(
                    "cluster '{}' already exists",
                    request.name.trim()
                )))
            }
            Err(ClusterError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let cluster = TopologyBuilder::new(self.store.as_ref(), self.api_server_port)
            .build(&request)
            .await?;

        self.store.save(&cluster).await?;
        info!(
            "Created cluster '{}' ({} provider, {} nodes)",
            cluster.name,
            cluster.spec.provider,
            cluster.nodes.len()
        );

        match self.initializer.init(&cluster.name).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                error!("Provisioning for cluster '{}' was not started: {}", cluster.name, e);
                Err(e)
            }
        }
    }

    /// Apply a batch operation to clusters in list order.
    ///
    /// A cluster that cannot be loaded aborts the remaining items with its
    /// error. Delete and termination failures do not abort the batch and never
    /// surface as `Err`; they are recorded in the returned report.
    pub async fn batch(&self, batch: ClusterBatch) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        match batch.operation {
            BatchOperation::Delete => {
                for item in &batch.items {
                    let _guard = self.locks.lock(&item.name).await;
                    let view = self.get(&item.name).await?;

                    let outcome = if view.status.is_provisioned() {
                        match self.terminator.terminate(&view.cluster).await {
                            Ok(handle) => {
                                info!("Terminating cluster '{}' ({})", item.name, view.status);
                                BatchOutcome::Terminating(handle)
                            }
                            Err(e) => {
                                warn!("Termination of cluster '{}' not started: {}", item.name, e);
                                BatchOutcome::TerminationFailed(e)
                            }
                        }
                    } else {
                        match self.store.delete(&item.name).await {
                            Ok(()) => {
                                info!("Deleted cluster '{}' ({})", item.name, view.status);
                                BatchOutcome::Deleted
                            }
                            Err(e) => {
                                warn!("Deleting cluster '{}' failed: {}", item.name, e);
                                BatchOutcome::DeleteFailed(e)
                            }
                        }
                    };

                    report.items.push((item.name.clone(), outcome));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchItem, ClusterPhase, NodeCreate, NodeRole, Provider};
    use crate::services::workflow::{MockClusterInitializer, MockClusterTerminator};
    use crate::store::MemoryClusterStore;
    use async_trait::async_trait;

    struct NoTokens;

    #[async_trait]
    impl ConnectTokenExchange for NoTokens {
        async fn get_connect_token(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Err(ClusterError::exchange("unreachable"))
        }
    }

    fn request(name: &str) -> ClusterCreate {
        ClusterCreate {
            name: name.to_string(),
            version: "v1.18.6".to_string(),
            provider: Provider::BareMetal,
            plan: String::new(),
            worker_amount: 0,
            runtime_type: "docker".to_string(),
            docker_storage_dir: "/var/lib/docker".to_string(),
            containerd_storage_dir: String::new(),
            network_type: "calico".to_string(),
            calico_ipv4pool_ipip: "Always".to_string(),
            flannel_backend: String::new(),
            kube_pod_subnet: "179.10.0.0/16".to_string(),
            kube_service_subnet: "179.20.0.0/16".to_string(),
            kube_max_pods: 110,
            kube_proxy_mode: "iptables".to_string(),
            ingress_controller_type: "nginx".to_string(),
            architectures: "amd64".to_string(),
            nodes: vec![NodeCreate {
                host_name: "host-1".to_string(),
                role: NodeRole::Master,
            }],
        }
    }

    fn service(
        store: &MemoryClusterStore,
        init: MockClusterInitializer,
        term: MockClusterTerminator,
    ) -> ClusterService {
        ClusterService::new(
            Arc::new(store.clone()),
            Arc::new(init),
            Arc::new(term),
            Arc::new(NoTokens),
        )
    }

    #[tokio::test]
    async fn provisioning_failure_keeps_waiting_record() {
        let store = MemoryClusterStore::new();
        store.add_host("host-1", "10.0.0.1");

        let mut init = MockClusterInitializer::new();
        init.expect_init()
            .times(1)
            .returning(|_| Err(ClusterError::workflow("queue down")));

        let svc = service(&store, init, MockClusterTerminator::new());
        let err = svc.create(request("alpha")).await.unwrap_err();
        assert!(matches!(err, ClusterError::Workflow(_)));

        let view = svc.get("alpha").await.unwrap();
        assert_eq!(view.status, ClusterPhase::Waiting);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_before_provisioning() {
        let store = MemoryClusterStore::new();
        store.add_host("host-1", "10.0.0.1");

        let mut init = MockClusterInitializer::new();
        init.expect_init()
            .times(1)
            .returning(|name| Ok(WorkflowHandle::dispatched(name)));

        let svc = service(&store, init, MockClusterTerminator::new());
        svc.create(request("alpha")).await.unwrap();

        let err = svc.create(request("alpha")).await.unwrap_err();
        assert!(matches!(err, ClusterError::Validation(_)));
        assert_eq!(store.cluster_count(), 1);
    }

    #[tokio::test]
    async fn termination_failure_is_absorbed_by_batch() {
        let store = MemoryClusterStore::new();
        store.add_host("host-1", "10.0.0.1");

        let mut init = MockClusterInitializer::new();
        init.expect_init()
            .returning(|name| Ok(WorkflowHandle::dispatched(name)));
        let mut term = MockClusterTerminator::new();
        term.expect_terminate()
            .times(1)
            .returning(|_| Err(ClusterError::workflow("terminal service offline")));

        let svc = service(&store, init, term);
        svc.create(request("alpha")).await.unwrap();
        store.set_phase("alpha", ClusterPhase::Running).unwrap();

        let report = svc
            .batch(ClusterBatch {
                operation: BatchOperation::Delete,
                items: vec![BatchItem::from("alpha")],
            })
            .await
            .unwrap();

        assert!(matches!(
            report.outcome("alpha"),
            Some(BatchOutcome::TerminationFailed(_))
        ));
        assert!(report.has_absorbed_failures());
        assert!(store.contains("alpha"));
    }
}
