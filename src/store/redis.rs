use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::Connection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::{paginate, ClusterStore};
use crate::error::{ClusterError, Result};
use crate::models::{
    Cluster, ClusterNode, ClusterSecret, ClusterSource, ClusterSpec, ClusterStatus, Host, NodeRole,
    Plan,
};

const CLUSTER_INDEX: &str = "clusters";

/// Cluster row as stored: the owned records live under their own keys.
#[derive(Debug, Serialize, Deserialize)]
struct ClusterRecord {
    id: Uuid,
    name: String,
    source: ClusterSource,
    spec_id: Uuid,
    status_id: Uuid,
    secret_id: Uuid,
    plan_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Cluster> for ClusterRecord {
    fn from(cluster: &Cluster) -> Self {
        Self {
            id: cluster.id,
            name: cluster.name.clone(),
            source: cluster.source,
            spec_id: cluster.spec.id,
            status_id: cluster.status.id,
            secret_id: cluster.secret.id,
            plan_id: cluster.plan_id,
            created_at: cluster.created_at,
            updated_at: cluster.updated_at,
        }
    }
}

impl ClusterRecord {
    fn into_cluster(
        self,
        spec: ClusterSpec,
        status: ClusterStatus,
        secret: ClusterSecret,
        nodes: Vec<ClusterNode>,
    ) -> Cluster {
        Cluster {
            id: self.id,
            name: self.name,
            source: self.source,
            plan_id: self.plan_id,
            spec,
            status,
            secret,
            nodes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Node list as stored under `cluster_nodes:{id}`; a missing key means no nodes.
fn decode_nodes(json: Option<String>) -> Result<Vec<ClusterNode>> {
    match json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

fn first_master_of(cluster_id: Uuid, nodes: Vec<ClusterNode>) -> Result<ClusterNode> {
    nodes
        .into_iter()
        .find(|n| n.role == NodeRole::Master)
        .ok_or_else(|| ClusterError::not_found("master node of cluster", cluster_id.to_string()))
}

/// Index entries whose records are gone are skipped; other failures abort the listing.
fn skip_stale(name: &str, loaded: Result<Cluster>) -> Result<Option<Cluster>> {
    match loaded {
        Ok(cluster) => Ok(Some(cluster)),
        // left behind by an interrupted delete
        Err(ClusterError::NotFound { .. }) => {
            tracing::warn!("Cluster '{}' is indexed but not stored", name);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn cluster_key(name: &str) -> String {
    format!("cluster:{}", name)
}

fn spec_key(id: Uuid) -> String {
    format!("cluster_spec:{}", id)
}

fn status_key(id: Uuid) -> String {
    format!("cluster_status:{}", id)
}

fn secret_key(id: Uuid) -> String {
    format!("cluster_secret:{}", id)
}

fn nodes_key(cluster_id: Uuid) -> String {
    format!("cluster_nodes:{}", cluster_id)
}

fn host_key(name: &str) -> String {
    format!("host:{}", name)
}

fn plan_key(name: &str) -> String {
    format!("plan:{}", name)
}

fn plan_id_key(id: Uuid) -> String {
    format!("plan_id:{}", id)
}

/// Redis-backed store. Every record is a JSON document under its own key.
#[derive(Clone)]
pub struct RedisClusterStore {
    redis: Client,
}

impl RedisClusterStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let redis = Client::open(redis_url)
            .map_err(|e| ClusterError::store(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { redis })
    }

    async fn connection(&self) -> Result<Connection> {
        self.redis
            .get_async_connection()
            .await
            .map_err(|e| ClusterError::store(format!("Failed to connect to Redis: {}", e)))
    }

    async fn fetch<T: DeserializeOwned>(
        conn: &mut Connection,
        key: &str,
        kind: &'static str,
        name: &str,
    ) -> Result<T> {
        let json: Option<String> = conn.get(key).await?;
        let json = json.ok_or_else(|| ClusterError::not_found(kind, name))?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn load(conn: &mut Connection, name: &str) -> Result<Cluster> {
        let record: ClusterRecord = Self::fetch(conn, &cluster_key(name), "cluster", name).await?;

        let spec: ClusterSpec = Self::fetch(
            conn,
            &spec_key(record.spec_id),
            "cluster spec",
            &record.spec_id.to_string(),
        )
        .await?;
        let status: ClusterStatus = Self::fetch(
            conn,
            &status_key(record.status_id),
            "cluster status",
            &record.status_id.to_string(),
        )
        .await?;
        let secret: ClusterSecret = Self::fetch(
            conn,
            &secret_key(record.secret_id),
            "cluster secret",
            &record.secret_id.to_string(),
        )
        .await?;
        let nodes = decode_nodes(conn.get(nodes_key(record.id)).await?)?;

        Ok(record.into_cluster(spec, status, secret, nodes))
    }

    async fn load_all(&self) -> Result<Vec<Cluster>> {
        let mut conn = self.connection().await?;
        let names: Vec<String> = conn.smembers(CLUSTER_INDEX).await?;

        let mut clusters = Vec::with_capacity(names.len());
        for name in names {
            let loaded = Self::load(&mut conn, &name).await;
            if let Some(cluster) = skip_stale(&name, loaded)? {
                clusters.push(cluster);
            }
        }

        clusters.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(clusters)
    }
}

#[async_trait]
impl ClusterStore for RedisClusterStore {
    async fn get(&self, name: &str) -> Result<Cluster> {
        let mut conn = self.connection().await?;
        Self::load(&mut conn, name).await
    }

    async fn list(&self) -> Result<Vec<Cluster>> {
        self.load_all().await
    }

    async fn page(&self, num: usize, size: usize) -> Result<(usize, Vec<Cluster>)> {
        let clusters = self.load_all().await?;
        let total = clusters.len();
        Ok((total, paginate(clusters, num, size)))
    }

    async fn save(&self, cluster: &Cluster) -> Result<()> {
        let record = serde_json::to_string(&ClusterRecord::from(cluster))?;
        let spec = serde_json::to_string(&cluster.spec)?;
        let status = serde_json::to_string(&cluster.status)?;
        let secret = serde_json::to_string(&cluster.secret)?;
        let nodes = serde_json::to_string(&cluster.nodes)?;

        let mut conn = self.connection().await?;

        // MULTI/EXEC: the aggregate lands whole or not at all
        redis::pipe()
            .atomic()
            .set(cluster_key(&cluster.name), record)
            .ignore()
            .set(spec_key(cluster.spec.id), spec)
            .ignore()
            .set(status_key(cluster.status.id), status)
            .ignore()
            .set(secret_key(cluster.secret.id), secret)
            .ignore()
            .set(nodes_key(cluster.id), nodes)
            .ignore()
            .sadd(CLUSTER_INDEX, &cluster.name)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!("Stored cluster '{}' with {} nodes", cluster.name, cluster.nodes.len());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let record: ClusterRecord =
            Self::fetch(&mut conn, &cluster_key(name), "cluster", name).await?;

        redis::pipe()
            .atomic()
            .del(cluster_key(name))
            .ignore()
            .del(spec_key(record.spec_id))
            .ignore()
            .del(status_key(record.status_id))
            .ignore()
            .del(secret_key(record.secret_id))
            .ignore()
            .del(nodes_key(record.id))
            .ignore()
            .srem(CLUSTER_INDEX, name)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!("Removed cluster '{}'", name);
        Ok(())
    }

    async fn get_spec(&self, id: Uuid) -> Result<ClusterSpec> {
        let mut conn = self.connection().await?;
        Self::fetch(&mut conn, &spec_key(id), "cluster spec", &id.to_string()).await
    }

    async fn get_status(&self, id: Uuid) -> Result<ClusterStatus> {
        let mut conn = self.connection().await?;
        Self::fetch(&mut conn, &status_key(id), "cluster status", &id.to_string()).await
    }

    async fn get_secret(&self, id: Uuid) -> Result<ClusterSecret> {
        let mut conn = self.connection().await?;
        Self::fetch(&mut conn, &secret_key(id), "cluster secret", &id.to_string()).await
    }

    async fn first_master(&self, cluster_id: Uuid) -> Result<ClusterNode> {
        let mut conn = self.connection().await?;
        let nodes = decode_nodes(conn.get(nodes_key(cluster_id)).await?)?;
        first_master_of(cluster_id, nodes)
    }

    async fn get_host(&self, name: &str) -> Result<Host> {
        let mut conn = self.connection().await?;
        Self::fetch(&mut conn, &host_key(name), "host", name).await
    }

    async fn get_plan(&self, name: &str) -> Result<Plan> {
        let mut conn = self.connection().await?;
        Self::fetch(&mut conn, &plan_key(name), "plan", name).await
    }

    async fn get_plan_by_id(&self, id: Uuid) -> Result<Plan> {
        let mut conn = self.connection().await?;
        let name: Option<String> = conn.get(plan_id_key(id)).await?;
        let name = name.ok_or_else(|| ClusterError::not_found("plan", id.to_string()))?;
        Self::fetch(&mut conn, &plan_key(&name), "plan", &name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterPhase, Host, Provider};

    fn node(cluster_id: Uuid, name: &str, role: NodeRole, ip: &str) -> ClusterNode {
        ClusterNode {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role,
            cluster_id,
            host: Host {
                id: Uuid::new_v4(),
                name: format!("{}-host", name),
                ip: ip.to_string(),
            },
        }
    }

    fn cluster() -> Cluster {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Cluster {
            id,
            name: "alpha".to_string(),
            source: ClusterSource::Local,
            plan_id: Some(Uuid::new_v4()),
            spec: ClusterSpec {
                id: Uuid::new_v4(),
                runtime_type: "docker".to_string(),
                docker_storage_dir: "/var/lib/docker".to_string(),
                containerd_storage_dir: "/var/lib/containerd".to_string(),
                network_type: "calico".to_string(),
                kube_pod_subnet: "179.10.0.0/16".to_string(),
                kube_service_subnet: "179.20.0.0/16".to_string(),
                version: "v1.18.6".to_string(),
                provider: Provider::Plan,
                flannel_backend: String::new(),
                calico_ipv4pool_ipip: "Always".to_string(),
                kube_max_pods: 110,
                kube_proxy_mode: "iptables".to_string(),
                ingress_controller_type: "nginx".to_string(),
                architectures: "amd64".to_string(),
                kube_api_server_port: 8443,
                kube_router: "10.0.0.5".to_string(),
                lb_kube_apiserver_ip: None,
                worker_amount: 2,
            },
            status: ClusterStatus {
                id: Uuid::new_v4(),
                phase: ClusterPhase::Waiting,
                message: None,
                conditions: Vec::new(),
            },
            secret: ClusterSecret {
                id: Uuid::new_v4(),
                kubeadm_token: "abcdef.0123456789abcdef".to_string(),
                kubernetes_token: String::new(),
            },
            nodes: vec![
                node(id, "alpha-worker-1", NodeRole::Worker, "10.0.0.5"),
                node(id, "alpha-master-1", NodeRole::Master, "10.0.0.6"),
                node(id, "alpha-master-2", NodeRole::Master, "10.0.0.7"),
            ],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn keys_are_namespaced_by_record_kind() {
        let id = Uuid::nil();
        assert_eq!(cluster_key("prod"), "cluster:prod");
        assert_eq!(spec_key(id), format!("cluster_spec:{}", id));
        assert_eq!(nodes_key(id), format!("cluster_nodes:{}", id));
        assert_eq!(plan_id_key(id), format!("plan_id:{}", id));
    }

    #[test]
    fn record_links_owned_records_by_id() {
        let original = cluster();
        let record = ClusterRecord::from(&original);

        assert_eq!(record.spec_id, original.spec.id);
        assert_eq!(record.status_id, original.status.id);
        assert_eq!(record.secret_id, original.secret.id);
        assert_eq!(record.plan_id, original.plan_id);

        // the record itself carries no credentials or spec fields
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains(&original.secret.kubeadm_token));
        assert!(!json.contains("v1.18.6"));
    }

    #[test]
    fn stored_record_reassembles_into_the_same_cluster() {
        let original = cluster();
        let json = serde_json::to_string(&ClusterRecord::from(&original)).unwrap();
        let record: ClusterRecord = serde_json::from_str(&json).unwrap();
        let nodes = decode_nodes(Some(serde_json::to_string(&original.nodes).unwrap())).unwrap();

        let loaded = record.into_cluster(
            original.spec.clone(),
            original.status.clone(),
            original.secret.clone(),
            nodes,
        );
        assert_eq!(loaded, original);
    }

    #[test]
    fn missing_node_list_decodes_as_empty() {
        assert!(decode_nodes(None).unwrap().is_empty());
        assert!(decode_nodes(Some("not json".to_string())).is_err());
    }

    #[test]
    fn first_master_follows_stored_node_order() {
        let c = cluster();
        let master = first_master_of(c.id, c.nodes.clone()).unwrap();
        assert_eq!(master.name, "alpha-master-1");
        assert_eq!(master.host.ip, "10.0.0.6");

        let workers: Vec<ClusterNode> = c
            .nodes
            .into_iter()
            .filter(|n| n.role == NodeRole::Worker)
            .collect();
        assert!(first_master_of(c.id, workers).unwrap_err().is_not_found());
    }

    #[test]
    fn stale_index_entries_are_skipped() {
        let stale = skip_stale("ghost", Err(ClusterError::not_found("cluster", "ghost")));
        assert!(stale.unwrap().is_none());

        let loaded = skip_stale("alpha", Ok(cluster())).unwrap();
        assert_eq!(loaded.map(|c| c.name), Some("alpha".to_string()));

        let down = skip_stale("alpha", Err(ClusterError::store("connection reset")));
        assert!(down.is_err());
    }

    #[test]
    fn client_rejects_malformed_url() {
        assert!(RedisClusterStore::new("not a url").is_err());
    }
}
