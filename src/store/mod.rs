//! Persistence for cluster aggregates and the records they reference
//!
//! A cluster is written and removed as one unit: its spec, status, secret and
//! node list never exist in the store without the cluster record itself.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Cluster, ClusterNode, ClusterSecret, ClusterSpec, ClusterStatus, Host, Plan};

pub mod memory;
pub mod redis;

pub use self::memory::MemoryClusterStore;
pub use self::redis::RedisClusterStore;

/// Key-by-identifier store the coordinator reads from and writes to.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Load the full aggregate for a cluster name
    async fn get(&self, name: &str) -> Result<Cluster>;

    /// All clusters, oldest first
    async fn list(&self) -> Result<Vec<Cluster>>;

    /// One page of clusters (`num` starts at 1) and the total count
    async fn page(&self, num: usize, size: usize) -> Result<(usize, Vec<Cluster>)>;

    /// Persist the aggregate atomically: every record or none
    async fn save(&self, cluster: &Cluster) -> Result<()>;

    /// Remove the cluster and every record it owns
    async fn delete(&self, name: &str) -> Result<()>;

    async fn get_spec(&self, id: Uuid) -> Result<ClusterSpec>;

    async fn get_status(&self, id: Uuid) -> Result<ClusterStatus>;

    async fn get_secret(&self, id: Uuid) -> Result<ClusterSecret>;

    /// First master-role node of a cluster, in stored order
    async fn first_master(&self, cluster_id: Uuid) -> Result<ClusterNode>;

    async fn get_host(&self, name: &str) -> Result<Host>;

    async fn get_plan(&self, name: &str) -> Result<Plan>;

    async fn get_plan_by_id(&self, id: Uuid) -> Result<Plan>;
}

/// Slice out page `num` (1-based) of `size` items.
pub(crate) fn paginate<T>(items: Vec<T>, num: usize, size: usize) -> Vec<T> {
    if size == 0 {
        return Vec::new();
    }
    let skip = num.saturating_sub(1).saturating_mul(size);
    items.into_iter().skip(skip).take(size).collect()
}
