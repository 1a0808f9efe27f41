//! Dispatch of the external provisioning and termination workflows
//!
//! Both workflows run outside this service. Dispatching one yields a
//! [`WorkflowHandle`] the caller may await, poll, or simply drop.

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::error::{ClusterError, Result};
use crate::models::Cluster;

pub const INIT_QUEUE: &str = "cluster:init:queue";
pub const TERMINAL_QUEUE: &str = "cluster:terminal:queue";

/// Handle to a dispatched workflow.
///
/// A handle either wraps a task running in this process or marks a job that
/// was handed off to an external worker, in which case there is nothing left
/// to wait for.
#[derive(Debug)]
pub struct WorkflowHandle {
    cluster: String,
    task: Option<JoinHandle<Result<()>>>,
}

impl WorkflowHandle {
    /// Job handed to an external worker; completion is not observable here.
    pub fn dispatched(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            task: None,
        }
    }

    /// Run the workflow as a background task on the current runtime.
    pub fn spawn<F>(cluster: impl Into<String>, workflow: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            cluster: cluster.into(),
            task: Some(tokio::spawn(workflow)),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the workflow to finish. Dispatched jobs resolve immediately.
    pub async fn wait(self) -> Result<()> {
        match self.task {
            Some(task) => task.await.map_err(|e| {
                ClusterError::workflow(format!("workflow for '{}' aborted: {}", self.cluster, e))
            })?,
            None => Ok(()),
        }
    }
}

/// Starts node bootstrap for a freshly stored cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterInitializer: Send + Sync {
    async fn init(&self, cluster_name: &str) -> Result<WorkflowHandle>;
}

/// Starts teardown of a provisioned cluster; the workflow removes the record when done.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterTerminator: Send + Sync {
    async fn terminate(&self, cluster: &Cluster) -> Result<WorkflowHandle>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowJob {
    pub job_id: Uuid,
    pub cluster_name: String,
    pub cluster_id: Option<Uuid>,
    pub requested_at: chrono::DateTime<Utc>,
}

impl WorkflowJob {
    fn new(cluster_name: &str, cluster_id: Option<Uuid>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            cluster_name: cluster_name.to_string(),
            cluster_id,
            requested_at: Utc::now(),
        }
    }
}

/// Hands workflow jobs to external workers through Redis lists.
#[derive(Clone)]
pub struct RedisWorkflowQueue {
    redis: Client,
}

impl RedisWorkflowQueue {
    pub fn new(redis_url: &str) -> Result<Self> {
        let redis = Client::open(redis_url)
            .map_err(|e| ClusterError::workflow(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { redis })
    }

    async fn enqueue(&self, queue: &str, job: &WorkflowJob) -> Result<()> {
        let payload = serde_json::to_string(job)
            .map_err(|e| ClusterError::workflow(format!("Failed to serialize job: {}", e)))?;

        let mut conn = self
            .redis
            .get_async_connection()
            .await
            .map_err(|e| ClusterError::workflow(format!("Failed to connect to Redis: {}", e)))?;

        let _: () = conn
            .rpush(queue, payload)
            .await
            .map_err(|e| {
                ClusterError::workflow(format!("Failed to enqueue job on {}: {}", queue, e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl ClusterInitializer for RedisWorkflowQueue {
    async fn init(&self, cluster_name: &str) -> Result<WorkflowHandle> {
        let job = WorkflowJob::new(cluster_name, None);
        self.enqueue(INIT_QUEUE, &job).await?;
        info!("Queued provisioning job {} for cluster '{}'", job.job_id, cluster_name);
        Ok(WorkflowHandle::dispatched(cluster_name))
    }
}

#[async_trait]
impl ClusterTerminator for RedisWorkflowQueue {
    async fn terminate(&self, cluster: &Cluster) -> Result<WorkflowHandle> {
        let job = WorkflowJob::new(&cluster.name, Some(cluster.id));
        self.enqueue(TERMINAL_QUEUE, &job).await?;
        info!("Queued termination job {} for cluster '{}'", job.job_id, cluster.name);
        Ok(WorkflowHandle::dispatched(cluster.name.as_str()))
    }
}
