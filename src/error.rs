//! Error types for cluster lifecycle operations

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClusterError {
    /// Unknown cluster, host, plan or sub-record
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Malformed creation or batch request
    #[error("validation error: {0}")]
    Validation(String),

    /// Store I/O, transport or (de)serialization failure
    #[error("store error: {0}")]
    Store(String),

    /// Provisioning or termination workflow could not be dispatched
    #[error("workflow error: {0}")]
    Workflow(String),

    /// Console token exchange failure
    #[error("token exchange error: {0}")]
    Exchange(String),
}

impl ClusterError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn workflow(msg: impl Into<String>) -> Self {
        Self::Workflow(msg.into())
    }

    pub fn exchange(msg: impl Into<String>) -> Self {
        Self::Exchange(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<redis::RedisError> for ClusterError {
    fn from(err: redis::RedisError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("serialization: {}", err))
    }
}

impl From<reqwest::Error> for ClusterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Exchange(err.to_string())
    }
}

pub type Result<T, E = ClusterError> = std::result::Result<T, E>;
