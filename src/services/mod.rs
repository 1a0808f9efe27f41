pub mod cluster_service;
pub mod locks;
pub mod topology;
pub mod webkubectl;
pub mod workflow;

pub use cluster_service::{BatchOutcome, BatchReport, ClusterService};
pub use locks::NameLocks;
pub use topology::{assign_node_names, generate_kubeadm_token, TopologyBuilder};
pub use webkubectl::{ConnectTokenExchange, WebkubectlClient};
pub use workflow::{ClusterInitializer, ClusterTerminator, RedisWorkflowQueue, WorkflowHandle};
