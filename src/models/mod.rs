// Models module for the cluster lifecycle service

pub mod cluster;
pub mod request;
pub mod response;
pub mod view;

pub use cluster::*;
pub use request::*;
pub use response::*;
pub use view::*;
