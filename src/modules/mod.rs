//! Leaf modules and the steps and hooks they share

pub mod etcd;
pub mod greetings;
pub mod hooks;
pub mod loadbalancer;
pub mod precheck;
pub mod steps;

pub use etcd::EtcdPreCheckModule;
pub use greetings::GreetingsModule;
pub use hooks::{LogResultHook, ResultFileHook};
pub use loadbalancer::InternalLoadBalancerModule;
pub use precheck::{NodeCheck, NodePreCheckModule};
pub use steps::{HostSelector, LocalFilesStep, RemoteCommandStep, UploadStep};
