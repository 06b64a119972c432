pub mod cache;
pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod host;
pub mod ssh;

pub use cache::*;
pub use config::*;
pub use connector::*;
pub use context::*;
pub use error::*;
pub use host::*;
pub use ssh::*;
