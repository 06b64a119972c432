pub mod error;
pub mod loader;
pub mod validator;

pub use error::*;
pub use loader::*;
pub use validator::*;
