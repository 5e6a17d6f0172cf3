// Application layer - use cases and orchestration over the repository traits

pub mod error;
mod locks;
pub mod service;

pub use error::*;
pub use service::*;
