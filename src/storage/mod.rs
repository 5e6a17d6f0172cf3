mod memory;
mod repository;
mod traits;

pub use memory::*;
pub use repository::*;
pub use traits::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
