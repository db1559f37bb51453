//! Repository traits and error types.

pub mod error;
pub mod incidents;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use incidents::IncidentRepository;
