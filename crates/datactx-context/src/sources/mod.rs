//! Data sources: domain reads composed from context loaders and external
//! collaborators.

pub mod project;

pub use project::{PROJECT_CONFIG, ProjectDataSource};
