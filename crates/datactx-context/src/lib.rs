//! # datactx-context
//!
//! The data context: a facade that the GUI's API layer holds for its whole
//! lifetime. It owns
//!
//! - process-scoped configuration (assigned server ports, the active project)
//! - the root [`EventBus`](bus::EventBus), injected at construction
//! - a [`LoaderRegistry`](datactx_loader::LoaderRegistry) handing out one
//!   batch loader per loader kind
//! - memoized collaborators such as the [`DataEmitter`](emitter::DataEmitter)
//!
//! Domain reads live in data sources ([`sources::ProjectDataSource`]) that
//! borrow the context and call into external collaborators through the
//! traits in [`apis`].
//!
//! ## Crate Position
//!
//! Top of the workspace. Depends on `datactx-core`, `datactx-loader`, and
//! `datactx-settings`.

#![deny(unsafe_code)]

pub mod apis;
pub mod bus;
pub mod context;
pub mod emitter;
pub mod errors;
pub mod sources;
pub mod types;

#[cfg(test)]
mod testing;

pub use apis::{
    DataContextApis, DependencyScanner, ExternalApis, FileApi, PackageJsonScanner, ProjectApi,
    StorybookApi,
};
pub use bus::{EventBus, TopicReceiver};
pub use context::{DataContext, DataContextConfig};
pub use emitter::DataEmitter;
pub use errors::{ContextError, Result};
pub use sources::ProjectDataSource;
