//! # datactx-loader
//!
//! Batch-coalescing, cached data loading for the data context.
//!
//! - [`BatchLoader`]: single-key `load` calls issued in the same scheduler
//!   turn are merged into one [`BatchFn`] invocation, and resolved values are
//!   memoized per key until [`BatchLoader::clear`] / [`BatchLoader::clear_all`]
//! - [`LoaderRegistry`]: one lazily created loader per [`LoaderKind`] for the
//!   lifetime of the owning context
//! - [`Memoized`]: a compute-once cell for per-instance singleton collaborators
//!
//! Batch functions return key-indexed maps. Fetches that naturally produce
//! positional results adapt through [`positional`].
//!
//! ## Crate Position
//!
//! Depends on nothing else in the workspace. Used by `datactx-context`.

#![deny(unsafe_code)]

pub mod batch_fn;
pub mod errors;
pub mod loader;
pub mod memo;
pub mod registry;

pub use batch_fn::{BatchFn, BoxError, FnBatch, LoadKey, LoadValue, batch_fn, positional};
pub use errors::{LoadError, RegistryError};
pub use loader::{BatchLoader, BatchSchedule, LoaderOptions};
pub use memo::Memoized;
pub use registry::{LoaderKind, LoaderRegistry};
