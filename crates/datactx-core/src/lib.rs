//! # datactx-core
//!
//! Foundation types shared by every datactx crate.
//!
//! - **Bus events**: [`events::BusEvent`] and [`events::BusTopic`], the messages
//!   carried on the root event bus between the data layer and its front-ends
//! - **Errors**: [`errors::ApiError`] for failures reported by external
//!   collaborators (config execution, filesystem scans)
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other datactx crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod logging;

pub use errors::{ApiError, ApiResult};
pub use events::{BusEvent, BusTopic};
