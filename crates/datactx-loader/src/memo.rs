//! Compute-once accessors.
//!
//! [`Memoized`] is a field that holds the result of an expensive,
//! side-effecting constructor. The first call to [`Memoized::get_or_init`]
//! runs the constructor; every later call on the same owner returns the same
//! stored value without running it again, even if its inputs have since
//! changed. Owners that need fresh values must be rebuilt.
//!
//! ```ignore
//! struct Context {
//!     emitter: Memoized<Arc<DataEmitter>>,
//! }
//!
//! impl Context {
//!     fn emitter(&self) -> Arc<DataEmitter> {
//!         Arc::clone(self.emitter.get_or_init(|| Arc::new(DataEmitter::new(..))))
//!     }
//! }
//! ```

use std::fmt;
use std::sync::OnceLock;

use tracing::debug;

/// A lazily initialized, never-invalidated value owned by one instance.
pub struct Memoized<T> {
    name: &'static str,
    cell: OnceLock<T>,
}

impl<T> Memoized<T> {
    /// Empty cell. `name` identifies the accessor in logs.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceLock::new(),
        }
    }

    /// Return the stored value, running `init` on first access.
    ///
    /// Concurrent first accesses block until one `init` completes; `init`
    /// runs exactly once.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(|| {
            debug!(accessor = self.name, "initializing memoized value");
            init()
        })
    }

    /// The stored value, if initialized.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Whether the value has been computed.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Accessor name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: fmt::Debug> fmt::Debug for Memoized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("value", &self.cell.get())
            .finish()
    }
}
