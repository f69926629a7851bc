//! Named loader registry.
//!
//! A [`LoaderRegistry`] owns one [`BatchLoader`] per [`LoaderKind`]. The
//! first request for a kind builds the loader around the supplied batch
//! function; later requests return that same loader and drop whatever batch
//! function they passed. Registration is an identity cache, not a
//! reconfiguration point.

use std::any::{Any, type_name};
use std::fmt;

use dashmap::DashMap;
use tracing::debug;

use crate::batch_fn::{BatchFn, LoadKey, LoadValue};
use crate::errors::RegistryError;
use crate::loader::{BatchLoader, LoaderOptions};

/// Identifies one kind of loader within a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderKind(&'static str);

impl LoaderKind {
    /// Define a loader kind.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Kind name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Type-erased view of a registered loader.
trait ErasedLoader: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clear_all(&self);
    fn cached_len(&self) -> usize;
}

impl<K: LoadKey, V: LoadValue> ErasedLoader for BatchLoader<K, V> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clear_all(&self) {
        BatchLoader::clear_all(self);
    }

    fn cached_len(&self) -> usize {
        BatchLoader::cached_len(self)
    }
}

struct Entry {
    loader: Box<dyn ErasedLoader>,
    types: &'static str,
}

/// Lazily populated store of loaders, one per [`LoaderKind`].
pub struct LoaderRegistry {
    loaders: DashMap<LoaderKind, Entry>,
    options: LoaderOptions,
}

impl LoaderRegistry {
    /// Create an empty registry whose loaders use `options`.
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            loaders: DashMap::new(),
            options,
        }
    }

    /// Return the loader for `kind`, building it around `batch_fn` on first use.
    ///
    /// Fails when `kind` was first registered with different key/value types.
    pub fn get<K, V>(
        &self,
        kind: LoaderKind,
        batch_fn: impl BatchFn<K, V>,
    ) -> Result<BatchLoader<K, V>, RegistryError>
    where
        K: LoadKey,
        V: LoadValue,
    {
        let entry = self.loaders.entry(kind).or_insert_with(|| {
            debug!(%kind, "creating loader");
            Entry {
                loader: Box::new(BatchLoader::with_options(
                    kind.name(),
                    batch_fn,
                    self.options.clone(),
                )),
                types: type_name::<(K, V)>(),
            }
        });

        entry
            .loader
            .as_any()
            .downcast_ref::<BatchLoader<K, V>>()
            .cloned()
            .ok_or_else(|| RegistryError::TypeMismatch {
                kind: kind.name(),
                registered: entry.types,
                requested: type_name::<(K, V)>(),
            })
    }

    /// The existing loader for `kind`, without creating one.
    pub fn lookup<K, V>(&self, kind: LoaderKind) -> Result<Option<BatchLoader<K, V>>, RegistryError>
    where
        K: LoadKey,
        V: LoadValue,
    {
        let Some(entry) = self.loaders.get(&kind) else {
            return Ok(None);
        };
        entry
            .loader
            .as_any()
            .downcast_ref::<BatchLoader<K, V>>()
            .cloned()
            .map(Some)
            .ok_or_else(|| RegistryError::TypeMismatch {
                kind: kind.name(),
                registered: entry.types,
                requested: type_name::<(K, V)>(),
            })
    }

    /// Whether a loader exists for `kind`.
    pub fn contains(&self, kind: LoaderKind) -> bool {
        self.loaders.contains_key(&kind)
    }

    /// Number of loaders created so far.
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no loader has been created yet.
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Empty the cache of the loader for `kind`. Returns whether it exists.
    pub fn clear_kind(&self, kind: LoaderKind) -> bool {
        match self.loaders.get(&kind) {
            Some(entry) => {
                entry.loader.clear_all();
                true
            }
            None => false,
        }
    }

    /// Empty the cache of every loader.
    pub fn clear_all(&self) {
        for entry in &self.loaders {
            entry.loader.clear_all();
        }
    }

    /// Cached entry count per loader kind, sorted by kind.
    pub fn cache_sizes(&self) -> Vec<(LoaderKind, usize)> {
        let mut sizes: Vec<_> = self
            .loaders
            .iter()
            .map(|entry| (*entry.key(), entry.loader.cached_len()))
            .collect();
        sizes.sort_by_key(|(kind, _)| *kind);
        sizes
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.cache_sizes())
            .field("options", &self.options)
            .finish()
    }
}
