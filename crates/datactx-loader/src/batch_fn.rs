//! The batch-fetch seam.
//!
//! A [`BatchFn`] receives every distinct key of one coalescing window and
//! returns a map from key to value. A key missing from the map fails only
//! that key's load; an `Err` fails every key in the batch.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;

/// Boxed error returned by batch functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Requirements on loader keys.
pub trait LoadKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> LoadKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Requirements on loaded values. Wrap expensive values in `Arc` so every
/// waiter shares one allocation.
pub trait LoadValue: Clone + Send + Sync + 'static {}

impl<T> LoadValue for T where T: Clone + Send + Sync + 'static {}

/// Fetches the values for one batch of keys.
///
/// Called at most once per key per window. Fetching may have side effects
/// (executing a project's config file, scanning the filesystem), so the
/// loader guarantees no key is fetched twice while a result for it is
/// pending or cached.
#[async_trait]
pub trait BatchFn<K: LoadKey, V: LoadValue>: Send + Sync + 'static {
    /// Load values for `keys`, in first-requested order, each key once.
    async fn load(&self, keys: Vec<K>) -> Result<HashMap<K, V>, BoxError>;
}

/// [`BatchFn`] backed by an async closure. Build with [`batch_fn`].
pub struct FnBatch<F>(F);

/// Wrap an async closure as a [`BatchFn`].
pub fn batch_fn<F>(f: F) -> FnBatch<F> {
    FnBatch(f)
}

#[async_trait]
impl<K, V, F, Fut> BatchFn<K, V> for FnBatch<F>
where
    K: LoadKey,
    V: LoadValue,
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HashMap<K, V>, BoxError>> + Send + 'static,
{
    async fn load(&self, keys: Vec<K>) -> Result<HashMap<K, V>, BoxError> {
        (self.0)(keys).await
    }
}

/// Align positional fetch results to their keys.
///
/// Fails the whole batch when the lengths differ, since no value can be
/// attributed to a key with confidence.
pub fn positional<K: LoadKey, V>(keys: Vec<K>, values: Vec<V>) -> Result<HashMap<K, V>, BoxError> {
    if keys.len() != values.len() {
        return Err(format!(
            "batch returned {} values for {} keys",
            values.len(),
            keys.len()
        )
        .into());
    }
    Ok(keys.into_iter().zip(values).collect())
}
