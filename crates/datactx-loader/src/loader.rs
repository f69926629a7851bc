//! Batch-coalescing, cached loader.
//!
//! A [`BatchLoader`] turns single-key `load` calls into batched fetches:
//!
//! 1. `load(k)` returns the cached future for `k` when one exists, pending or
//!    settled. Every caller of the same key shares one result.
//! 2. Otherwise a new entry is cached and `k` joins the open window. The first
//!    key of a window spawns a dispatch task.
//! 3. The dispatch task waits for the window to close ([`BatchSchedule`]),
//!    takes the window, and calls the [`BatchFn`] once per chunk of distinct
//!    keys, in first-requested order.
//! 4. Each waiter is settled from the returned map. Failed entries are evicted
//!    so the next `load` fetches again.
//!
//! A dispatch task dropped by its runtime (shutdown) fails its waiters with
//! [`LoadError::Dropped`] and evicts their entries. A loader outliving one
//! runtime keeps working on the next.
//!
//! Keys loaded before the calling task yields are guaranteed to share a
//! window on a current-thread runtime. On a multi-threaded runtime the
//! dispatch task may close the window earlier, which splits batches but
//! never duplicates a fetch.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, Either, Ready, Shared, join_all, ready};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, instrument, trace};

use crate::batch_fn::{BatchFn, LoadKey, LoadValue};
use crate::errors::LoadError;

// =============================================================================
// Options
// =============================================================================

/// When an open window closes and dispatches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchSchedule {
    /// Close after the scheduler has run every task that was ready when the
    /// first key arrived.
    #[default]
    NextTurn,
    /// Keep the window open for a fixed duration.
    Delay(Duration),
}

impl BatchSchedule {
    /// `NextTurn` for zero, `Delay` otherwise.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::NextTurn
        } else {
            Self::Delay(Duration::from_millis(ms))
        }
    }
}

/// Loader behavior.
#[derive(Clone, Debug)]
pub struct LoaderOptions {
    /// Upper bound on keys per [`BatchFn`] call. `None` fetches a window whole.
    pub max_batch_size: Option<usize>,
    /// Memoize settled values across windows. Keys are still coalesced
    /// within one window when disabled.
    pub cache: bool,
    /// When windows close.
    pub schedule: BatchSchedule,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            cache: true,
            schedule: BatchSchedule::NextTurn,
        }
    }
}

impl LoaderOptions {
    /// Split windows into chunks of at most `size` keys.
    #[must_use]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    /// Disable cross-window memoization.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Set the window schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: BatchSchedule) -> Self {
        self.schedule = schedule;
        self
    }
}

// =============================================================================
// State
// =============================================================================

type Settled<V> = Result<V, LoadError>;
type SharedLoad<V> = Shared<BoxFuture<'static, Settled<V>>>;

/// Future returned by [`BatchLoader::load`].
pub type LoadFuture<V> = Either<SharedLoad<V>, Ready<Settled<V>>>;

struct CacheEntry<V> {
    /// Distinguishes this entry from a later one for the same key.
    id: u64,
    result: SharedLoad<V>,
}

struct Waiter<K, V> {
    key: K,
    id: u64,
    tx: oneshot::Sender<Settled<V>>,
}

struct State<K, V> {
    cache: HashMap<K, CacheEntry<V>>,
    window: Vec<Waiter<K, V>>,
    dispatch_scheduled: bool,
    next_id: u64,
}

impl<K: LoadKey, V> State<K, V> {
    fn evict_if_current(&mut self, key: &K, id: u64) {
        if self.cache.get(key).is_some_and(|entry| entry.id == id) {
            let _ = self.cache.remove(key);
        }
    }
}

struct Inner<K: LoadKey, V: LoadValue> {
    name: String,
    batch_fn: Arc<dyn BatchFn<K, V>>,
    options: LoaderOptions,
    state: Mutex<State<K, V>>,
    dispatches: AtomicU64,
}

// =============================================================================
// BatchLoader
// =============================================================================

/// Coalesces and caches loads of `V` by `K`.
///
/// Cloning is cheap and every clone shares the same cache and window.
pub struct BatchLoader<K: LoadKey, V: LoadValue> {
    inner: Arc<Inner<K, V>>,
}

impl<K: LoadKey, V: LoadValue> Clone for BatchLoader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: LoadKey, V: LoadValue> fmt::Debug for BatchLoader<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BatchLoader")
            .field("name", &self.inner.name)
            .field("cached", &state.cache.len())
            .field("pending", &state.window.len())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl<K: LoadKey, V: LoadValue> BatchLoader<K, V> {
    /// Create a loader with default options.
    pub fn new(name: impl Into<String>, batch_fn: impl BatchFn<K, V>) -> Self {
        Self::with_options(name, batch_fn, LoaderOptions::default())
    }

    /// Create a loader with explicit options.
    pub fn with_options(
        name: impl Into<String>,
        batch_fn: impl BatchFn<K, V>,
        options: LoaderOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                batch_fn: Arc::new(batch_fn),
                options,
                state: Mutex::new(State {
                    cache: HashMap::new(),
                    window: Vec::new(),
                    dispatch_scheduled: false,
                    next_id: 0,
                }),
                dispatches: AtomicU64::new(0),
            }),
        }
    }

    /// Loader name, used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Options this loader was built with.
    pub fn options(&self) -> &LoaderOptions {
        &self.inner.options
    }

    /// Load the value for `key`.
    ///
    /// The key is registered immediately, before the returned future is
    /// polled, so loads issued back to back share one window.
    pub fn load(&self, key: K) -> LoadFuture<V> {
        let mut state = self.inner.state.lock();

        if let Some(entry) = state.cache.get(&key) {
            trace!(loader = %self.inner.name, ?key, "cache hit");
            return Either::Left(entry.result.clone());
        }

        let Ok(handle) = Handle::try_current() else {
            return Either::Right(ready(Err(LoadError::NoRuntime)));
        };

        let (tx, rx) = oneshot::channel();
        let id = state.next_id;
        state.next_id += 1;

        let owner = Arc::downgrade(&self.inner);
        let owned_key = key.clone();
        let result = rx
            .map(move |received| {
                received.unwrap_or_else(|_| {
                    if let Some(inner) = owner.upgrade() {
                        inner.state.lock().evict_if_current(&owned_key, id);
                    }
                    Err(LoadError::Dropped)
                })
            })
            .boxed()
            .shared();
        let _ = state.cache.insert(
            key.clone(),
            CacheEntry {
                id,
                result: result.clone(),
            },
        );
        trace!(loader = %self.inner.name, ?key, "cache miss, joining window");
        state.window.push(Waiter { key, id, tx });

        if !state.dispatch_scheduled {
            state.dispatch_scheduled = true;
            drop(state);
            let _ = handle.spawn(WindowGuard::new(Arc::clone(&self.inner)).dispatch());
        }

        Either::Left(result)
    }

    /// Load several keys in one window. Results follow the order of `keys`.
    pub fn load_many(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> impl Future<Output = Vec<Result<V, LoadError>>> + Send + 'static {
        let loads: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();
        join_all(loads)
    }

    /// Remove `key` from the cache.
    ///
    /// A key still waiting in an undispatched window is withdrawn from it:
    /// its waiters fail with [`LoadError::Cleared`] and it is not fetched.
    /// No effect when the key is unknown.
    pub fn clear(&self, key: &K) {
        let mut state = self.inner.state.lock();
        let _ = state.cache.remove(key);

        let (withdrawn, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.window)
            .into_iter()
            .partition(|waiter| &waiter.key == key);
        state.window = kept;
        drop(state);

        debug!(loader = %self.inner.name, ?key, withdrawn = withdrawn.len(), "cleared key");
        for waiter in withdrawn {
            let _ = waiter.tx.send(Err(LoadError::Cleared {
                key: format!("{:?}", waiter.key),
            }));
        }
    }

    /// Empty the cache.
    ///
    /// Loads already handed out still settle as scheduled; only future
    /// `load` calls are affected.
    pub fn clear_all(&self) {
        let mut state = self.inner.state.lock();
        let count = state.cache.len();
        state.cache.clear();
        drop(state);
        debug!(loader = %self.inner.name, count, "cleared all keys");
    }

    /// Seed the cache with a value without fetching.
    ///
    /// Returns `false`, leaving the cache untouched, when the key is already
    /// cached or caching is disabled.
    pub fn prime(&self, key: K, value: V) -> bool {
        if !self.inner.options.cache {
            return false;
        }
        let mut state = self.inner.state.lock();
        if state.cache.contains_key(&key) {
            return false;
        }
        let id = state.next_id;
        state.next_id += 1;
        let result = ready(Ok(value)).boxed().shared();
        let _ = state.cache.insert(key, CacheEntry { id, result });
        true
    }

    /// Number of cached entries, pending or settled.
    pub fn cached_len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    /// Number of keys waiting in the open window.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().window.len()
    }

    /// Number of [`BatchFn`] calls made so far.
    pub fn dispatch_count(&self) -> u64 {
        self.inner.dispatches.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Owns the right to close the open window.
///
/// Built before the dispatch task is spawned, so dropping the task unpolled
/// (its runtime shut down) still releases the window: every waiter fails
/// with [`LoadError::Dropped`], its entry is evicted, and the next `load`
/// schedules a fresh dispatch.
struct WindowGuard<K: LoadKey, V: LoadValue> {
    inner: Arc<Inner<K, V>>,
    armed: bool,
}

impl<K: LoadKey, V: LoadValue> WindowGuard<K, V> {
    fn new(inner: Arc<Inner<K, V>>) -> Self {
        Self { inner, armed: true }
    }

    async fn dispatch(self) {
        match self.inner.options.schedule {
            BatchSchedule::NextTurn => tokio::task::yield_now().await,
            BatchSchedule::Delay(delay) => tokio::time::sleep(delay).await,
        }

        let inner = Arc::clone(&self.inner);
        let window = self.take();
        if window.is_empty() {
            trace!(loader = %inner.name, "window emptied before dispatch");
            return;
        }

        let mut groups = group_by_key(window);
        let chunk_size = inner
            .options
            .max_batch_size
            .filter(|size| *size > 0)
            .unwrap_or(groups.len());

        while !groups.is_empty() {
            let rest = groups.split_off(chunk_size.min(groups.len()));
            let chunk = std::mem::replace(&mut groups, rest);
            inner.fetch(chunk).await;
        }
    }

    /// Close the window and hand its waiters to the caller.
    fn take(mut self) -> Vec<Waiter<K, V>> {
        self.armed = false;
        let mut state = self.inner.state.lock();
        state.dispatch_scheduled = false;
        let window = std::mem::take(&mut state.window);
        if !self.inner.options.cache {
            for waiter in &window {
                state.evict_if_current(&waiter.key, waiter.id);
            }
        }
        window
    }
}

impl<K: LoadKey, V: LoadValue> Drop for WindowGuard<K, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let window = {
            let mut state = self.inner.state.lock();
            state.dispatch_scheduled = false;
            let window = std::mem::take(&mut state.window);
            for waiter in &window {
                state.evict_if_current(&waiter.key, waiter.id);
            }
            window
        };
        debug!(
            loader = %self.inner.name,
            keys = window.len(),
            "dispatch dropped before window closed"
        );
        for waiter in window {
            let _ = waiter.tx.send(Err(LoadError::Dropped));
        }
    }
}

impl<K: LoadKey, V: LoadValue> Inner<K, V> {
    #[instrument(skip_all, fields(loader = %self.name, keys = chunk.len()))]
    async fn fetch(&self, chunk: Vec<(K, Vec<Waiter<K, V>>)>) {
        let keys: Vec<K> = chunk.iter().map(|(key, _)| key.clone()).collect();
        let _ = self.dispatches.fetch_add(1, Ordering::Relaxed);
        debug!("dispatching batch");

        let outcome = AssertUnwindSafe(self.batch_fn.load(keys))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err("batch function panicked".into()));

        match outcome {
            Ok(values) => {
                for (key, waiters) in chunk {
                    let result = values.get(&key).cloned().ok_or_else(|| LoadError::KeyNotFound {
                        key: format!("{key:?}"),
                    });
                    self.settle(waiters, &result);
                }
            }
            Err(err) => {
                let shared: Arc<dyn std::error::Error + Send + Sync> = Arc::from(err);
                debug!(error = %shared, "batch fetch failed");
                let result = Err(LoadError::BatchFetch(shared));
                for (_, waiters) in chunk {
                    self.settle(waiters, &result);
                }
            }
        }
    }

    fn settle(&self, waiters: Vec<Waiter<K, V>>, result: &Settled<V>) {
        if result.is_err() {
            let mut state = self.state.lock();
            for waiter in &waiters {
                state.evict_if_current(&waiter.key, waiter.id);
            }
        }
        for waiter in waiters {
            let _ = waiter.tx.send(result.clone());
        }
    }
}

/// Group waiters by key, keeping first-requested order.
///
/// A key can appear twice in one window only when `clear_all` ran between
/// the two loads; both waiters share a single fetch.
fn group_by_key<K: LoadKey, V>(window: Vec<Waiter<K, V>>) -> Vec<(K, Vec<Waiter<K, V>>)> {
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<Waiter<K, V>>)> = Vec::new();
    for waiter in window {
        if let Some(&at) = index.get(&waiter.key) {
            groups[at].1.push(waiter);
        } else {
            let _ = index.insert(waiter.key.clone(), groups.len());
            groups.push((waiter.key.clone(), vec![waiter]));
        }
    }
    groups
}

// =============================================================================
// Tests
// =============================================================================
