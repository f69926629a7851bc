//! The data context facade.
//!
//! One [`DataContext`] lives for the whole lifetime of the embedding
//! application. It holds process-scoped configuration, the injected root bus,
//! and a [`LoaderRegistry`] that hands each data source the loader it asks for
//! by [`LoaderKind`].

use std::sync::Arc;

use datactx_loader::{
    BatchFn, BatchLoader, BatchSchedule, LoadKey, LoadValue, LoaderKind, LoaderOptions,
    LoaderRegistry, Memoized,
};
use datactx_settings::{DataContextSettings, LoaderSettings};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::apis::{DataContextApis, ExternalApis};
use crate::bus::EventBus;
use crate::emitter::DataEmitter;
use crate::errors::Result;
use crate::sources::ProjectDataSource;
use crate::types::ActiveProject;

// =============================================================================
// Config
// =============================================================================

/// Everything needed to construct a [`DataContext`].
#[derive(Clone, Debug)]
pub struct DataContextConfig {
    /// Root event bus shared with the front-ends.
    pub root_bus: Arc<EventBus>,
    /// Options for every loader the context creates.
    pub loader_options: LoaderOptions,
    /// External collaborators.
    pub apis: ExternalApis,
    /// Port the app server listens on, if already assigned.
    pub app_server_port: Option<u16>,
    /// Port the GraphQL server listens on, if already assigned.
    pub gql_server_port: Option<u16>,
}

impl DataContextConfig {
    /// Config with a fresh root bus and default loader options.
    pub fn new(apis: ExternalApis) -> Self {
        Self {
            root_bus: Arc::new(EventBus::new()),
            loader_options: LoaderOptions::default(),
            apis,
            app_server_port: None,
            gql_server_port: None,
        }
    }

    /// Config derived from loaded settings.
    pub fn from_settings(apis: ExternalApis, settings: &DataContextSettings) -> Self {
        Self {
            root_bus: Arc::new(EventBus::with_capacity(settings.event_bus.capacity)),
            loader_options: loader_options(&settings.loader),
            apis,
            app_server_port: settings.app_server_port,
            gql_server_port: settings.gql_server_port,
        }
    }

    /// Use an existing bus instead of the one created by the constructor.
    #[must_use]
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.root_bus = bus;
        self
    }

    /// Override loader options.
    #[must_use]
    pub fn with_loader_options(mut self, options: LoaderOptions) -> Self {
        self.loader_options = options;
        self
    }
}

/// Translate persisted loader settings into loader options.
pub fn loader_options(settings: &LoaderSettings) -> LoaderOptions {
    LoaderOptions {
        max_batch_size: settings.max_batch_size,
        cache: settings.cache,
        schedule: BatchSchedule::from_millis(settings.batch_delay_ms),
    }
}

// =============================================================================
// DataContext
// =============================================================================

#[derive(Debug, Default)]
struct Ports {
    app_server: Option<u16>,
    gql_server: Option<u16>,
}

/// Composition root for the data layer.
pub struct DataContext {
    ports: RwLock<Ports>,
    active_project: RwLock<Option<ActiveProject>>,
    apis: DataContextApis,
    loaders: LoaderRegistry,
    emitter: Memoized<Arc<DataEmitter>>,
}

impl DataContext {
    /// Build a context from `config`.
    pub fn new(config: DataContextConfig) -> Self {
        debug!(
            app_server_port = ?config.app_server_port,
            gql_server_port = ?config.gql_server_port,
            "creating data context"
        );
        Self {
            ports: RwLock::new(Ports {
                app_server: config.app_server_port,
                gql_server: config.gql_server_port,
            }),
            active_project: RwLock::new(None),
            apis: DataContextApis::new(config.root_bus, config.apis),
            loaders: LoaderRegistry::new(config.loader_options),
            emitter: Memoized::new("emitter"),
        }
    }

    // ── ports ───────────────────────────────────────────────────────────────

    /// Record the port the app server listens on.
    pub fn set_app_server_port(&self, port: Option<u16>) {
        info!(?port, "app server port set");
        self.ports.write().app_server = port;
    }

    /// Record the port the GraphQL server listens on.
    pub fn set_gql_server_port(&self, port: Option<u16>) {
        info!(?port, "gql server port set");
        self.ports.write().gql_server = port;
    }

    /// Port of the app server, if assigned.
    pub fn app_server_port(&self) -> Option<u16> {
        self.ports.read().app_server
    }

    /// Port of the GraphQL server, if assigned.
    pub fn gql_server_port(&self) -> Option<u16> {
        self.ports.read().gql_server
    }

    // ── active project ──────────────────────────────────────────────────────

    /// Open `project_root` as the active project, or close it with `None`.
    pub fn set_active_project(&self, project_root: Option<String>) {
        info!(project_root = ?project_root, "active project changed");
        *self.active_project.write() =
            project_root.map(|project_root| ActiveProject { project_root });
    }

    /// The active project, if any.
    pub fn active_project(&self) -> Option<ActiveProject> {
        self.active_project.read().clone()
    }

    // ── collaborators ───────────────────────────────────────────────────────

    /// The boundary surface: root bus and external collaborators.
    pub fn apis(&self) -> &DataContextApis {
        &self.apis
    }

    /// The root event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.apis.bus_api
    }

    /// The emitter bound to the root bus. Always the same instance.
    pub fn emitter(&self) -> Arc<DataEmitter> {
        Arc::clone(
            self.emitter
                .get_or_init(|| Arc::new(DataEmitter::new(Arc::clone(&self.apis.bus_api)))),
        )
    }

    /// Project reads.
    pub fn project(&self) -> ProjectDataSource<'_> {
        ProjectDataSource::new(self)
    }

    // ── loaders ─────────────────────────────────────────────────────────────

    /// The loader for `kind`, built around `batch_fn` on first request.
    ///
    /// Later requests for the same kind return the existing loader and drop
    /// `batch_fn`.
    pub fn loader<K, V>(
        &self,
        kind: LoaderKind,
        batch_fn: impl BatchFn<K, V>,
    ) -> Result<BatchLoader<K, V>>
    where
        K: LoadKey,
        V: LoadValue,
    {
        Ok(self.loaders.get(kind, batch_fn)?)
    }

    /// The loader for `kind` if one was already built.
    pub fn existing_loader<K, V>(&self, kind: LoaderKind) -> Result<Option<BatchLoader<K, V>>>
    where
        K: LoadKey,
        V: LoadValue,
    {
        Ok(self.loaders.lookup(kind)?)
    }

    /// Empty the cache of the loader for `kind`. Returns whether it exists.
    pub fn clear_loader(&self, kind: LoaderKind) -> bool {
        self.loaders.clear_kind(kind)
    }

    /// Empty every loader's cache.
    pub fn clear_all_loaders(&self) {
        debug!(loaders = self.loaders.len(), "clearing all loaders");
        self.loaders.clear_all();
    }

    /// Cached entry count per loader kind.
    pub fn loader_cache_sizes(&self) -> Vec<(LoaderKind, usize)> {
        self.loaders.cache_sizes()
    }
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("ports", &*self.ports.read())
            .field("active_project", &*self.active_project.read())
            .field("loaders", &self.loaders)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
