use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use fpt_backup::BackupCatalog;
use fpt_backup::layout;
use fpt_config::FptConfig;
use fpt_core::report::{Reporter, TracingReporter};
use fpt_notify::{Pipeline, TransportChain};
use fpt_store::{RemoteStore, RestStore};

/// Shared resources for one command run.
///
/// The store client is built on first use so commands that never touch the
/// store (listing snapshots, `serve` without credentials) do not require
/// store credentials.
pub struct AppContext {
    pub config: FptConfig,
    pub project_root: PathBuf,
    pub reporter: Arc<dyn Reporter>,
    store: Option<Arc<dyn RemoteStore>>,
    transports: Option<TransportChain>,
}

impl AppContext {
    pub fn new(project_root: PathBuf, config: FptConfig) -> Self {
        Self {
            config,
            project_root,
            reporter: TracingReporter::new(),
            store: None,
            transports: None,
        }
    }

    /// Use `store` instead of connecting to the configured one.
    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `chain` instead of the transports named by the email settings.
    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_transports(mut self, chain: TransportChain) -> Self {
        self.transports = Some(chain);
        self
    }

    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The remote store, connecting on first call.
    ///
    /// Missing credentials abort here, before any remote work begins.
    pub fn store(&mut self) -> anyhow::Result<Arc<dyn RemoteStore>> {
        if let Some(store) = &self.store {
            return Ok(Arc::clone(store));
        }
        let config = self.config.require_store()?;
        let store: Arc<dyn RemoteStore> =
            Arc::new(RestStore::new(config).context("failed to build store client")?);
        tracing::debug!(url = %config.url, key = ?config.key_kind(), "connected store client");
        self.store = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Backup directory, resolved against the project root when relative.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        resolve(&self.project_root, &self.config.backup.dir)
    }

    /// Catalog over the snapshots under `root`.
    pub fn catalog_at(&self, root: &Path) -> anyhow::Result<BackupCatalog> {
        let objects = layout::open_local(root)
            .with_context(|| format!("failed to open backup directory {}", root.display()))?;
        Ok(BackupCatalog::new(objects, Arc::clone(&self.reporter)))
    }

    /// Catalog over the configured backup directory.
    pub fn catalog(&self) -> anyhow::Result<BackupCatalog> {
        self.catalog_at(&self.backup_dir())
    }

    pub fn transports(&self) -> anyhow::Result<TransportChain> {
        match &self.transports {
            Some(chain) => Ok(chain.clone()),
            None => TransportChain::from_config(&self.config.email)
                .context("failed to build email transports"),
        }
    }

    /// Notification pipeline over the store and email transports.
    pub fn pipeline(&mut self) -> anyhow::Result<Pipeline> {
        let store = self.store()?;
        Ok(Pipeline::new(
            store,
            self.transports()?,
            &self.config.email,
            self.config.notify.clone(),
            Arc::clone(&self.reporter),
        ))
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
