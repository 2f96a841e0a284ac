//! Data source abstraction with a read-through snapshot cache

use crate::error::{DataLoadError, Result};
use crate::macro_series::{MacroSeries, load_macro_series};
use crate::metrics::MetricTable;
use crate::text::read_text;
use crate::workbook::{SheetMatcher, extract_metrics};
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::debug;

/// Narrow read interface the analysis pipeline depends on
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Metric table of a segment workbook
    async fn metric_table(&self, path: &Path) -> Result<Arc<MetricTable>>;

    /// Macro indicator series of a CSV file
    async fn macro_series(&self, path: &Path) -> Result<Arc<MacroSeries>>;

    /// Verbatim text of a file
    async fn text(&self, path: &Path) -> Result<Arc<str>>;
}

/// Reads straight from disk on every call
#[derive(Debug, Clone, Default)]
pub struct FileDataSource {
    matcher: SheetMatcher,
}

impl FileDataSource {
    pub fn new(matcher: SheetMatcher) -> Self {
        Self { matcher }
    }
}

/// Run a blocking loader off the async executor
async fn blocking<T, F>(path: &Path, load: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || load(&owned))
        .await
        .map_err(|e| DataLoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn metric_table(&self, path: &Path) -> Result<Arc<MetricTable>> {
        let matcher = self.matcher.clone();
        blocking(path, move |p| extract_metrics(p, &matcher).map(Arc::new)).await
    }

    async fn macro_series(&self, path: &Path) -> Result<Arc<MacroSeries>> {
        blocking(path, |p| load_macro_series(p).map(Arc::new)).await
    }

    async fn text(&self, path: &Path) -> Result<Arc<str>> {
        blocking(path, |p| read_text(p).map(Arc::from)).await
    }
}

/// Cache key: a file as it was at one modification time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl SnapshotKey {
    /// Key for the current state of `path`; `None` when the file cannot be inspected
    pub async fn current(path: &Path) -> Option<Self> {
        let path = tokio::fs::canonicalize(path).await.ok()?;
        let modified = tokio::fs::metadata(&path).await.ok()?.modified().ok();
        Some(Self { path, modified })
    }
}

/// Memoises another source per file snapshot
///
/// Entries expire after the configured lifespan, and a changed modification
/// time produces a new key, so edited files are re-read. Failed loads are not
/// cached.
pub struct CachedDataSource<S> {
    inner: S,
    metrics: RwLock<TimedCache<SnapshotKey, Arc<MetricTable>>>,
    macros: RwLock<TimedCache<SnapshotKey, Arc<MacroSeries>>>,
    texts: RwLock<TimedCache<SnapshotKey, Arc<str>>>,
}

impl<S: DataSource> CachedDataSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            metrics: RwLock::new(TimedCache::with_lifespan(ttl)),
            macros: RwLock::new(TimedCache::with_lifespan(ttl)),
            texts: RwLock::new(TimedCache::with_lifespan(ttl)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of live snapshots across all kinds
    pub async fn len(&self) -> usize {
        self.metrics.read().await.cache_size()
            + self.macros.read().await.cache_size()
            + self.texts.read().await.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every snapshot
    pub async fn clear(&self) {
        self.metrics.write().await.cache_clear();
        self.macros.write().await.cache_clear();
        self.texts.write().await.cache_clear();
    }
}

async fn read_through<T, F, Fut>(
    cache: &RwLock<TimedCache<SnapshotKey, Arc<T>>>,
    path: &Path,
    load: F,
) -> Result<Arc<T>>
where
    T: ?Sized + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<T>>>,
{
    let Some(key) = SnapshotKey::current(path).await else {
        return load().await;
    };

    if let Some(hit) = cache.write().await.cache_get(&key).cloned() {
        debug!(path = %key.path.display(), "snapshot cache hit");
        return Ok(hit);
    }

    debug!(path = %key.path.display(), "snapshot cache miss");
    let value = load().await?;

    let mut cache = cache.write().await;
    cache.flush();
    let outdated: Vec<SnapshotKey> = cache
        .get_store()
        .keys()
        .filter(|old| old.path == key.path)
        .cloned()
        .collect();
    for old in &outdated {
        cache.cache_remove(old);
    }
    let _ = cache.cache_set(key, Arc::clone(&value));
    Ok(value)
}

#[async_trait]
impl<S: DataSource> DataSource for CachedDataSource<S> {
    async fn metric_table(&self, path: &Path) -> Result<Arc<MetricTable>> {
        read_through(&self.metrics, path, || self.inner.metric_table(path)).await
    }

    async fn macro_series(&self, path: &Path) -> Result<Arc<MacroSeries>> {
        read_through(&self.macros, path, || self.inner.macro_series(path)).await
    }

    async fn text(&self, path: &Path) -> Result<Arc<str>> {
        read_through(&self.texts, path, || self.inner.text(path)).await
    }
}
