//! Disk-backed media cache.
//!
//! Maps remote media URIs to local file paths. Entries are written once and
//! never evicted within a session; the on-disk store is keyed by a stable
//! sha256 encoding of the URI so it also survives across sessions.
//!
//! Concurrency contract: at most one in-flight download per distinct URI.
//! Concurrent [`MediaCache::ensure`] calls for the same key join the
//! download already in flight and all resolve to the same local path. A
//! failed download leaves no entry behind, so later callers simply retry;
//! transient network failures are never cached as negative results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sha2::Digest;
use tokio::sync::watch;

use crate::error::{EngineError, Result};
use crate::fetch::MediaFetcher;

/// Shared outcome of one download, fanned out to every waiter.
type DownloadOutcome = Option<std::result::Result<PathBuf, String>>;

pub struct MediaCache {
    root: PathBuf,
    fetcher: Arc<dyn MediaFetcher>,
    /// URIs with a local copy on disk.
    ready: DashMap<String, PathBuf>,
    /// URIs with a download in flight; joiners subscribe to the slot.
    in_flight: DashMap<String, watch::Sender<DownloadOutcome>>,
}

impl std::fmt::Debug for MediaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCache")
            .field("root", &self.root)
            .field("ready", &self.ready.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl MediaCache {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            fetcher,
            ready: DashMap::new(),
            in_flight: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Synchronous cache check. Falls back to probing the on-disk store so a
    /// previous session's downloads are found without re-fetching. `None` is
    /// not a failure; the renderer then streams from the remote URI.
    pub fn resolve(&self, uri: &str) -> Option<PathBuf> {
        if let Some(path) = self.ready.get(uri) {
            return Some(path.clone());
        }
        let path = self.local_path_for(uri);
        if path.is_file() {
            self.ready.insert(uri.to_string(), path.clone());
            return Some(path);
        }
        None
    }

    /// Download-if-absent. Returns the local path once the media is on disk.
    pub async fn ensure(self: &Arc<Self>, uri: &str) -> Result<PathBuf> {
        loop {
            if let Some(path) = self.resolve(uri) {
                return Ok(path);
            }

            let mut rx = match self.in_flight.entry(uri.to_string()) {
                Entry::Occupied(slot) => slot.get().subscribe(),
                Entry::Vacant(slot) => {
                    let (tx, rx) = watch::channel(None);
                    slot.insert(tx);
                    self.spawn_download(uri.to_string());
                    rx
                }
            };

            match rx.wait_for(|outcome| outcome.is_some()).await {
                Ok(outcome) => {
                    let result = outcome
                        .clone()
                        .unwrap_or_else(|| Err("download slot closed empty".to_string()));
                    return result.map_err(EngineError::TransientNetwork);
                }
                // Slot dropped without publishing; re-check and retry.
                Err(_) => continue,
            }
        }
    }

    /// Downloads run detached so an abandoned caller (viewer dismissed) does
    /// not cancel work other callers may be waiting on; the result is cached
    /// for later reuse either way.
    fn spawn_download(self: &Arc<Self>, uri: String) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let result = cache.download(&uri).await;
            let shared = match &result {
                Ok(path) => Ok(path.clone()),
                Err(err) => Err(err.to_string()),
            };
            if let Ok(path) = result {
                cache.ready.insert(uri.clone(), path);
            }
            // Remove the slot before publishing so a new request started
            // after a failure becomes a fresh leader instead of joining a
            // finished download.
            if let Some((_, tx)) = cache.in_flight.remove(&uri) {
                let _ = tx.send(Some(shared));
            }
        });
    }

    async fn download(&self, uri: &str) -> Result<PathBuf> {
        let bytes = self.fetcher.fetch(uri).await.inspect_err(|err| {
            log::warn!("[MediaCache] download failed uri={} err={}", uri, err);
        })?;

        let path = self.local_path_for(uri);
        write_atomic(&path, &bytes).await?;
        log::debug!(
            "[MediaCache] cached uri={} bytes={} path={}",
            uri,
            bytes.len(),
            path.display()
        );
        Ok(path)
    }

    /// Stable on-disk name: sha256 of the URI, keeping the remote extension
    /// so media frameworks can sniff the container from the path.
    fn local_path_for(&self, uri: &str) -> PathBuf {
        let digest = sha2::Sha256::digest(uri.as_bytes());
        let mut name = hex_encode(&digest);
        if let Some(ext) = remote_extension(uri) {
            name.push('.');
            name.push_str(&ext);
        }
        self.root.join(name)
    }
}

fn remote_extension(uri: &str) -> Option<String> {
    let path = url::Url::parse(uri).ok().map(|u| u.path().to_string())?;
    let ext = Path::new(&path).extension()?.to_str()?;
    if ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_ascii_lowercase())
    } else {
        None
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("media"),
        nanos
    ));
    tokio::fs::write(&tmp_path, bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
