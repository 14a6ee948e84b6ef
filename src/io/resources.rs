use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use tempfile::TempPath;

use crate::model::card::{AssetKind, ResourceStatus};

/// Error type for resource loading
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported resource type: {0}")]
    Unsupported(String),
    #[error("no remote loader configured for {0}")]
    RemoteUnsupported(String),
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A resolved resource on local disk.
#[derive(Debug)]
pub struct Asset {
    pub kind: AssetKind,
    local_path: PathBuf,
    /// Downloaded copies are deleted when the asset is dropped.
    temp: Option<TempPath>,
}

impl Asset {
    pub fn local(kind: AssetKind, path: impl Into<PathBuf>) -> Self {
        Asset {
            kind,
            local_path: path.into(),
            temp: None,
        }
    }

    /// An asset backed by a temporary download.
    pub fn downloaded(kind: AssetKind, temp: TempPath) -> Self {
        Asset {
            kind,
            local_path: temp.to_path_buf(),
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.local_path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

/// Loads an image or sound given a path or URL. Runs on the worker thread.
pub trait AssetLoader: Send + Sync {
    fn load(&self, source: &str) -> Result<Asset, AssetError>;
}

/// Loader for local files; classifies by extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAssetLoader;

impl AssetLoader for FileAssetLoader {
    fn load(&self, source: &str) -> Result<Asset, AssetError> {
        if is_remote(source) {
            return Err(AssetError::RemoteUnsupported(source.to_string()));
        }
        let path = PathBuf::from(source);
        let meta = std::fs::metadata(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.clone()),
            _ => AssetError::Io {
                path: path.clone(),
                source: e,
            },
        })?;
        if !meta.is_file() {
            return Err(AssetError::NotFound(path));
        }
        let kind = classify(source).ok_or_else(|| AssetError::Unsupported(source.to_string()))?;
        Ok(Asset::local(kind, path))
    }
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Asset kind implied by a path's extension.
pub fn classify(source: &str) -> Option<AssetKind> {
    let trimmed = source.split(['?', '#']).next().unwrap_or(source);
    let ext = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "tga" | "webp" => Some(AssetKind::Image),
        "gif" => Some(AssetKind::Gif),
        "wav" | "ogg" | "mp3" | "flac" => Some(AssetKind::Audio),
        _ => None,
    }
}

struct Job {
    source: String,
    generation: u64,
}

struct Done {
    source: String,
    generation: u64,
    result: Result<Asset, AssetError>,
}

struct Entry {
    status: ResourceStatus,
    asset: Option<Asset>,
    refs: usize,
    generation: u64,
}

/// Reference-counted resource cache keyed by source path or URL.
///
/// Loads run on a single worker thread; finished loads come back through a
/// queue that the owner drains once per tick with [`ResourceCache::drain`].
/// The entry map is only touched from the owning thread.
pub struct ResourceCache {
    loader: Arc<dyn AssetLoader>,
    entries: HashMap<String, Entry>,
    jobs: Option<Sender<Job>>,
    results_tx: Sender<Done>,
    results_rx: Receiver<Done>,
    next_generation: u64,
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.entries.len())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        ResourceCache::new(Arc::new(FileAssetLoader))
    }
}

impl ResourceCache {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        ResourceCache {
            loader,
            entries: HashMap::new(),
            jobs: None,
            results_tx,
            results_rx,
            next_generation: 0,
        }
    }

    /// Take a reference to `source`, starting a load if it is not cached.
    pub fn request(&mut self, source: &str) -> ResourceStatus {
        if let Some(entry) = self.entries.get_mut(source) {
            entry.refs += 1;
            return entry.status.clone();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let status = match self.submit(Job {
            source: source.to_string(),
            generation,
        }) {
            Ok(()) => ResourceStatus::Loading,
            Err(msg) => ResourceStatus::Failed(msg),
        };
        self.entries.insert(
            source.to_string(),
            Entry {
                status: status.clone(),
                asset: None,
                refs: 1,
                generation,
            },
        );
        status
    }

    fn submit(&mut self, job: Job) -> Result<(), String> {
        if self.jobs.is_none() {
            let (tx, rx) = mpsc::channel::<Job>();
            let loader = Arc::clone(&self.loader);
            let results = self.results_tx.clone();
            thread::Builder::new()
                .name("gridplan-assets".to_string())
                .spawn(move || {
                    for job in rx {
                        let result = loader.load(&job.source);
                        let done = Done {
                            source: job.source,
                            generation: job.generation,
                            result,
                        };
                        if results.send(done).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| format!("could not start asset worker: {e}"))?;
            self.jobs = Some(tx);
        }
        match &self.jobs {
            Some(tx) => tx
                .send(job)
                .map_err(|_| "asset worker stopped".to_string()),
            None => Err("asset worker stopped".to_string()),
        }
    }

    /// Drop one reference; the entry (and any temporary download) goes away
    /// with the last one. An in-flight load for it is discarded on arrival.
    pub fn release(&mut self, source: &str) {
        if let Some(entry) = self.entries.get_mut(source) {
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs == 0 {
                self.entries.remove(source);
            }
        }
    }

    /// Abandon an in-flight load regardless of references. Returns true if
    /// something was loading.
    pub fn cancel(&mut self, source: &str) -> bool {
        match self.entries.get(source) {
            Some(entry) if entry.status == ResourceStatus::Loading => {
                self.entries.remove(source);
                true
            }
            _ => false,
        }
    }

    /// Apply finished loads. Returns `(source, new status)` for each entry
    /// that changed so cards showing a placeholder can be updated.
    pub fn drain(&mut self) -> Vec<(String, ResourceStatus)> {
        let mut updates = Vec::new();
        loop {
            let done = match self.results_rx.try_recv() {
                Ok(done) => done,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            let Some(entry) = self.entries.get_mut(&done.source) else {
                continue;
            };
            if entry.generation != done.generation {
                continue;
            }
            match done.result {
                Ok(asset) => {
                    entry.status = ResourceStatus::Ready(asset.kind);
                    entry.asset = Some(asset);
                }
                Err(e) => {
                    log::warn!("could not load resource {}: {}", done.source, e);
                    entry.status = ResourceStatus::Failed(e.to_string());
                }
            }
            updates.push((done.source, entry.status.clone()));
        }
        updates
    }

    pub fn status(&self, source: &str) -> Option<&ResourceStatus> {
        self.entries.get(source).map(|e| &e.status)
    }

    pub fn asset(&self, source: &str) -> Option<&Asset> {
        self.entries.get(source).and_then(|e| e.asset.as_ref())
    }

    pub fn refs(&self, source: &str) -> usize {
        self.entries.get(source).map(|e| e.refs).unwrap_or(0)
    }

    /// Loads still in flight.
    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.status == ResourceStatus::Loading)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything, deleting temporary downloads.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
