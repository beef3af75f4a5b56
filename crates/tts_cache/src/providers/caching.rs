//! Caching Provider
//!
//! Wraps any `SpeechBackend` with an on-disk WAV cache keyed by
//! [`cache_key_for`](crate::cache_key::cache_key_for).
//!
//! - With `use_cache`, a readable entry is returned without calling the
//!   wrapped backend. Unreadable entries count as misses.
//! - With `persist_results`, every successful conversion is written back.
//!   The file is written under a temporary name in the cache directory and
//!   renamed into place, so readers never see a partial entry.
//!
//! Failed conversions never touch the cache, and a failed write never fails
//! the conversion.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::cache_key::cache_key_for;
use crate::codec;
use crate::config::TtsConfig;
use crate::error::SpeechError;
use crate::ports::SpeechBackend;
use crate::types::{AudioAsset, ConversionRequest};

/// Speech backend decorator serving and storing results on disk
#[derive(Debug)]
pub struct CachingProvider {
    inner: Box<dyn SpeechBackend>,
    cache_dir: PathBuf,
    use_cache: bool,
    persist_results: bool,
}

impl CachingProvider {
    /// Wrap `inner` using the cache settings of `config`
    #[must_use]
    pub fn new(inner: Box<dyn SpeechBackend>, config: &TtsConfig) -> Self {
        Self {
            inner,
            cache_dir: config.cache_dir(),
            use_cache: config.use_cache,
            persist_results: config.persist_results,
        }
    }

    /// Directory holding the cache entries
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the cache entry for `request`
    #[must_use]
    pub fn cache_path(&self, request: &ConversionRequest) -> PathBuf {
        self.cache_dir.join(cache_key_for(request))
    }

    /// Load a cache entry, treating anything unreadable as a miss
    async fn read_cached(path: &Path) -> Option<AudioAsset> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), "Failed to read cache entry: {e}");
                return None;
            },
        };

        match codec::decode_wav(&bytes) {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!(path = %path.display(), "Ignoring corrupt cache entry: {e}");
                None
            },
        }
    }

    /// Atomically write `asset` to `path`
    async fn persist(path: PathBuf, asset: AudioAsset) -> Result<(), SpeechError> {
        tokio::task::spawn_blocking(move || write_entry(&path, &asset))
            .await
            .map_err(|e| SpeechError::Cache(format!("Cache write task failed: {e}")))?
    }
}

fn write_entry(path: &Path, asset: &AudioAsset) -> Result<(), SpeechError> {
    let bytes = codec::encode_wav(asset)?;
    let dir = path
        .parent()
        .ok_or_else(|| SpeechError::Cache(format!("'{}' has no parent", path.display())))?;

    std::fs::create_dir_all(dir).map_err(|e| {
        SpeechError::Cache(format!("Failed to create '{}': {e}", dir.display()))
    })?;

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| SpeechError::Cache(format!("Failed to create temporary file: {e}")))?;
    file.write_all(&bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| SpeechError::Cache(format!("Failed to write cache entry: {e}")))?;

    // Rename is atomic within a directory; a concurrent writer simply wins or loses
    file.persist(path).map_err(|e| {
        SpeechError::Cache(format!("Failed to publish '{}': {}", path.display(), e.error))
    })?;

    Ok(())
}

#[async_trait]
impl SpeechBackend for CachingProvider {
    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    fn configure(&mut self, config: &TtsConfig) -> Result<(), SpeechError> {
        self.inner.configure(config)?;
        self.cache_dir = config.cache_dir();
        self.use_cache = config.use_cache;
        self.persist_results = config.persist_results;
        Ok(())
    }

    #[instrument(skip(self, request), fields(provider = %request.provider_id))]
    async fn convert(&self, request: &ConversionRequest) -> Result<AudioAsset, SpeechError> {
        let path = self.cache_path(request);

        if self.use_cache {
            if let Some(asset) = Self::read_cached(&path).await {
                debug!(path = %path.display(), "Cache hit");
                return Ok(asset);
            }
            debug!(path = %path.display(), "Cache miss");
        }

        let asset = self.inner.convert(request).await?;

        if self.persist_results {
            match Self::persist(path.clone(), asset.clone()).await {
                Ok(()) => info!(path = %path.display(), "Stored conversion in cache"),
                Err(e) => warn!(path = %path.display(), "Failed to store conversion: {e}"),
            }
        }

        Ok(asset)
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }
}
