use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::client::DatasetClient;
use crate::domain::SourceSpec;
use crate::error::ExplorerError;
use crate::store::{CacheMetadata, CacheStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub used_cache: bool,
}

#[derive(Clone)]
pub struct Fetcher<C: DatasetClient> {
    store: CacheStore,
    client: C,
}

impl<C: DatasetClient> Fetcher<C> {
    pub fn new(store: CacheStore, client: C) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn fetch(&self, spec: &SourceSpec, force_refresh: bool) -> Result<Fetched, ExplorerError> {
        if !force_refresh {
            let cached = self.store.read(&spec.cache_file)?;
            if !cached.is_empty() {
                info!(source = %spec.source, bytes = cached.len(), "serving dataset from cache");
                return Ok(Fetched {
                    bytes: cached,
                    used_cache: true,
                });
            }
        }

        info!(source = %spec.source, url = %spec.url, force_refresh, "downloading dataset");
        match self.client.download(&spec.url) {
            Ok(bytes) => {
                match self.persist(spec, &bytes) {
                    Ok(()) => info!(source = %spec.source, bytes = bytes.len(), "dataset cached"),
                    Err(err) => {
                        warn!(source = %spec.source, error = %err, "downloaded dataset could not be cached")
                    }
                }
                Ok(Fetched {
                    bytes,
                    used_cache: false,
                })
            }
            Err(err) => {
                warn!(source = %spec.source, error = %err, "download failed, falling back to cache");
                let cached = self.store.read(&spec.cache_file)?;
                if cached.is_empty() {
                    return Err(ExplorerError::DataUnavailable {
                        dataset: spec.source.display_name().to_string(),
                        cause: err.to_string(),
                    });
                }
                Ok(Fetched {
                    bytes: cached,
                    used_cache: true,
                })
            }
        }
    }

    fn persist(&self, spec: &SourceSpec, bytes: &[u8]) -> Result<(), ExplorerError> {
        self.store.write(&spec.cache_file, bytes)?;
        let metadata = CacheMetadata {
            source: spec.url.clone(),
            cached_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            diagnostic: None,
        };
        self.store.write_metadata(&spec.meta_file, &metadata)
    }

    pub fn metadata(&self, spec: &SourceSpec) -> CacheMetadata {
        self.store.read_metadata(&spec.meta_file, &spec.url)
    }
}
