use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::client::DatasetClient;
use crate::config::ResolvedConfig;
use crate::domain::{DatasetSource, EntityRecord, Metric, PollutionRecord, SourceSpec};
use crate::error::ExplorerError;
use crate::fetcher::{Fetched, Fetcher};
use crate::owid::parse_owid_csv;
use crate::store::{CacheMetadata, CacheStore};
use crate::view::{Dashboard, Panel, Selection, select, validate_percentile};
use crate::worldbank::parse_pm25_json;

#[derive(Debug, Clone, Serialize)]
pub struct EmissionsData {
    pub rows: Vec<EntityRecord>,
    pub meta: CacheMetadata,
    pub used_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollutionData {
    pub rows: Vec<PollutionRecord>,
    pub meta: CacheMetadata,
    pub used_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub source: String,
    pub url: String,
    pub action: String,
    pub rows: usize,
    pub cached_at: Option<String>,
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub items: Vec<FetchItemResult>,
}

#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub metric: Metric,
    pub search: String,
    pub country: Option<String>,
    pub percentile: u8,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowResult {
    pub metric: Metric,
    pub matches: usize,
    pub panel: Option<Panel>,
    pub message: Option<String>,
    pub metadata: Vec<CacheMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResult {
    pub cache_dir: String,
    pub sources: Vec<CacheMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    emissions: Option<EmissionsData>,
    pollution: Option<PollutionData>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_emissions(&self) -> bool {
        self.emissions.is_some()
    }

    pub fn has_pollution(&self) -> bool {
        self.pollution.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Clone)]
pub struct App<C: DatasetClient> {
    fetcher: Fetcher<C>,
    owid: SourceSpec,
    pm25: SourceSpec,
}

impl<C: DatasetClient> App<C> {
    pub fn new(config: &ResolvedConfig, client: C) -> Self {
        let store = CacheStore::new(config.cache_dir.clone());
        Self {
            fetcher: Fetcher::new(store, client),
            owid: config.owid.clone(),
            pm25: config.pm25.clone(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher<C> {
        &self.fetcher
    }

    pub fn source(&self, source: DatasetSource) -> &SourceSpec {
        match source {
            DatasetSource::Owid => &self.owid,
            DatasetSource::Pm25 => &self.pm25,
        }
    }

    pub fn emissions(
        &self,
        session: &mut SessionCache,
        force_refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<EmissionsData, ExplorerError> {
        if !force_refresh {
            if let Some(data) = &session.emissions {
                return Ok(data.clone());
            }
        }
        let data = self.load_emissions(force_refresh, sink)?;
        session.emissions = Some(data.clone());
        Ok(data)
    }

    pub fn pollution(
        &self,
        session: &mut SessionCache,
        force_refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<PollutionData, ExplorerError> {
        if !force_refresh {
            if let Some(data) = &session.pollution {
                return Ok(data.clone());
            }
        }
        let data = self.load_pollution(force_refresh, sink)?;
        session.pollution = Some(data.clone());
        Ok(data)
    }

    pub fn load_emissions(
        &self,
        force_refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<EmissionsData, ExplorerError> {
        let start = Instant::now();
        let fetched = self.fetch_phase(&self.owid, force_refresh, sink)?;
        sink.event(ProgressEvent {
            message: "phase=Parse; normalizing OWID CSV".to_string(),
            elapsed: Some(start.elapsed()),
        });
        let rows = parse_owid_csv(&fetched.bytes);
        info!(rows = rows.len(), used_cache = fetched.used_cache, "emissions loaded");
        Ok(EmissionsData {
            rows,
            meta: self.fetcher.metadata(&self.owid),
            used_cache: fetched.used_cache,
        })
    }

    pub fn load_pollution(
        &self,
        force_refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<PollutionData, ExplorerError> {
        let start = Instant::now();
        let fetched = self.fetch_phase(&self.pm25, force_refresh, sink)?;
        sink.event(ProgressEvent {
            message: "phase=Parse; normalizing World Bank series".to_string(),
            elapsed: Some(start.elapsed()),
        });
        let parsed = parse_pm25_json(&fetched.bytes);
        let mut meta = self.fetcher.metadata(&self.pm25);
        meta.diagnostic = parsed.diagnostic;
        info!(rows = parsed.records.len(), used_cache = fetched.used_cache, "pollution loaded");
        Ok(PollutionData {
            rows: parsed.records,
            meta,
            used_cache: fetched.used_cache,
        })
    }

    pub fn fetch(
        &self,
        sources: &[DatasetSource],
        force_refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, ExplorerError> {
        let mut items = Vec::new();
        for &source in sources {
            let spec = self.source(source);
            let (rows, meta, used_cache) = match source {
                DatasetSource::Owid => {
                    let data = self.load_emissions(force_refresh, sink)?;
                    (data.rows.len(), data.meta, data.used_cache)
                }
                DatasetSource::Pm25 => {
                    let data = self.load_pollution(force_refresh, sink)?;
                    (data.rows.len(), data.meta, data.used_cache)
                }
            };
            items.push(FetchItemResult {
                source: source.to_string(),
                url: spec.url.clone(),
                action: if used_cache { "cache" } else { "download" }.to_string(),
                rows,
                cached_at: meta.cached_at,
                diagnostic: meta.diagnostic,
            });
        }
        Ok(FetchResult { items })
    }

    pub fn show(
        &self,
        session: &mut SessionCache,
        options: &ShowOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ShowResult, ExplorerError> {
        let percentile = validate_percentile(options.percentile)?;
        let emissions = self.emissions(session, options.force, sink)?;
        let mut metadata = vec![emissions.meta.clone()];
        let pollution = if options.metric == Metric::Pm25 {
            let data = self.pollution(session, options.force, sink)?;
            metadata.push(data.meta.clone());
            data.rows
        } else {
            Vec::new()
        };

        let dashboard = Dashboard::build(options.metric, &emissions.rows, &pollution, percentile);
        let matches = dashboard.filtered(&options.search);
        let (panel, message) = match select(&matches, options.country.as_deref()) {
            Selection::Selected(row) => (Some(dashboard.panel(&row)), None),
            Selection::NoMatches => (None, Some("No countries found.".to_string())),
        };
        Ok(ShowResult {
            metric: options.metric,
            matches: matches.len(),
            panel,
            message,
            metadata,
        })
    }

    pub fn info(&self) -> InfoResult {
        InfoResult {
            cache_dir: self.fetcher.store().root().to_string(),
            sources: DatasetSource::all()
                .iter()
                .map(|&source| self.fetcher.metadata(self.source(source)))
                .collect(),
        }
    }

    fn fetch_phase(
        &self,
        spec: &SourceSpec,
        force_refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<Fetched, ExplorerError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {}", spec.source.display_name()),
            elapsed: None,
        });
        sink.event(ProgressEvent {
            message: if force_refresh {
                "phase=Fetch; forced refresh".to_string()
            } else {
                "phase=Fetch; checking cache".to_string()
            },
            elapsed: None,
        });
        let start = Instant::now();
        let fetched = self.fetcher.fetch(spec, force_refresh)?;
        sink.event(ProgressEvent {
            message: format!(
                "fetch.done source={} cache={} latency_ms={}",
                spec.source,
                fetched.used_cache,
                start.elapsed().as_millis()
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(fetched)
    }
}
