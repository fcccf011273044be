use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::{
    load_catalog, CatalogError, CatalogSource, CatalogStore, ElementSet, HttpSource,
};
use crate::config::{Config, ConfigError};
use crate::predict::{PredictError, Sgp4Propagator};
use crate::visibility::cache::VisibilityCache;
use crate::visibility::pipeline::{RangeQuery, Visibility, VisibilityPipeline};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Predict error: {0}")]
    Predict(#[from] PredictError),
}

/// Catalog store, SGP4 pipeline and default query wired from config.
pub struct VisibilityService<C = HttpSource> {
    store: CatalogStore<C>,
    pipeline: VisibilityPipeline<Sgp4Propagator>,
    default_query: RangeQuery,
}

impl VisibilityService<HttpSource> {
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let source = HttpSource::new(config.catalog.timeout)?;
        Self::with_source(config, source)
    }
}

impl<C: CatalogSource> VisibilityService<C> {
    pub fn with_source(config: &Config, source: C) -> Result<Self, ServiceError> {
        let cache = VisibilityCache::new(config.cache.path.clone(), config.cache_ttl()?);
        let pipeline = VisibilityPipeline::new(Sgp4Propagator, config.window_config()?, cache);
        let default_query = config.default_query()?;
        log::info!(
            "Reference {} at ({}, {}), radius {} km",
            config.reference_label(),
            default_query.reference.latitude,
            default_query.reference.longitude,
            default_query.radius_km
        );

        Ok(Self {
            store: CatalogStore::new(config.store_config(), source),
            pipeline,
            default_query,
        })
    }

    pub fn default_query(&self) -> RangeQuery {
        self.default_query
    }

    /// Today's element sets, downloading the catalog if needed.
    pub fn element_sets(&self, now: DateTime<Utc>) -> Result<Vec<ElementSet>, ServiceError> {
        let path = self.store.fetch(now.date_naive())?;
        Ok(load_catalog(&path)?)
    }

    pub fn visibility(
        &self,
        query: &RangeQuery,
        now: DateTime<Utc>,
    ) -> Result<Visibility, ServiceError> {
        let satellites = self.element_sets(now)?;
        Ok(self.pipeline.run(&satellites, query, now)?)
    }
}
