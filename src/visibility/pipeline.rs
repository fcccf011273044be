use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{
    build_tracks, Coordinate, GroundTracks, PredictError, Propagator, RangeFilter, Satellite,
    TimeWindows, WindowConfig,
};
use crate::visibility::cache::{CacheKey, VisibilityCache};

/// Where to look and how far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RangeQuery {
    pub reference: Coordinate,
    pub radius_km: f64,
}

impl RangeQuery {
    /// Rejects off-globe references and radii that are negative or not finite.
    pub fn validate(&self) -> Result<(), String> {
        if !self.reference.is_valid() {
            return Err(format!(
                "coordinates out of range: {}, {}",
                self.reference.latitude, self.reference.longitude
            ));
        }
        if !(self.radius_km.is_finite() && self.radius_km >= 0.0) {
            return Err(format!("invalid radius_km: {}", self.radius_km));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibilitySource {
    Cached,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Visibility {
    pub current_time: DateTime<Utc>,
    pub reference: Coordinate,
    pub radius_km: f64,
    pub source: VisibilitySource,
    pub satellite_count: usize,
    #[serde(flatten)]
    pub tracks: GroundTracks,
}

pub struct VisibilityPipeline<P> {
    propagator: P,
    windows: WindowConfig,
    cache: VisibilityCache,
}

impl<P> VisibilityPipeline<P> {
    pub fn new(propagator: P, windows: WindowConfig, cache: VisibilityCache) -> Self {
        Self {
            propagator,
            windows,
            cache,
        }
    }

    /// Visible satellites and their ground tracks at `now`.
    ///
    /// The range scan only runs on a cache miss; ground tracks are rebuilt
    /// on every call.
    pub fn run<S>(
        &self,
        satellites: &[S],
        query: &RangeQuery,
        now: DateTime<Utc>,
    ) -> Result<Visibility, PredictError>
    where
        S: Satellite,
        P: Propagator<S>,
    {
        let windows = TimeWindows::generate(now, &self.windows)?;
        let key = CacheKey::new(query.reference, query.radius_km);

        let (visible, source) = self.cache.coalesce(&key, || {
            self.visible_set(satellites, query, &key, &windows, now)
        });

        let tracks = build_tracks(&self.propagator, &visible, &windows);

        Ok(Visibility {
            current_time: windows.current_time,
            reference: query.reference,
            radius_km: query.radius_km,
            source,
            satellite_count: tracks.current_positions.len(),
            tracks,
        })
    }

    fn visible_set<'a, S>(
        &self,
        satellites: &'a [S],
        query: &RangeQuery,
        key: &CacheKey,
        windows: &TimeWindows,
        now: DateTime<Utc>,
    ) -> (Vec<&'a S>, VisibilitySource)
    where
        S: Satellite,
        P: Propagator<S>,
    {
        if let Some(cached) = self.cache.load(key, now) {
            log::info!("Using cached visibility for {}", key);
            let names: HashSet<&str> = cached.iter().map(String::as_str).collect();
            let visible = satellites
                .iter()
                .filter(|sat| names.contains(sat.name()))
                .collect();
            return (visible, VisibilitySource::Cached);
        }

        log::info!(
            "Calculating visibility for {} over {} satellites",
            key,
            satellites.len()
        );
        let filter = RangeFilter::new(query.reference, query.radius_km);
        let visible = filter.filter(&self.propagator, satellites, windows);

        let names: Vec<String> = visible.iter().map(|sat| sat.name().to_string()).collect();
        if let Err(e) = self.cache.save(key, &names, now) {
            log::warn!("Failed to save visibility cache: {}", e);
        }

        (visible, VisibilitySource::Computed)
    }
}
