//! Synthetic satellites with scripted ground tracks.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::types::{Coordinate, GroundPosition, Satellite};

#[derive(Debug, Clone)]
enum Track {
    /// Directly over the reference at one instant, antipodal otherwise
    Passing(DateTime<Utc>),
    /// Antipodal at every instant
    Far,
    Broken,
}

#[derive(Debug, Clone)]
pub struct ScriptedSatellite {
    name: String,
    track: Track,
}

impl ScriptedSatellite {
    pub fn passing(name: &str, at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            track: Track::Passing(at),
        }
    }

    pub fn far(name: &str) -> Self {
        Self {
            name: name.to_string(),
            track: Track::Far,
        }
    }

    pub fn broken(name: &str) -> Self {
        Self {
            name: name.to_string(),
            track: Track::Broken,
        }
    }
}

impl Satellite for ScriptedSatellite {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Counts every `position` call.
pub struct ScriptedPropagator {
    reference: Coordinate,
    calls: AtomicUsize,
}

impl ScriptedPropagator {
    pub const ALTITUDE_KM: f64 = 20_200.0;

    pub fn new(reference: Coordinate) -> Self {
        Self {
            reference,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn at(&self, point: Coordinate) -> GroundPosition {
        GroundPosition {
            latitude: point.latitude,
            longitude: point.longitude,
            altitude: Self::ALTITUDE_KM,
        }
    }
}

impl Propagator<ScriptedSatellite> for ScriptedPropagator {
    fn position(
        &self,
        satellite: &ScriptedSatellite,
        instant: DateTime<Utc>,
    ) -> Result<GroundPosition, PredictError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match satellite.track {
            Track::Passing(at) if at == instant => Ok(self.at(self.reference)),
            Track::Passing(_) | Track::Far => Ok(self.at(self.reference.antipode())),
            Track::Broken => Err(PredictError::Propagation(format!(
                "{} decayed",
                satellite.name
            ))),
        }
    }
}
