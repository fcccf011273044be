use chrono::{DateTime, Utc};

use crate::catalog::ElementSet;
use crate::predict::error::PredictError;
use crate::predict::types::GroundPosition;

// WGS-84
pub const WGS84_A_KM: f64 = 6378.137;
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

const GEODETIC_ITERATIONS: usize = 6;

/// Maps a satellite and an instant to its ground subpoint.
pub trait Propagator<S: ?Sized> {
    fn position(&self, satellite: &S, instant: DateTime<Utc>)
        -> Result<GroundPosition, PredictError>;

    /// Subpoints for every instant, in input order.
    fn position_path(
        &self,
        satellite: &S,
        instants: &[DateTime<Utc>],
    ) -> Result<Vec<GroundPosition>, PredictError> {
        instants
            .iter()
            .map(|instant| self.position(satellite, *instant))
            .collect()
    }
}

/// SGP4 propagation of two-line element sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Propagator;

impl Propagator<ElementSet> for Sgp4Propagator {
    fn position(
        &self,
        satellite: &ElementSet,
        instant: DateTime<Utc>,
    ) -> Result<GroundPosition, PredictError> {
        let timestamp = instant.naive_utc();
        let minutes = satellite
            .elements
            .datetime_to_minutes_since_epoch(&timestamp)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let prediction = satellite
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp));

        let ecef = teme_to_ecef_position(prediction.position, sidereal);
        Ok(ecef_to_geodetic(ecef))
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

/// Earth-fixed cartesian (km) to WGS-84 latitude, longitude and height.
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> GroundPosition {
    let [x, y, z] = ecef;
    let p = (x * x + y * y).sqrt();
    let longitude = y.atan2(x);

    let mut latitude = z.atan2(p * (1.0 - WGS84_E2));
    let mut n = WGS84_A_KM;
    for _ in 0..GEODETIC_ITERATIONS {
        let sin_lat = latitude.sin();
        n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        latitude = (z + WGS84_E2 * n * sin_lat).atan2(p);
    }

    // Stable at the poles, unlike p / cos(lat) - n
    let altitude = p * latitude.cos() + z * latitude.sin() - WGS84_A_KM * WGS84_A_KM / n;

    GroundPosition {
        latitude: latitude.to_degrees(),
        longitude: longitude.to_degrees(),
        altitude,
    }
}
