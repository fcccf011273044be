use std::f64::consts::PI;

use chrono::{DateTime, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::{Propagator, WGS84_A_KM, WGS84_F};
use crate::predict::types::{Coordinate, Satellite};
use crate::predict::window::TimeWindows;

/// Surface radius around the reference point that counts as "overhead".
///
/// Kept from the deployed service as a tunable; it is not derived from the
/// constellation's altitude or horizon geometry.
pub const DEFAULT_RANGE_KM: f64 = 1633.0;

/// Radius of the sphere whose half circumference equals half a WGS-84 meridian.
const RECTIFYING_RADIUS_KM: f64 = 6367.449_146;

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_TOLERANCE: f64 = 1e-12;

/// Surface distance between two points on the WGS-84 ellipsoid, km.
pub fn geodesic_distance_km(p: Coordinate, q: Coordinate) -> f64 {
    if p == q {
        return 0.0;
    }
    vincenty_inverse_km(p, q).unwrap_or_else(|| great_circle_km(p, q))
}

pub fn within_range(p: Coordinate, q: Coordinate, radius_km: f64) -> bool {
    geodesic_distance_km(p, q) <= radius_km
}

/// Vincenty's inverse formula. `None` when the iteration fails to converge,
/// which happens for nearly antipodal points.
fn vincenty_inverse_km(p: Coordinate, q: Coordinate) -> Option<f64> {
    let a = WGS84_A_KM;
    let f = WGS84_F;
    let b = a * (1.0 - f);

    let l = longitude_difference(p.longitude, q.longitude).to_radians();
    let u1 = ((1.0 - f) * p.latitude.to_radians().tan()).atan();
    let u2 = ((1.0 - f) * q.latitude.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;

        if sin_sigma < 1e-15 {
            return if cos_sigma > 0.0 { Some(0.0) } else { None };
        }

        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        if sin_alpha.abs() > 1.0 {
            return None;
        }
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        let cos_2sigma_m = if cos2_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
        } else {
            // equatorial line
            0.0
        };
        let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if lambda.abs() > PI {
            return None;
        }

        if (lambda - previous).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos2_alpha * (a * a - b * b) / (b * b);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(b * big_a * (sigma - delta_sigma));
        }
    }

    None
}

/// `to - from` wrapped into [-180, 180) degrees.
fn longitude_difference(from: f64, to: f64) -> f64 {
    (to - from + 540.0).rem_euclid(360.0) - 180.0
}

/// Haversine distance on the rectifying sphere.
fn great_circle_km(p: Coordinate, q: Coordinate) -> f64 {
    let lat1 = p.latitude.to_radians();
    let lat2 = q.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = longitude_difference(p.longitude, q.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * RECTIFYING_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Decides which satellites pass within `radius_km` of `reference`.
#[derive(Debug, Clone, Copy)]
pub struct RangeFilter {
    pub reference: Coordinate,
    pub radius_km: f64,
}

impl RangeFilter {
    pub fn new(reference: Coordinate, radius_km: f64) -> Self {
        Self {
            reference,
            radius_km,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        within_range(point, self.reference, self.radius_km)
    }

    /// True once any sample of the past window, then of the future window,
    /// lands in range. Stops at the first hit.
    pub fn is_visible<S, P>(
        &self,
        propagator: &P,
        satellite: &S,
        windows: &TimeWindows,
    ) -> Result<bool, PredictError>
    where
        P: Propagator<S>,
    {
        if self.any_in_range(propagator, satellite, &windows.past)? {
            return Ok(true);
        }
        self.any_in_range(propagator, satellite, &windows.future)
    }

    fn any_in_range<S, P>(
        &self,
        propagator: &P,
        satellite: &S,
        instants: &[DateTime<Utc>],
    ) -> Result<bool, PredictError>
    where
        P: Propagator<S>,
    {
        for instant in instants {
            let position = propagator.position(satellite, *instant)?;
            if self.contains(position.coordinate()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Visible satellites in input order. Satellites that fail to propagate
    /// are left out.
    pub fn filter<'a, S, P>(
        &self,
        propagator: &P,
        satellites: &'a [S],
        windows: &TimeWindows,
    ) -> Vec<&'a S>
    where
        S: Satellite,
        P: Propagator<S>,
    {
        satellites
            .iter()
            .filter(|sat| match self.is_visible(propagator, *sat, windows) {
                Ok(visible) => visible,
                Err(e) => {
                    log::warn!("Skipping {} in range scan: {}", sat.name(), e);
                    false
                }
            })
            .collect()
    }
}
