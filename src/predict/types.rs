use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Anything the pipeline can propagate and report by name.
pub trait Satellite {
    fn name(&self) -> &str;
}

/// A fixed point on the ground, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse a `"lat, lon"` pair.
    pub fn from_coordinates(coordinates: &str) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        let coordinate = Self::new(lat, lon);
        coordinate.is_valid().then_some(coordinate)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// The point diametrically opposite on the globe.
    #[cfg(test)]
    pub fn antipode(&self) -> Self {
        let lon = self.longitude + 180.0;
        Self {
            latitude: -self.latitude,
            longitude: if lon > 180.0 { lon - 360.0 } else { lon },
        }
    }
}

/// Satellite subpoint at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GroundPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Height above the WGS-84 ellipsoid, km
    pub altitude: f64,
}

impl GroundPosition {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A named satellite's subpoint at the current instant.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SatellitePosition {
    pub satellite: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl SatellitePosition {
    pub fn new(satellite: &str, position: GroundPosition) -> Self {
        Self {
            satellite: satellite.to_string(),
            latitude: position.latitude,
            longitude: position.longitude,
            altitude: position.altitude,
        }
    }
}
