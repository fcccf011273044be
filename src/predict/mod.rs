mod error;
mod paths;
mod propagation;
mod range;
mod types;
mod window;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PredictError;
pub use paths::{build_tracks, GroundTracks};
pub use propagation::{Propagator, Sgp4Propagator};
pub use range::{RangeFilter, DEFAULT_RANGE_KM};
pub use types::{Coordinate, GroundPosition, Satellite, SatellitePosition};
pub use window::{
    TimeWindows, WindowConfig, DEFAULT_FUTURE_SPAN, DEFAULT_PAST_SPAN, DEFAULT_SAMPLES,
};
