use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::types::{GroundPosition, Satellite, SatellitePosition};
use crate::predict::window::TimeWindows;

/// Ground tracks of the visible satellites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct GroundTracks {
    pub current_positions: Vec<SatellitePosition>,
    pub paths_past: BTreeMap<String, Vec<GroundPosition>>,
    pub paths_future: BTreeMap<String, Vec<GroundPosition>>,
}

struct Track {
    current: GroundPosition,
    past: Vec<GroundPosition>,
    future: Vec<GroundPosition>,
}

fn build_track<S, P>(
    propagator: &P,
    satellite: &S,
    windows: &TimeWindows,
) -> Result<Track, PredictError>
where
    P: Propagator<S>,
{
    Ok(Track {
        current: propagator.position(satellite, windows.current_time)?,
        past: propagator.position_path(satellite, &windows.past)?,
        future: propagator.position_path(satellite, &windows.future)?,
    })
}

/// Current position plus past and future paths for every satellite in
/// `visible`. A satellite that fails to propagate is dropped from all three.
pub fn build_tracks<S, P>(propagator: &P, visible: &[&S], windows: &TimeWindows) -> GroundTracks
where
    S: Satellite,
    P: Propagator<S>,
{
    let mut tracks = GroundTracks::default();

    for sat in visible {
        let track = match build_track(propagator, *sat, windows) {
            Ok(track) => track,
            Err(e) => {
                log::warn!("Skipping ground track for {}: {}", sat.name(), e);
                continue;
            }
        };

        tracks
            .current_positions
            .push(SatellitePosition::new(sat.name(), track.current));
        tracks.paths_past.insert(sat.name().to_string(), track.past);
        tracks
            .paths_future
            .insert(sat.name().to_string(), track.future);
    }

    tracks
}
