use utoipa::OpenApi;

use crate::predict::{Coordinate, GroundPosition, GroundTracks, SatellitePosition};
use crate::visibility::{Visibility, VisibilitySource};

use super::api::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(super::api::visibility::get_visibility),
    components(schemas(
        Visibility,
        VisibilitySource,
        GroundTracks,
        SatellitePosition,
        GroundPosition,
        Coordinate,
        ErrorResponse,
    )),
    info(
        title = "GNSS Overhead API",
        description = "Navigation satellites passing near a reference point, with their ground tracks",
        version = "0.1.0"
    ),
    tags(
        (name = "visibility", description = "Ground-track visibility")
    )
)]
pub struct ApiDoc;
