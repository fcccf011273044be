use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::predict::Coordinate;
use crate::visibility::{RangeQuery, Visibility};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::server::AppState;

/// Optional overrides of the configured reference point and radius.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VisibilityParams {
    /// Reference latitude, degrees
    pub lat: Option<f64>,
    /// Reference longitude, degrees
    pub lon: Option<f64>,
    /// Search radius, km
    pub radius_km: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/visibility",
    tag = "visibility",
    params(VisibilityParams),
    responses(
        (status = 200, description = "Visible satellites and their ground tracks", body = Visibility),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 502, description = "Element-set catalog unavailable", body = ErrorResponse)
    )
)]
pub async fn get_visibility(
    State(state): State<AppState>,
    Query(params): Query<VisibilityParams>,
) -> ApiResult<Json<Visibility>> {
    let query = resolve_query(state.service.default_query(), &params)?;

    let service = state.service.clone();
    let visibility = tokio::task::spawn_blocking(move || service.visibility(&query, Utc::now()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(visibility))
}

fn resolve_query(default: RangeQuery, params: &VisibilityParams) -> ApiResult<RangeQuery> {
    let reference = match (params.lat, params.lon) {
        (None, None) => default.reference,
        (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
        _ => {
            return Err(ApiError::Validation(
                "lat and lon must be given together".into(),
            ))
        }
    };

    let query = RangeQuery {
        reference,
        radius_km: params.radius_km.unwrap_or(default.radius_km),
    };
    query.validate().map_err(ApiError::Validation)?;
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default() -> RangeQuery {
        RangeQuery {
            reference: Coordinate::new(33.5902, 130.4017),
            radius_km: 1633.0,
        }
    }

    #[test]
    fn falls_back_to_configured_query() {
        let query = resolve_query(default(), &VisibilityParams::default()).unwrap();
        assert_eq!(query, default());
    }

    #[test]
    fn overrides_reference_and_radius() {
        let params = VisibilityParams {
            lat: Some(35.6895),
            lon: Some(139.6917),
            radius_km: Some(800.0),
        };
        let query = resolve_query(default(), &params).unwrap();
        assert_eq!(query.reference, Coordinate::new(35.6895, 139.6917));
        assert_eq!(query.radius_km, 800.0);
    }

    #[test]
    fn rejects_partial_or_invalid_overrides() {
        let lat_only = VisibilityParams {
            lat: Some(10.0),
            ..Default::default()
        };
        assert!(resolve_query(default(), &lat_only).is_err());

        let off_globe = VisibilityParams {
            lat: Some(120.0),
            lon: Some(0.0),
            ..Default::default()
        };
        assert!(resolve_query(default(), &off_globe).is_err());

        let negative = VisibilityParams {
            radius_km: Some(-1.0),
            ..Default::default()
        };
        assert!(resolve_query(default(), &negative).is_err());

        let nan = VisibilityParams {
            radius_km: Some(f64::NAN),
            ..Default::default()
        };
        assert!(resolve_query(default(), &nan).is_err());
    }
}
