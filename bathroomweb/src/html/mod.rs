use crate::{TemplateKey, error::Error, state::AppState};
use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::QueryRejection},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use libbathroom::{
    address::{parse_city_slug, title_case},
    bathroom::Bathroom,
    distance::{distance_miles, order_by_distance},
    empty_string_as_none,
    map::{LatLng, Location, MapSession, map_search_url},
};
use minijinja::context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Zoom level of the map when it is centered on a city
const CITY_ZOOM: u8 = 13;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/map/", get(show_map))
        .route("/list", get(list_nearby))
        .route("/privacy/", get(privacy))
}

#[derive(Deserialize)]
struct MapParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
}

#[derive(Debug, Serialize)]
struct City {
    name: String,
    slug: String,
    position: LatLng,
}

async fn locate_city(state: &AppState, slug: &str) -> Result<City, Error> {
    let (city, st) =
        parse_city_slug(slug).ok_or_else(|| Error::NotFound(format!("Unknown city '{slug}'")))?;
    let name = title_case(&format!("{city}, {st}"));
    debug!(slug, %name, "Looking up city");
    let position = state
        .geocoder
        .geocode(&name)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Unable to find city '{name}'")))?;
    Ok(City {
        name,
        slug: slug.to_string(),
        position,
    })
}

async fn show_map(
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    query: Result<Query<MapParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = query?;
    let city = match params.city.as_deref() {
        Some(slug) => Some(locate_city(&state, slug).await?),
        None => None,
    };
    let mapcfg = &state.config.map;
    let (center, zoom) = match city {
        Some(ref c) => (c.position, CITY_ZOOM),
        None => (mapcfg.default_center, mapcfg.default_zoom),
    };
    let mut session = MapSession::new(mapcfg.tiles(), center, zoom)?;
    let mut skipped = 0;
    for bathroom in Bathroom::load_all(None, None, &state.db).await? {
        let location = match Location::try_from(&bathroom) {
            Ok(location) => location,
            Err(e) => {
                warn!(id = bathroom.id, "Not showing bathroom on the map: {e}");
                skipped += 1;
                continue;
            }
        };
        match city {
            Some(ref c) => {
                session.add_nearby(&location, distance_miles(c.position, location.position))?
            }
            None => session.add_location(&location)?,
        }
    }
    let view = session.finish();
    Ok(state.render_template(
        key,
        context!(map => view,
                 city => city,
                 skipped => skipped),
    ))
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    longitude: Option<f64>,
}

#[derive(Serialize)]
struct ListItem {
    bathroom: Bathroom,
    distance: f64,
    search_url: Option<String>,
}

async fn list_nearby(
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = query?;
    let latitude = params
        .latitude
        .ok_or_else(|| Error::RequiredParameterMissing("latitude".to_string()))?;
    let longitude = params
        .longitude
        .ok_or_else(|| Error::RequiredParameterMissing("longitude".to_string()))?;
    let origin = LatLng::new(latitude, longitude)?;
    let bathrooms = Bathroom::load_all(None, None, &state.db).await?;
    let items = order_by_distance(origin, bathrooms)
        .into_iter()
        .map(|nearby| -> Result<ListItem, Error> {
            let search_url = nearby
                .bathroom
                .position()
                .map(map_search_url)
                .transpose()?;
            Ok(ListItem {
                bathroom: nearby.bathroom,
                distance: nearby.distance,
                search_url,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(state.render_template(
        key,
        context!(origin => origin,
                 items => items),
    ))
}

async fn privacy(TemplateKey(key): TemplateKey, State(state): State<AppState>) -> impl IntoResponse {
    state.render_template(key, context!())
}

#[derive(Serialize)]
pub(crate) struct ApiError {
    pub(crate) error: String,
}

/// Turns errors returned by any handler into an error page, or into a json
/// object for api requests
pub(crate) async fn error_page(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let mut response = next.run(request).await;
    let Some(err) = response.extensions_mut().remove::<Arc<Error>>() else {
        return response;
    };
    let (status, message) = err.to_client_status();
    if is_api {
        (status, Json(ApiError { error: message })).into_response()
    } else {
        (
            status,
            state.render_template(
                "error.html.j2",
                context!(status => status.as_u16(),
                         reason => status.canonical_reason(),
                         message => message),
            ),
        )
            .into_response()
    }
}
