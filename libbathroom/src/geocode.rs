//! Looking up information about places from OpenStreetMap services
use crate::{Error, Result, map::LatLng};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_USER_AGENT: &str = "bathroom_map";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Radius in meters around a point to search for opening hours
const HOURS_SEARCH_RADIUS: u32 = 80;
const OVERPASS_TIMEOUT: Duration = Duration::from_secs(5);

/// Converts a free-text address into coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns the best match for the given address, or `None` if the address
    /// is unknown
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>>;
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl TryFrom<NominatimPlace> for LatLng {
    type Error = Error;

    fn try_from(value: NominatimPlace) -> Result<Self> {
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| Error::Geocoding(format!("invalid coordinate '{s}': {e}")))
        };
        LatLng::new(parse(&value.lat)?, parse(&value.lon)?)
    }
}

/// A [Geocoder] backed by the Nominatim search API
#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_url(user_agent, NOMINATIM_URL)
    }

    /// Creates a geocoder that sends its requests to a different Nominatim
    /// instance
    pub fn with_url(user_agent: &str, url: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().user_agent(user_agent).build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>> {
        debug!(?query, "Sending geocoding request");
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Geocoding(format!(
                "geocoding service returned status {}",
                response.status()
            )));
        }
        let places: Vec<NominatimPlace> = response.json().await?;
        trace!(nresults = places.len(), "Got geocoding response");
        places.into_iter().next().map(LatLng::try_from).transpose()
    }
}

/// Looks up the opening hours of whatever is located at a point
#[async_trait]
pub trait HoursLookup: Send + Sync {
    async fn opening_hours(&self, point: LatLng) -> Result<Option<String>>;
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
}

/// Whether a string consists only of digits, whitespace, commas and periods.
/// Such values are codes from imported data sets rather than opening hours.
pub(crate) fn is_numeric_code(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == ',' || c == '.')
}

/// A [HoursLookup] backed by the OpenStreetMap Overpass API
#[derive(Clone, Debug)]
pub struct OverpassHoursLookup {
    client: reqwest::Client,
    url: String,
}

impl OverpassHoursLookup {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(OVERPASS_TIMEOUT)
                .build()?,
            url: OVERPASS_URL.to_string(),
        })
    }

    fn query(point: LatLng) -> String {
        let (lat, lng) = (point.lat, point.lng);
        format!(
            "[out:json][timeout:{timeout}];\
            (node(around:{r},{lat},{lng})[opening_hours];\
            way(around:{r},{lat},{lng})[opening_hours];);\
            out body tags;",
            timeout = OVERPASS_TIMEOUT.as_secs(),
            r = HOURS_SEARCH_RADIUS,
        )
    }
}

#[async_trait]
impl HoursLookup for OverpassHoursLookup {
    async fn opening_hours(&self, point: LatLng) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("data", Self::query(point))])
            .send()
            .await?
            .error_for_status()?;
        let data: OverpassResponse = response.json().await?;
        Ok(data.elements.into_iter().find_map(|el| {
            el.tags
                .get("opening_hours")
                .or_else(|| el.tags.get("opening_hours:source"))
                .map(|h| h.trim().to_string())
                .filter(|h| h.len() > 3 && !is_numeric_code(h))
        }))
    }
}
