//! Rendering bathroom locations as markers on a tile-based map.
//!
//! A [MapSession] is created for a single page view. Locations are added to
//! it one at a time; each one becomes a [Marker] positioned at the location's
//! coordinates with a [Popup] describing it. When all locations have been
//! added, [MapSession::finish()] produces a serializable [MapView] that the
//! browser uses to place the markers and frame them in the viewport.
use crate::{Error, Result, bathroom::Bathroom};
use minijinja::{AutoEscape, Environment, Value, context};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Base url for linking an address to an external map search
pub const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// The maximum zoom level used when fitting the viewport to the markers
pub const FIT_MAX_ZOOM: u8 = 15;

/// Padding in pixels on each side of the viewport when fitting to the markers
pub const FIT_PADDING: u32 = 100;

pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str =
    r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors"#;

/// Size of a single map tile in pixels
const TILE_SIZE: f64 = 256.0;

const POPUP_TEMPLATE: &str = concat!(
    "<h3>{{ name }}</h3>",
    r#"<p><a href="{{ search_url }}" target="_blank" rel="noopener">{{ address }}</a></p>"#,
    "{% if hours %}<p>{{ hours }}</p>{% endif %}",
    "{% if remarks %}<p>{% for line in remarks %}{{ line }}{% if not loop.last %}<br>{% endif %}{% endfor %}</p>{% endif %}",
    "{% if distance %}<p>{{ distance }} miles away</p>{% endif %}",
);

/// A geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new point, verifying that it can be placed on a map
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
        {
            Ok(Self { lat, lng })
        } else {
            Err(Error::InvalidCoordinates {
                latitude: Some(lat),
                longitude: Some(lng),
            })
        }
    }

    // spherical mercator projection onto the unit square
    fn project(&self) -> (f64, f64) {
        let x = (self.lng + 180.0) / 360.0;
        let sin = self.lat.to_radians().sin().clamp(-0.9999, 0.9999);
        let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI);
        (x, y)
    }
}

/// Builds a link that searches for the given point in an external map application
pub fn map_search_url(point: LatLng) -> Result<String> {
    let query = format!("{},{}", point.lat, point.lng);
    let params = serde_urlencoded::to_string([("api", "1"), ("query", query.as_str())])?;
    Ok(format!("{MAP_SEARCH_URL}?{params}"))
}

/// The loosely-typed shape of a location as it is exchanged with the browser
/// or read from a serialized payload
#[derive(Debug, Deserialize, Serialize)]
pub struct LocationPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub hours: String,
    #[serde(default)]
    pub remarks: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The validated form of a bathroom record that can be rendered on the map.
/// Unlike [Bathroom], a location always has a valid position.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "LocationPayload", into = "LocationPayload")]
pub struct Location {
    pub name: String,
    pub address: String,
    pub hours: String,
    pub remarks: String,
    pub position: LatLng,
}

impl TryFrom<LocationPayload> for Location {
    type Error = Error;

    fn try_from(value: LocationPayload) -> Result<Self> {
        let position = match (value.latitude, value.longitude) {
            (Some(lat), Some(lng)) => LatLng::new(lat, lng)?,
            (latitude, longitude) => {
                return Err(Error::InvalidCoordinates {
                    latitude,
                    longitude,
                });
            }
        };
        Ok(Self {
            name: value.name,
            address: value.address,
            hours: value.hours,
            remarks: value.remarks,
            position,
        })
    }
}

impl From<Location> for LocationPayload {
    fn from(value: Location) -> Self {
        Self {
            name: value.name,
            address: value.address,
            hours: value.hours,
            remarks: value.remarks,
            latitude: Some(value.position.lat),
            longitude: Some(value.position.lng),
        }
    }
}

impl TryFrom<&Bathroom> for Location {
    type Error = Error;

    fn try_from(value: &Bathroom) -> Result<Self> {
        if !value.has_coordinates() {
            return Err(Error::InvalidCoordinates {
                latitude: value.latitude,
                longitude: value.longitude,
            });
        }
        LocationPayload {
            name: value.name.clone(),
            address: value.address.clone(),
            hours: value.hours.clone(),
            remarks: value.remarks.clone(),
            latitude: value.latitude,
            longitude: value.longitude,
        }
        .try_into()
    }
}

/// The html content of the panel that is shown when a marker is activated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Popup(String);

impl Popup {
    pub fn as_html(&self) -> &str {
        &self.0
    }
}

/// Splits remarks into the lines shown in a popup. `\r\n`, `\r` and `\n` all
/// end a line, and a trailing line break keeps its empty last line.
pub fn remark_lines(remarks: &str) -> Vec<String> {
    if remarks.is_empty() {
        return Vec::new();
    }
    remarks
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(ToString::to_string)
        .collect()
}

/// Renders popups for locations. Every field is html-escaped and line breaks
/// in the remarks become `<br>` elements.
pub struct PopupTemplate {
    env: Environment<'static>,
}

impl PopupTemplate {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template("popup", POPUP_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, location: &Location, distance: Option<f64>) -> Result<Popup> {
        let search_url = map_search_url(location.position)?;
        let html = self.env.get_template("popup")?.render(context!(
            name => location.name,
            address => location.address,
            search_url => Value::from_safe_string(search_url),
            hours => location.hours,
            remarks => remark_lines(&location.remarks),
            distance => distance.map(|d| format!("{d:.1}")),
        ))?;
        Ok(Popup(html))
    }
}

/// A visual point on the map corresponding to one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: LatLng,
    pub popup: Popup,
}

/// The rectangular region covering a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Grow the bounds so that they include the given point
    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

/// The collection of all markers shown on a map
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
}

impl MarkerLayer {
    pub fn add(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    /// The region covering every marker in the layer, or `None` if the layer
    /// has no markers
    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.markers.iter().fold(None, |bounds, marker| {
            Some(match bounds {
                None => LatLngBounds::from_point(marker.position),
                Some(mut b) => {
                    b.extend(marker.position);
                    b
                }
            })
        })
    }
}

/// Options for fitting the viewport to a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitBoundsOptions {
    /// Never zoom in further than this level
    pub max_zoom: u8,
    /// Pixels to keep free on each side of the viewport
    pub padding: u32,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            max_zoom: FIT_MAX_ZOOM,
            padding: FIT_PADDING,
        }
    }
}

/// What the map shows when the page is displayed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    /// A fixed view
    Default { center: LatLng, zoom: u8 },
    /// Frame the given region
    Fit {
        bounds: LatLngBounds,
        options: FitBoundsOptions,
    },
}

impl Viewport {
    /// The integer zoom level this viewport results in for a map of the given
    /// size in pixels.
    ///
    /// The browser does the actual fitting with Leaflet's `fitBounds`. This is
    /// the same calculation done on the server, so that the fit options can be
    /// checked without a browser: the result never exceeds
    /// [FitBoundsOptions::max_zoom] and leaves [FitBoundsOptions::padding]
    /// pixels free on every side.
    pub fn zoom_for_size(&self, width: u32, height: u32) -> u8 {
        match self {
            Viewport::Default { zoom, .. } => *zoom,
            Viewport::Fit { bounds, options } => {
                let (x1, y1) = bounds.south_west.project();
                let (x2, y2) = bounds.north_east.project();
                let padding = 2.0 * f64::from(options.padding);
                let avail_w = (f64::from(width) - padding).max(1.0);
                let avail_h = (f64::from(height) - padding).max(1.0);
                let zoom_x = (avail_w / (TILE_SIZE * (x2 - x1).abs())).log2();
                let zoom_y = (avail_h / (TILE_SIZE * (y2 - y1).abs())).log2();
                // a single point has zero extent and results in an infinite zoom
                zoom_x
                    .min(zoom_y)
                    .floor()
                    .clamp(0.0, f64::from(options.max_zoom)) as u8
            }
        }
    }
}

/// The source of the map's background tiles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    /// Tile url template with `{s}`, `{z}`, `{x}` and `{y}` placeholders
    pub url: String,
    /// Attribution html that must be shown with the tiles
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
        }
    }
}

/// Everything the browser needs to draw the map
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub tiles: TileLayer,
    /// The view shown before (or instead of) fitting to the markers
    pub initial: Viewport,
    pub markers: MarkerLayer,
    pub viewport: Viewport,
}

/// An explicitly owned map for a single page view
pub struct MapSession {
    tiles: TileLayer,
    initial: Viewport,
    fit_options: FitBoundsOptions,
    popups: PopupTemplate,
    markers: MarkerLayer,
}

impl MapSession {
    pub fn new(tiles: TileLayer, center: LatLng, zoom: u8) -> Result<Self> {
        Ok(Self {
            tiles,
            initial: Viewport::Default { center, zoom },
            fit_options: FitBoundsOptions::default(),
            popups: PopupTemplate::new()?,
            markers: MarkerLayer::default(),
        })
    }

    fn push(&mut self, location: &Location, distance: Option<f64>) -> Result<()> {
        trace!(name = %location.name, position = ?location.position, "Adding marker");
        let popup = self.popups.render(location, distance)?;
        self.markers.add(Marker {
            position: location.position,
            popup,
        });
        Ok(())
    }

    /// Add a marker for the given location
    pub fn add_location(&mut self, location: &Location) -> Result<()> {
        self.push(location, None)
    }

    /// Add a marker for the given location and mention how far away it is in
    /// its popup
    pub fn add_nearby(&mut self, location: &Location, distance_miles: f64) -> Result<()> {
        self.push(location, Some(distance_miles))
    }

    /// Add a marker for each of the given locations and return the number of
    /// markers added
    pub fn add_locations<'a, I>(&mut self, locations: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut n = 0;
        for location in locations {
            self.add_location(location)?;
            n += 1;
        }
        Ok(n)
    }

    pub fn markers(&self) -> &MarkerLayer {
        &self.markers
    }

    /// Finish building the map. If there are any markers, the viewport is
    /// fitted to frame all of them. Without markers the initial view is kept.
    pub fn finish(self) -> MapView {
        let viewport = match self.markers.bounds() {
            Some(bounds) => Viewport::Fit {
                bounds,
                options: self.fit_options,
            },
            None => {
                debug!("No markers on map, keeping the initial view");
                self.initial
            }
        };
        MapView {
            tiles: self.tiles,
            initial: self.initial,
            markers: self.markers,
            viewport,
        }
    }
}
