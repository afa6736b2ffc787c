use anyhow::{Context, Result};
use libbathroom::{
    geocode::{DEFAULT_USER_AGENT, NOMINATIM_URL},
    map::{DEFAULT_ATTRIBUTION, DEFAULT_TILE_URL, LatLng, TileLayer},
};
use serde::{Deserialize, Deserializer};
use tracing::debug;

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListenConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HOST: &str = "0.0.0.0";
fn default_listen() -> ListenConfig {
    ListenConfig {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_HTTP_PORT,
    }
}

// This handles the case where the `listen` block is PRESENT, but a field may be missing.
fn deserialize_listen_with_default_port<'de, D>(deserializer: D) -> Result<ListenConfig, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct PartialListenConfig {
        host: Option<String>,
        port: Option<u16>,
    }

    let partial_config = PartialListenConfig::deserialize(deserializer)?;
    Ok(ListenConfig {
        host: partial_config
            .host
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: partial_config.port.unwrap_or(DEFAULT_HTTP_PORT),
    })
}

/// Roughly the geographic center of the contiguous United States
const DEFAULT_CENTER: LatLng = LatLng {
    lat: 39.8283,
    lng: -98.5795,
};
const DEFAULT_ZOOM: u8 = 4;
/// The highest zoom level offered by the OpenStreetMap tile servers
const MAX_ZOOM: u8 = 19;

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct MapConfig {
    pub(crate) tile_url: String,
    pub(crate) attribution: String,
    /// The map center when there is nothing to show
    pub(crate) default_center: LatLng,
    pub(crate) default_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapConfig {
    pub(crate) fn tiles(&self) -> TileLayer {
        TileLayer {
            url: self.tile_url.clone(),
            attribution: self.attribution.clone(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct GeocoderConfig {
    pub(crate) user_agent: String,
    pub(crate) url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            url: NOMINATIM_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    #[serde(default = "default_listen")]
    #[serde(deserialize_with = "deserialize_listen_with_default_port")]
    pub(crate) listen: ListenConfig,
    pub(crate) database: String,
    #[serde(default)]
    pub(crate) map: MapConfig,
    #[serde(default)]
    pub(crate) geocoder: GeocoderConfig,
}

impl EnvConfig {
    pub(crate) fn init(&mut self) -> Result<()> {
        let center = self.map.default_center;
        debug!(?center, "Checking default map center");
        self.map.default_center = LatLng::new(center.lat, center.lng)
            .with_context(|| format!("Invalid default map center {center:?}"))?;
        if self.map.default_zoom > MAX_ZOOM {
            anyhow::bail!("Invalid default map zoom {}", self.map.default_zoom);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"dev:
  database: dev-database.sqlite
  listen: &LISTEN
    host: "127.0.0.1"
    port: 8080
  map:
    default_center:
      lat: 42.3946
      lng: -71.177
    default_zoom: 12
prod:
  database: prod-database.sqlite
  listen: *LISTEN
  map:
    tile_url: "https://tiles.example.com/{z}/{x}/{y}.png"
    attribution: "Example tiles"
  geocoder:
    user_agent: "bathroom_map/prod"
    url: "http://localhost:8088/search""#;
        let configs: HashMap<String, EnvConfig> =
            serde_yaml::from_str(yaml).expect("Failed to parse yaml");
        assert_eq!(configs.len(), 2);
        assert_eq!(
            configs["dev"],
            EnvConfig {
                listen: ListenConfig {
                    host: "127.0.0.1".to_string(),
                    port: 8080,
                },
                database: "dev-database.sqlite".to_string(),
                map: MapConfig {
                    default_center: LatLng {
                        lat: 42.3946,
                        lng: -71.177
                    },
                    default_zoom: 12,
                    ..Default::default()
                },
                geocoder: GeocoderConfig::default(),
            }
        );
        assert_eq!(
            configs["prod"],
            EnvConfig {
                listen: ListenConfig {
                    host: "127.0.0.1".to_string(),
                    port: 8080,
                },
                database: "prod-database.sqlite".to_string(),
                map: MapConfig {
                    tile_url: "https://tiles.example.com/{z}/{x}/{y}.png".to_string(),
                    attribution: "Example tiles".to_string(),
                    default_center: DEFAULT_CENTER,
                    default_zoom: DEFAULT_ZOOM,
                },
                geocoder: GeocoderConfig {
                    user_agent: "bathroom_map/prod".to_string(),
                    url: "http://localhost:8088/search".to_string(),
                },
            }
        );
        assert_eq!(configs["dev"].map.default_center, LatLng::new(42.3946, -71.177).unwrap());
    }

    #[test]
    fn test_default_ports() {
        let yaml = r#"dev:
  database: dev-database.sqlite
  listen:
    host: "0.0.0.0""#;
        let configs: HashMap<String, EnvConfig> =
            serde_yaml::from_str(yaml).expect("Failed to parse yaml");
        assert_eq!(configs["dev"].listen.port, 80);

        let yaml = "dev:\n  database: dev-database.sqlite";
        let configs: HashMap<String, EnvConfig> =
            serde_yaml::from_str(yaml).expect("Failed to parse yaml");
        assert_eq!(configs["dev"].listen, default_listen());
        assert_eq!(configs["dev"].map, MapConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let yaml = "dev:\n  database: dev.sqlite\n  mail_service: foo";
        assert!(serde_yaml::from_str::<HashMap<String, EnvConfig>>(yaml).is_err());

        let yaml = "dev:\n  database: dev.sqlite\n  map:\n    default_center:\n      lat: 95.0\n      lng: 0.0";
        let mut configs: HashMap<String, EnvConfig> =
            serde_yaml::from_str(yaml).expect("Failed to parse yaml");
        let dev = configs.get_mut("dev").unwrap();
        assert!(dev.init().is_err());

        let mut config = EnvConfig {
            listen: default_listen(),
            database: "dev.sqlite".to_string(),
            map: MapConfig::default(),
            geocoder: GeocoderConfig::default(),
        };
        assert!(config.init().is_ok());
    }
}
