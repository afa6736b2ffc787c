//! Geocoders for the command tests
use libbathroom::{Error, geocode::Geocoder, map::LatLng};

/// Answers every query with the same result
pub(crate) struct FixedGeocoder(pub Option<LatLng>);

#[async_trait::async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, _query: &str) -> libbathroom::Result<Option<LatLng>> {
        Ok(self.0)
    }
}

/// Fails every lookup, like an unreachable geocoding service
pub(crate) struct FailingGeocoder;

#[async_trait::async_trait]
impl Geocoder for FailingGeocoder {
    async fn geocode(&self, _query: &str) -> libbathroom::Result<Option<LatLng>> {
        Err(Error::Geocoding("service unavailable".to_string()))
    }
}
