//! Helpers shared by the router tests
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use libbathroom::{geocode::Geocoder, map::LatLng};
use std::{collections::HashMap, sync::Arc};
use tower::Service;

/// A geocoder that only knows a fixed set of places
pub(crate) struct FakeGeocoder(HashMap<String, LatLng>);

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> libbathroom::Result<Option<LatLng>> {
        Ok(self.0.get(query).copied())
    }
}

pub(crate) fn geocoder() -> Arc<dyn Geocoder> {
    Arc::new(FakeGeocoder(HashMap::from([(
        "Belmont, Massachusetts".to_string(),
        LatLng {
            lat: 42.3959,
            lng: -71.1786,
        },
    )])))
}

/// A geocoder whose service is unreachable
pub(crate) struct FailingGeocoder;

#[async_trait]
impl Geocoder for FailingGeocoder {
    async fn geocode(&self, _query: &str) -> libbathroom::Result<Option<LatLng>> {
        Err(libbathroom::Error::Geocoding("service unavailable".to_string()))
    }
}

pub(crate) fn failing_geocoder() -> Arc<dyn Geocoder> {
    Arc::new(FailingGeocoder)
}

pub(crate) async fn get(app: &mut Router, uri: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .expect("Failed to build request");
    app.as_service()
        .call(req)
        .await
        .expect("Failed to execute request")
}

pub(crate) async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not utf8")
}
