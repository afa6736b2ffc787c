use libbathroom::{bathroom::Bathroom, cleanup::CleanupReport, map::map_search_url};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct BathroomRow {
    id: i64,
    name: String,
    address: String,
    zip: String,
}

impl BathroomRow {
    pub(crate) fn new(bathroom: &Bathroom) -> Self {
        Self {
            id: bathroom.id,
            name: bathroom.name.clone(),
            address: bathroom.address.clone(),
            zip: bathroom.zip.clone(),
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct BathroomRowFull {
    id: i64,
    name: String,
    address: String,
    zip: String,
    #[tabled(display("tabled::derive::display::option", ""))]
    latitude: Option<f64>,
    #[tabled(display("tabled::derive::display::option", ""))]
    longitude: Option<f64>,
    hours: String,
}

impl BathroomRowFull {
    pub(crate) fn new(bathroom: &Bathroom) -> Self {
        Self {
            id: bathroom.id,
            name: bathroom.name.clone(),
            address: bathroom.address.clone(),
            zip: bathroom.zip.clone(),
            latitude: bathroom.latitude,
            longitude: bathroom.longitude,
            hours: bathroom.hours.clone(),
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct BathroomRowDetails {
    id: i64,
    name: String,
    address: String,
    zip: String,
    #[tabled(display("tabled::derive::display::option", ""))]
    latitude: Option<f64>,
    #[tabled(display("tabled::derive::display::option", ""))]
    longitude: Option<f64>,
    hours: String,
    remarks: String,
    #[tabled(display("tabled::derive::display::option", ""), rename = "Map Link")]
    map_link: Option<String>,
}

impl BathroomRowDetails {
    pub(crate) fn new(bathroom: &Bathroom) -> libbathroom::Result<Self> {
        let map_link = bathroom.position().map(map_search_url).transpose()?;
        Ok(Self {
            id: bathroom.id,
            name: bathroom.name.clone(),
            address: bathroom.address.clone(),
            zip: bathroom.zip.clone(),
            latitude: bathroom.latitude,
            longitude: bathroom.longitude,
            hours: bathroom.hours.clone(),
            remarks: bathroom.remarks.clone(),
            map_link,
        })
    }
}

#[derive(Tabled, Serialize)]
pub(crate) struct CleanupRow {
    #[tabled(rename = "Step")]
    step: &'static str,
    #[tabled(rename = "Bathrooms")]
    count: usize,
}

impl CleanupRow {
    pub(crate) fn from_report(report: &CleanupReport) -> Vec<Self> {
        [
            ("Title-cased names and addresses", report.title_cased),
            ("Added state to address", report.state_added),
            ("Added name suffix", report.suffixed),
            ("Cleared bogus hours", report.hours_cleared),
            ("Fetched opening hours", report.hours_fetched),
            ("Removed duplicates", report.duplicates_removed),
            ("Remaining", report.remaining),
        ]
        .into_iter()
        .map(|(step, count)| Self { step, count })
        .collect()
    }
}
