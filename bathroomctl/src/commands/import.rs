//! Importing bathrooms from a CSV file
use crate::commands::bathrooms::{GEOCODE_INTERVAL, geocode_if_needed};
use anyhow::{Context, Result, anyhow};
use indicatif::ProgressBar;
use libbathroom::{Database, address::normalize_zip, bathroom::Bathroom, geocode::Geocoder};
use serde::Deserialize;
use std::{io::Read, path::PathBuf, time::Duration};
use tracing::{debug, warn};

/// One line of an import file. Only the name is required.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    zip: String,
    #[serde(default)]
    hours: String,
    #[serde(default)]
    remarks: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl TryFrom<ImportRecord> for Bathroom {
    type Error = String;

    /// Fails with the offending zip code if it can't be stored
    fn try_from(r: ImportRecord) -> std::result::Result<Self, Self::Error> {
        let zip = normalize_zip(&r.zip).ok_or_else(|| r.zip.trim().to_string())?;
        Ok(Bathroom::new(
            r.name.trim().to_string(),
            r.address.trim().to_string(),
            zip,
            r.hours.trim().to_string(),
            r.remarks,
            r.latitude,
            r.longitude,
        ))
    }
}

/// Parse bathrooms from CSV data with a header row
pub(crate) fn read_bathrooms<R: Read>(reader: R) -> Result<Vec<Bathroom>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    rdr.deserialize::<ImportRecord>()
        .enumerate()
        .map(|(i, rec)| {
            let line = i + 2;
            let rec = rec.with_context(|| format!("Invalid record on line {line}"))?;
            Bathroom::try_from(rec)
                .map_err(|zip| anyhow!("Invalid zip code '{zip}' on line {line}"))
        })
        .collect()
}

/// Insert the bathrooms into the database, looking up missing coordinates
/// first. All of them are inserted in one transaction, so nothing is added if
/// any insert fails. Returns the number of bathrooms added.
pub(crate) async fn import_bathrooms(
    bathrooms: Vec<Bathroom>,
    db: &Database,
    geocoder: Option<&dyn Geocoder>,
    interval: Duration,
) -> Result<usize> {
    let progress = ProgressBar::new(bathrooms.len() as u64);
    let mut named = Vec::with_capacity(bathrooms.len());
    for mut b in bathrooms {
        progress.inc(1);
        if b.name.is_empty() {
            warn!(address = %b.address, "Skipping bathroom without a name");
            continue;
        }
        if geocoder.is_some() && !b.has_coordinates() {
            geocode_if_needed(&mut b, geocoder).await;
            tokio::time::sleep(interval).await;
        }
        named.push(b);
    }
    progress.finish_and_clear();

    let mut tx = db.begin().await?;
    for b in named.iter_mut() {
        b.insert_in(&mut tx)
            .await
            .with_context(|| format!("Unable to import '{}'", b.name))?;
        debug!(id = b.id, name = %b.name, "Imported bathroom");
    }
    tx.commit().await?;
    Ok(named.len())
}

pub(crate) async fn handle_command(
    file: PathBuf,
    db: &Database,
    geocoder: Option<&dyn Geocoder>,
) -> Result<()> {
    let f = std::fs::File::open(&file).with_context(|| format!("Unable to open {file:?}"))?;
    let bathrooms = read_bathrooms(f)?;
    let total = bathrooms.len();
    let added = import_bathrooms(bathrooms, db, geocoder, GEOCODE_INTERVAL).await?;
    println!("Imported {added} of {total} bathrooms");
    Ok(())
}
