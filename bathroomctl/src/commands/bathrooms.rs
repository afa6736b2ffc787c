//! Commands that manage individual bathrooms
use crate::{
    cli::{BathroomSortField, Commands},
    output::{
        self,
        rows::{BathroomRow, BathroomRowDetails, BathroomRowFull},
    },
    prompt::prompt_bathroom,
};
use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use libbathroom::{
    Database,
    Error::DatabaseError,
    bathroom::{self, Bathroom},
    core::{
        loadable::Loadable,
        query::{
            SortOrder, SortSpec,
            filter::{Cmp, and, or},
        },
    },
    geocode::Geocoder,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Nominatim allows at most one request per second
pub(crate) const GEOCODE_INTERVAL: Duration = Duration::from_secs(1);

/// Look up the coordinates of the bathroom if it doesn't have any. A failed
/// lookup is only logged, the bathroom can still be saved without them.
pub(crate) async fn geocode_if_needed(
    bathroom: &mut Bathroom,
    geocoder: Option<&dyn Geocoder>,
) -> bool {
    let Some(geocoder) = geocoder else {
        return false;
    };
    match bathroom.ensure_coordinates(geocoder).await {
        Ok(found) => found,
        Err(e) => {
            warn!(name = %bathroom.name, "Unable to look up coordinates: {e}");
            false
        }
    }
}

/// Handle the commands that operate on one or all bathrooms
pub(crate) async fn handle_command(
    command: Commands,
    db: &Database,
    geocoder: Option<&dyn Geocoder>,
) -> Result<()> {
    match command {
        Commands::List {
            filter,
            missing_coordinates,
            sort,
            reverse,
            output,
        } => {
            let mut builder = and();
            if let Some(f) = filter {
                builder = builder.push(
                    or().push(bathroom::Filter::Name(Cmp::Like, f.clone()))
                        .push(bathroom::Filter::Address(Cmp::Like, f))
                        .build(),
                );
            }
            if missing_coordinates {
                builder = builder.push(bathroom::Filter::MissingCoordinates);
            }
            let sort = sort.map(|field| {
                let field = match field {
                    BathroomSortField::Id => bathroom::SortField::Id,
                    BathroomSortField::Name => bathroom::SortField::Name,
                    BathroomSortField::Zip => bathroom::SortField::Zip,
                };
                let order = match reverse {
                    true => SortOrder::Descending,
                    false => SortOrder::Ascending,
                };
                SortSpec::new(field, order).into()
            });
            let bathrooms = Bathroom::load_all(Some(builder.build()), sort, db).await?;
            let str = match output.full {
                true => output::format_seq(bathrooms.iter().map(BathroomRowFull::new), output.format)?,
                false => output::format_seq(bathrooms.iter().map(BathroomRow::new), output.format)?,
            };
            println!("{str}");
            Ok(())
        }
        Commands::Show { id, format } => match Bathroom::load(id, db).await {
            Ok(b) => {
                let str = output::format_one(BathroomRowDetails::new(&b)?, format)?;
                println!("{str}");
                Ok(())
            }
            Err(DatabaseError(sqlx::Error::RowNotFound)) => {
                println!("Bathroom {id} not found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        Commands::Add {
            name,
            address,
            zip,
            hours,
            remarks,
            latitude,
            longitude,
        } => {
            let mut b = if name.is_none()
                && address.is_none()
                && zip.is_none()
                && hours.is_none()
                && remarks.is_none()
                && latitude.is_none()
                && longitude.is_none()
            {
                prompt_bathroom()?
            } else {
                Bathroom::new(
                    name.ok_or_else(|| anyhow!("No name specified"))?,
                    address.unwrap_or_default(),
                    zip.unwrap_or_default(),
                    hours.unwrap_or_default(),
                    remarks.unwrap_or_default(),
                    latitude,
                    longitude,
                )
            };
            check_coordinates(&b)?;
            if geocode_if_needed(&mut b, geocoder).await {
                println!(
                    "Found coordinates {}, {}",
                    b.latitude.unwrap_or_default(),
                    b.longitude.unwrap_or_default()
                );
            }
            let newid = b.insert(db).await?.last_insert_rowid();
            println!("Added bathroom {newid} to database");
            Ok(())
        }
        Commands::Modify {
            id,
            name,
            address,
            zip,
            hours,
            remarks,
            latitude,
            longitude,
        } => {
            let mut b = Bathroom::load(id, db)
                .await
                .with_context(|| format!("Unable to load bathroom {id}"))?;
            if let Some(name) = name {
                b.name = name;
            }
            if let Some(address) = address {
                b.address = address;
            }
            if let Some(zip) = zip {
                b.zip = zip;
            }
            if let Some(hours) = hours {
                b.hours = hours;
            }
            if let Some(remarks) = remarks {
                b.remarks = remarks;
            }
            if let Some(latitude) = latitude {
                b.latitude = Some(latitude);
            }
            if let Some(longitude) = longitude {
                b.longitude = Some(longitude);
            }
            check_coordinates(&b)?;
            geocode_if_needed(&mut b, geocoder).await;
            b.update(db).await?;
            println!("Modified bathroom {id}");
            Ok(())
        }
        Commands::Remove { id, yes } => {
            let confirmed = yes
                || inquire::Confirm::new(&format!("Really remove bathroom {id}?"))
                    .with_default(false)
                    .prompt()?;
            if confirmed {
                let res = Bathroom::delete_id(&id, db)
                    .await
                    .with_context(|| "failed to remove bathroom")?;
                match res.rows_affected() {
                    0 => println!("Bathroom {id} not found"),
                    _ => println!("Removed bathroom {id} from database"),
                }
            }
            Ok(())
        }
        Commands::Geocode => {
            let geocoder =
                geocoder.ok_or_else(|| anyhow!("Geocoding is disabled by --no-geocode"))?;
            let found = geocode_missing(db, geocoder, GEOCODE_INTERVAL).await?;
            println!("Found coordinates for {found} bathrooms");
            Ok(())
        }
        Commands::Import { .. } | Commands::Clean { .. } => {
            Err(anyhow!("Command is not handled here"))
        }
    }
}

/// Coordinates that were entered explicitly must be usable. Zero counts as
/// blank.
fn check_coordinates(b: &Bathroom) -> Result<()> {
    match (b.latitude, b.longitude) {
        (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => {
            libbathroom::map::LatLng::new(lat, lng)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Look up coordinates for every bathroom that is missing them and return the
/// number of bathrooms that were updated
pub(crate) async fn geocode_missing(
    db: &Database,
    geocoder: &dyn Geocoder,
    interval: Duration,
) -> Result<usize> {
    let missing = Bathroom::load_all(
        Some(bathroom::Filter::MissingCoordinates.into()),
        Some(bathroom::SortField::Id.into()),
        db,
    )
    .await?;
    debug!(count = missing.len(), "Geocoding bathrooms");
    let progress = ProgressBar::new(missing.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        progress.set_style(style);
    }
    let mut found = 0;
    for (i, mut b) in missing.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        progress.set_message(b.name.clone());
        if geocode_if_needed(&mut b, Some(geocoder)).await {
            b.update(db).await?;
            found += 1;
        } else {
            info!(id = b.id, name = %b.name, "No coordinates found");
        }
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingGeocoder, FixedGeocoder};
    use libbathroom::map::LatLng;
    use sqlx::{Pool, Sqlite};
    use test_log::test;

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../../db/fixtures", scripts("bathrooms"))
    ))]
    async fn test_geocode_missing(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let geocoder = FixedGeocoder(Some(LatLng::new(42.41, -71.15).unwrap()));
        let found = geocode_missing(&db, &geocoder, Duration::ZERO).await.unwrap();
        assert_eq!(found, 1);
        let annex = Bathroom::load(4, &db).await.unwrap();
        assert_eq!(annex.latitude, Some(42.41));
        assert_eq!(annex.longitude, Some(-71.15));
        // the others were left alone
        let lobby = Bathroom::load(3, &db).await.unwrap();
        assert_eq!(lobby.latitude, Some(40.0));

        // nothing left to do
        let found = geocode_missing(&db, &geocoder, Duration::ZERO).await.unwrap();
        assert_eq!(found, 0);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../../db/fixtures", scripts("bathrooms"))
    ))]
    async fn test_geocode_not_found(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let found = geocode_missing(&db, &FixedGeocoder(None), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(found, 0);
        assert_eq!(Bathroom::load(4, &db).await.unwrap().latitude, None);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../../db/fixtures", scripts("bathrooms"))
    ))]
    async fn test_geocoder_failure(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let mut b = Bathroom::load(4, &db).await.unwrap();
        assert!(!geocode_if_needed(&mut b, Some(&FailingGeocoder)).await);
        assert_eq!(b.latitude, None);

        // the bathroom is saved anyway, without coordinates
        handle_command(
            Commands::Add {
                name: Some("Depot".to_string()),
                address: Some("5 Station Rd".to_string()),
                zip: None,
                hours: None,
                remarks: None,
                latitude: None,
                longitude: None,
            },
            &db,
            Some(&FailingGeocoder),
        )
        .await
        .expect("add failed");
        let depot = Bathroom::load(5, &db).await.unwrap();
        assert_eq!(depot.name, "Depot");
        assert_eq!(depot.latitude, None);
        assert_eq!(depot.longitude, None);

        handle_command(
            Commands::Modify {
                id: 4,
                name: None,
                address: None,
                zip: None,
                hours: Some("24h".to_string()),
                remarks: None,
                latitude: None,
                longitude: None,
            },
            &db,
            Some(&FailingGeocoder),
        )
        .await
        .expect("modify failed");
        let annex = Bathroom::load(4, &db).await.unwrap();
        assert_eq!(annex.hours, "24h");
        assert!(!annex.has_coordinates());

        let found = geocode_missing(&db, &FailingGeocoder, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(found, 0);
    }

    #[test]
    fn test_check_coordinates() {
        let mut b = Bathroom::new(
            "Lobby".to_string(),
            "".to_string(),
            "".to_string(),
            "".to_string(),
            "".to_string(),
            Some(95.0),
            Some(-73.0),
        );
        assert!(check_coordinates(&b).is_err());
        b.latitude = Some(0.0);
        assert!(check_coordinates(&b).is_ok());
        b.latitude = Some(40.0);
        assert!(check_coordinates(&b).is_ok());
    }
}
