//! Tidying up bathroom records that were imported from external data sets.
//!
//! The cleanup runs a fixed sequence of steps over a snapshot of all
//! bathrooms:
//!
//! 1. names and addresses are converted to title case
//! 2. a missing state abbreviation is added to the address from the zip code
//! 3. names of libraries and town or city halls get a consistent suffix
//! 4. hours that are really numeric codes are cleared
//! 5. missing hours are optionally looked up from OpenStreetMap
//! 6. records at the same location are merged, keeping the most useful one
//!
//! Each step sees the result of the previous ones. Changes are written to the
//! database in a single transaction at the end unless a dry run was requested.
use crate::{
    Database, Result,
    address::{ensure_state_in_address, title_case},
    bathroom::{Bathroom, SortField},
    core::query::{SortOrder, SortSpec},
    geocode::{HoursLookup, is_numeric_code},
};
use serde::Serialize;
use std::{collections::BTreeMap, collections::HashSet, time::Duration};
use tracing::{debug, info, warn};

/// Pause between two requests to the opening hours service
pub const HOURS_REQUEST_INTERVAL: Duration = Duration::from_millis(1050);

#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Compute what would change without writing anything
    pub dry_run: bool,
    /// Look up missing opening hours
    pub fetch_hours: bool,
    pub request_interval: Duration,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            fetch_hours: true,
            request_interval: HOURS_REQUEST_INTERVAL,
        }
    }
}

/// The number of records affected by each cleanup step
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CleanupReport {
    pub title_cased: usize,
    pub state_added: usize,
    pub suffixed: usize,
    pub hours_cleared: usize,
    pub hours_fetched: usize,
    pub duplicates_removed: usize,
    /// Number of bathrooms left after the cleanup
    pub remaining: usize,
}

/// Whether the hours are a numeric code rather than actual opening hours
pub fn is_bogus_hours(hours: &str) -> bool {
    is_numeric_code(hours.trim())
}

/// Adds a `Library`, `Town Hall` or `City Hall` suffix to names that refer to
/// one of those but don't end with it
pub fn ensure_suffix(name: &str) -> String {
    let name = name.trim();
    let lower = name.to_lowercase();
    if lower.ends_with(" lib") {
        return format!("{}Library", &name[..name.len() - 3]);
    }
    if (lower.contains("library") || lower.contains(" lib ")) && !lower.ends_with("library") {
        return format!("{name} Library");
    }
    if lower.contains("municipal") && !lower.contains("city hall") {
        return format!("{name} City Hall");
    }
    if (lower.contains("town hall") || lower.contains("city hall"))
        && !(lower.ends_with("town hall") || lower.ends_with("city hall"))
    {
        let suffix = if lower.contains("city") {
            "City Hall"
        } else {
            "Town Hall"
        };
        return format!("{name} {suffix}");
    }
    name.to_string()
}

fn coordinate_key(bathroom: &Bathroom) -> Option<(i64, i64)> {
    let point = bathroom.position()?;
    Some((
        (point.lat * 1e5).round() as i64,
        (point.lng * 1e5).round() as i64,
    ))
}

// higher is better
fn usefulness(bathroom: &Bathroom) -> (bool, bool, usize) {
    let has_hours = !bathroom.hours.trim().is_empty() && !is_bogus_hours(&bathroom.hours);
    let has_remarks = !bathroom.remarks.trim().is_empty();
    (
        has_hours,
        has_remarks,
        bathroom.hours.len() + bathroom.remarks.len(),
    )
}

struct Snapshot {
    bathrooms: Vec<Bathroom>,
    modified: HashSet<i64>,
}

impl Snapshot {
    /// Apply `f` to every bathroom and return how many of them it changed
    fn apply<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&mut Bathroom) -> bool,
    {
        let mut n = 0;
        for b in self.bathrooms.iter_mut() {
            if f(b) {
                self.modified.insert(b.id);
                n += 1;
            }
        }
        n
    }
}

async fn fetch_hours(
    snapshot: &mut Snapshot,
    lookup: &dyn HoursLookup,
    interval: Duration,
) -> usize {
    let mut fetched = 0;
    let mut first = true;
    for b in snapshot.bathrooms.iter_mut() {
        if !b.hours.trim().is_empty() && !is_bogus_hours(&b.hours) {
            continue;
        }
        let Some(point) = b.position() else {
            continue;
        };
        if !first {
            tokio::time::sleep(interval).await;
        }
        first = false;
        match lookup.opening_hours(point).await {
            Ok(Some(hours)) => {
                debug!(id = b.id, %hours, "Found opening hours");
                b.hours = hours;
                snapshot.modified.insert(b.id);
                fetched += 1;
            }
            Ok(None) => (),
            Err(e) => warn!(id = b.id, "Failed to look up opening hours: {e}"),
        }
    }
    fetched
}

/// Returns the ids of all bathrooms that duplicate another one at the same
/// location
fn find_duplicates(bathrooms: &[Bathroom]) -> Vec<i64> {
    let mut groups: BTreeMap<(i64, i64), Vec<&Bathroom>> = BTreeMap::new();
    for b in bathrooms {
        if let Some(key) = coordinate_key(b) {
            groups.entry(key).or_default().push(b);
        }
    }
    groups
        .into_values()
        .filter(|group| group.len() > 1)
        .flat_map(|mut group| {
            // stable, so ties keep the record that was created first
            group.sort_by(|a, b| usefulness(b).cmp(&usefulness(a)));
            group.into_iter().skip(1).map(|b| b.id).collect::<Vec<_>>()
        })
        .collect()
}

/// Runs all cleanup steps. Opening hours are only fetched if `hours` is given
/// and the options ask for it.
pub async fn run(
    db: &Database,
    options: &CleanupOptions,
    hours: Option<&dyn HoursLookup>,
) -> Result<CleanupReport> {
    let bathrooms = Bathroom::load_all(
        None,
        Some(SortSpec::new(SortField::Id, SortOrder::Ascending).into()),
        db,
    )
    .await?;
    let mut snapshot = Snapshot {
        bathrooms,
        modified: HashSet::new(),
    };
    let mut report = CleanupReport {
        title_cased: snapshot.apply(|b| {
            let (name, address) = (title_case(&b.name), title_case(&b.address));
            let changed = name != b.name || address != b.address;
            b.name = name;
            b.address = address;
            changed
        }),
        ..Default::default()
    };
    info!(n = report.title_cased, "Converted names and addresses to title case");

    report.state_added = snapshot.apply(|b| {
        let address = ensure_state_in_address(&b.address, &b.zip);
        let changed = address != b.address;
        b.address = address;
        changed
    });
    info!(n = report.state_added, "Added state to addresses");

    report.suffixed = snapshot.apply(|b| {
        let name = ensure_suffix(&title_case(&b.name));
        let changed = name != b.name;
        b.name = name;
        changed
    });
    info!(n = report.suffixed, "Added name suffixes");

    report.hours_cleared = snapshot.apply(|b| {
        let bogus = is_bogus_hours(&b.hours);
        if bogus {
            b.hours.clear();
        }
        bogus
    });
    info!(n = report.hours_cleared, "Cleared bogus hours");

    if let (true, Some(lookup)) = (options.fetch_hours, hours) {
        report.hours_fetched = fetch_hours(&mut snapshot, lookup, options.request_interval).await;
        info!(n = report.hours_fetched, "Fetched opening hours");
    }

    let duplicates = find_duplicates(&snapshot.bathrooms);
    report.duplicates_removed = duplicates.len();
    report.remaining = snapshot.bathrooms.len() - duplicates.len();
    info!(n = report.duplicates_removed, "Found duplicate locations");

    if options.dry_run {
        info!("Dry run, not saving any changes");
        return Ok(report);
    }

    let mut tx = db.begin().await?;
    for b in snapshot
        .bathrooms
        .iter()
        .filter(|b| snapshot.modified.contains(&b.id) && !duplicates.contains(&b.id))
    {
        b.update_in(&mut tx).await?;
    }
    for id in duplicates.iter() {
        debug!(id, "Removing duplicate bathroom");
        Bathroom::delete_id_in(*id, &mut tx).await?;
    }
    tx.commit().await?;
    Ok(report)
}
