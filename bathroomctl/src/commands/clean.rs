//! The `bathroomctl clean` command
use crate::output::{self, OutputFormat, rows::CleanupRow};
use anyhow::Result;
use libbathroom::{
    Database,
    cleanup::{self, CleanupOptions},
    geocode::{HoursLookup, OverpassHoursLookup},
};

pub(crate) async fn handle_command(
    dry_run: bool,
    skip_hours_fetch: bool,
    user_agent: &str,
    db: &Database,
) -> Result<()> {
    let options = CleanupOptions {
        dry_run,
        fetch_hours: !skip_hours_fetch,
        ..Default::default()
    };
    let lookup = match options.fetch_hours {
        true => Some(OverpassHoursLookup::new(user_agent)?),
        false => None,
    };
    let report = cleanup::run(
        db,
        &options,
        lookup.as_ref().map(|l| l as &dyn HoursLookup),
    )
    .await?;
    if dry_run {
        println!("Dry run, no changes were saved");
    }
    let str = output::format_seq(CleanupRow::from_report(&report), OutputFormat::Table)?;
    println!("{str}");
    Ok(())
}
