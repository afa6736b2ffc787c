//! This is a command-line tool to manage the bathroom database via [libbathroom]
use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use libbathroom::{
    Database,
    geocode::{Geocoder, NominatimGeocoder},
};
use tracing::debug;

mod cli;
mod commands;
mod output;
mod prompt;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();
    debug!(?args.database, "Opening database");
    let db = Database::open(&args.database)
        .await
        .with_context(|| format!("Unable to open database {:?}", args.database))?;
    let nominatim = match args.no_geocode {
        true => None,
        false => Some(NominatimGeocoder::new(&args.user_agent)?),
    };
    let geocoder = nominatim.as_ref().map(|g| g as &dyn Geocoder);

    match args.command {
        Commands::Import { file } => commands::import::handle_command(file, &db, geocoder).await,
        Commands::Clean {
            dry_run,
            skip_hours_fetch,
        } => commands::clean::handle_command(dry_run, skip_hours_fetch, &args.user_agent, &db).await,
        command => commands::bathrooms::handle_command(command, &db, geocoder).await,
    }
}
