use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use libbathroom::geocode::DEFAULT_USER_AGENT;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short,
        long,
        env = "BATHROOM_DATABASE",
        default_value = "bathrooms.sqlite"
    )]
    pub database: PathBuf,
    #[arg(
        long,
        env = "BATHROOM_USER_AGENT",
        default_value = DEFAULT_USER_AGENT,
        help = "User agent sent to the geocoding and opening hours services"
    )]
    pub user_agent: String,
    #[arg(long, global = true, help = "Never look up coordinates for addresses")]
    pub no_geocode: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct OutputOptions {
    #[arg(short, long, help = "Show all fields")]
    pub full: bool,
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Output format"
    )]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum BathroomSortField {
    Id,
    Name,
    Zip,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "List bathrooms")]
    List {
        #[arg(long, help = "Only show bathrooms whose name or address contains this text")]
        filter: Option<String>,
        #[arg(long, help = "Only show bathrooms that have no coordinates")]
        missing_coordinates: bool,
        #[arg(long, value_enum)]
        sort: Option<BathroomSortField>,
        #[arg(long, requires = "sort")]
        reverse: bool,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "Show all details about a bathroom")]
    Show {
        id: i64,
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value_t = OutputFormat::Table
        )]
        format: OutputFormat,
    },
    #[command(about = "Add a new bathroom to the database")]
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        #[arg(long)]
        hours: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
        #[arg(long = "lat", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long = "long", allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    #[command(
        about = "Modify properties of a bathroom",
        group(
            clap::ArgGroup::new("modify")
                .required(true)
                .multiple(true)
                .args(&["name", "address", "zip", "hours", "remarks", "latitude", "longitude"]),
        ))]
    Modify {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        #[arg(long)]
        hours: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
        #[arg(long = "lat", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long = "long", allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    #[command(about = "Remove a bathroom from the database")]
    Remove {
        id: i64,
        #[arg(short, long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Look up coordinates for all bathrooms that don't have any")]
    Geocode,
    #[command(about = "Import bathrooms from a CSV file")]
    Import {
        #[arg(help = "CSV file with the columns name, address, zip, hours, remarks, latitude, longitude")]
        file: PathBuf,
    },
    #[command(about = "Normalize names, addresses and hours and remove duplicates")]
    Clean {
        #[arg(long, help = "Show what would change without modifying the database")]
        dry_run: bool,
        #[arg(long, help = "Don't look up missing opening hours")]
        skip_hours_fetch: bool,
    },
}
