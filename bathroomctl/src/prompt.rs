//! Interactive prompts for entering bathrooms
use anyhow::Result;
use inquire::{CustomType, Text, validator::Validation};
use libbathroom::bathroom::Bathroom;

fn optional_text(message: &str) -> Result<String> {
    Ok(Text::new(message)
        .prompt_skippable()?
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

fn coordinate(message: &str, limit: f64) -> Result<Option<f64>> {
    CustomType::<f64>::new(message)
        .with_help_message("Leave empty to look it up from the address")
        .with_validator(move |val: &f64| {
            if val.abs() <= limit {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(
                    format!("Must be between -{limit} and {limit}").into(),
                ))
            }
        })
        .prompt_skippable()
        .map_err(|e| e.into())
}

/// Ask the user for all of the fields of a new bathroom
pub(crate) fn prompt_bathroom() -> Result<Bathroom> {
    let name = Text::new("Name:")
        .with_validator(|s: &str| match s.trim().is_empty() {
            true => Ok(Validation::Invalid("A name is required".into())),
            false => Ok(Validation::Valid),
        })
        .prompt()?;
    let address = optional_text("Address:")?;
    let zip = optional_text("Zip code:")?;
    let hours = optional_text("Hours:")?;
    let remarks = optional_text("Remarks:")?;
    let latitude = coordinate("Latitude:", 90.0)?;
    let longitude = match latitude {
        Some(_) => coordinate("Longitude:", 180.0)?,
        None => None,
    };
    Ok(Bathroom::new(
        name.trim().to_string(),
        address,
        zip,
        hours,
        remarks,
        latitude,
        longitude,
    ))
}
