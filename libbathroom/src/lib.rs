//! This is a library that provides objects and functionality to keep track of
//! public bathroom locations in a database and to render them as markers on an
//! interactive map.

pub mod address;
pub mod bathroom;
pub mod cleanup;
pub mod core;
pub mod distance;
pub mod geocode;
pub mod map;

pub use crate::core::database::Database;
pub use crate::core::error::Error;
pub use crate::core::error::Result;

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// A serde helper that treats an empty form value the same as a missing one
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s)
            .map_err(serde::de::Error::custom)
            .map(Some),
    }
}
