pub(crate) mod bathrooms;
pub(crate) mod clean;
pub(crate) mod import;
