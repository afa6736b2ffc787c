//! Core infrastructure for storing and accessing bathroom records.
pub mod database;
pub mod error;
pub mod loadable;
pub mod query;
