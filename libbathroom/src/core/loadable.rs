//! A trait for objects that can be loaded from and removed from the database
use crate::{Database, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteQueryResult;

#[async_trait]
pub trait Loadable {
    type Id: Send + Sync;

    /// The id of this object in the database
    fn id(&self) -> Self::Id;

    /// Set the database id of this object
    fn set_id(&mut self, id: Self::Id);

    /// An id value that indicates the object has not been inserted yet
    fn invalid_id() -> Self::Id;

    /// Load the object with the given id from the database
    async fn load(id: Self::Id, db: &Database) -> Result<Self>
    where
        Self: Sized;

    /// Remove the object with the given id from the database
    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult>;

    /// Remove this object from the database. On success, the id of this
    /// object is reset to [Loadable::invalid_id()]
    async fn delete(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        let res = Self::delete_id(&self.id(), db).await?;
        self.set_id(Self::invalid_id());
        Ok(res)
    }
}
