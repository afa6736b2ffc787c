//! Objects to manage the bathroom locations stored in the database
use crate::{
    Database,
    core::{
        error::{Error, Result},
        loadable::Loadable,
        query::{
            DynFilterPart, SortSpecs, ToSql,
            filter::{Cmp, FilterPart},
        },
    },
    geocode::Geocoder,
    map::LatLng,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, QueryBuilder, Row, Sqlite, Transaction, sqlite::SqliteQueryResult};
use tracing::{debug, warn};

/// A type for specifying fields that can be used for filtering a database query
/// for bathrooms
#[derive(Clone)]
pub enum Filter {
    /// Match the ID of the bathroom to the given value
    Id(i64),

    /// Compare the name of the bathroom to the given value
    Name(Cmp, String),

    /// Compare the address of the bathroom to the given value
    Address(Cmp, String),

    /// Compare the zip code of the bathroom to the given value
    Zip(Cmp, String),

    /// Only match bathrooms that have no usable coordinates yet
    MissingCoordinates,
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" B.id = ").push_bind(*id),
            Self::Name(cmp, frag) => {
                builder.push(" B.name ").push(cmp).push_bind(cmp.pattern(frag));
            }
            Self::Address(cmp, frag) => {
                builder
                    .push(" B.address ")
                    .push(cmp)
                    .push_bind(cmp.pattern(frag));
            }
            Self::Zip(cmp, frag) => {
                builder.push(" B.zip ").push(cmp).push_bind(cmp.pattern(frag));
            }
            Self::MissingCoordinates => {
                builder.push(
                    " (B.latitude IS NULL OR B.longitude IS NULL OR B.latitude = 0 OR B.longitude = 0)",
                );
            }
        }
    }
}

/// The fields that a list of bathrooms can be sorted by
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Id,
    #[default]
    Name,
    Zip,
}

impl ToSql for SortField {
    fn to_sql(&self) -> String {
        match self {
            SortField::Id => "B.id",
            SortField::Name => "B.name",
            SortField::Zip => "B.zip",
        }
        .to_string()
    }
}

/// A public bathroom and the information a visitor needs to find and use it
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct Bathroom {
    /// A unique ID that identifies this bathroom in the database
    pub id: i64,

    /// The name of the building or business
    pub name: String,

    /// The street address
    pub address: String,

    /// The five-digit zip code, may be empty
    pub zip: String,

    /// The latitude of the bathroom. `None` or zero if not geocoded yet
    #[sqlx(default)]
    pub latitude: Option<f64>,

    /// The longitude of the bathroom. `None` or zero if not geocoded yet
    #[sqlx(default)]
    pub longitude: Option<f64>,

    /// Opening hours in free text
    pub hours: String,

    /// Any additional notes, may contain line breaks
    pub remarks: String,
}

#[async_trait]
impl Loadable for Bathroom {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id
    }

    fn invalid_id() -> Self::Id {
        -1
    }

    async fn load(id: Self::Id, db: &Database) -> Result<Self> {
        Self::build_query(Some(Filter::Id(id).into()), None)
            .build_query_as()
            .fetch_one(db.pool())
            .await
            .map_err(|e| e.into())
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query(r#"DELETE FROM bm_bathrooms WHERE id=?1"#)
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl Bathroom {
    fn build_query(
        filter: Option<DynFilterPart>,
        sort: Option<SortSpecs<SortField>>,
    ) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(
            r#"SELECT B.id, B.name, B.address, B.zip, B.latitude, B.longitude,
            B.hours, B.remarks FROM bm_bathrooms B"#,
        );
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        let sort = sort.unwrap_or_else(|| SortField::default().into());
        qb.push(" ");
        qb.push(sort.to_sql());
        qb
    }

    fn build_count(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) as nbathrooms FROM bm_bathrooms B");
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        qb
    }

    /// Loads all matching bathrooms from the database
    pub async fn load_all(
        filter: Option<DynFilterPart>,
        sort: Option<SortSpecs<SortField>>,
        db: &Database,
    ) -> Result<Vec<Bathroom>> {
        Self::build_query(filter, sort)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    pub async fn count(filter: Option<DynFilterPart>, db: &Database) -> Result<i64> {
        Self::build_count(filter)
            .build()
            .fetch_one(db.pool())
            .await?
            .try_get("nbathrooms")
            .map_err(|e| e.into())
    }

    /// Add this bathroom to the database. If this call completes successfully,
    /// the id of this object will be updated to the ID of the inserted row in the
    /// database
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        self.insert_with(db.pool()).await
    }

    /// Like [Bathroom::insert()], but the row is only written once `tx` is
    /// committed
    pub async fn insert_in(
        &mut self,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<SqliteQueryResult> {
        self.insert_with(&mut **tx).await
    }

    async fn insert_with<'e, E>(&mut self, executor: E) -> Result<SqliteQueryResult>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }

        sqlx::query(
            r#"INSERT INTO bm_bathrooms
          (name, address, zip, latitude, longitude, hours, remarks)
          VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&self.name)
        .bind(&self.address)
        .bind(&self.zip)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(&self.hours)
        .bind(&self.remarks)
        .execute(executor)
        .await
        .inspect(|r| self.id = r.last_insert_rowid())
        .map_err(|e| e.into())
    }

    /// Update the bathroom in the database such that it matches this object
    pub async fn update(&self, db: &Database) -> Result<SqliteQueryResult> {
        self.update_with(db.pool()).await
    }

    /// Like [Bathroom::update()], inside a transaction
    pub async fn update_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<SqliteQueryResult> {
        self.update_with(&mut **tx).await
    }

    async fn update_with<'e, E>(&self, executor: E) -> Result<SqliteQueryResult>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if self.id < 0 {
            return Err(Error::InvalidUpdateObjectNotFound);
        }

        sqlx::query(
            "UPDATE bm_bathrooms SET name=?, address=?, zip=?, latitude=?, longitude=?, hours=?, remarks=? WHERE id=?",
        )
        .bind(&self.name)
        .bind(&self.address)
        .bind(&self.zip)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(&self.hours)
        .bind(&self.remarks)
        .bind(self.id)
        .execute(executor)
        .await
        .map_err(|e| e.into())
    }

    pub async fn delete_id_in(
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<SqliteQueryResult> {
        sqlx::query(r#"DELETE FROM bm_bathrooms WHERE id=?1"#)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| e.into())
    }

    /// Creates a new bathroom object with the given data. It will initially have
    /// an invalid ID until it is inserted into the database
    pub fn new(
        name: String,
        address: String,
        zip: String,
        hours: String,
        remarks: String,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Self {
        Self {
            id: Self::invalid_id(),
            name,
            address,
            zip,
            latitude,
            longitude,
            hours,
            remarks,
        }
    }

    /// Whether both coordinates have been entered. A coordinate of exactly
    /// zero is treated as blank.
    pub fn has_coordinates(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0
        )
    }

    /// The coordinates of this bathroom, if they have been entered and are valid
    pub fn position(&self) -> Option<LatLng> {
        match (self.has_coordinates(), self.latitude, self.longitude) {
            (true, Some(lat), Some(lng)) => LatLng::new(lat, lng).ok(),
            _ => None,
        }
    }

    /// The text that is sent to a geocoder to look up the coordinates of this
    /// bathroom
    pub fn geocode_query(&self) -> String {
        let address = self.address.trim();
        let zip = self.zip.trim();
        if zip.is_empty() {
            address.to_string()
        } else {
            format!("{address}, {zip}")
        }
    }

    /// Look up the coordinates for this bathroom from its address if they
    /// haven't been entered. Returns `true` if the coordinates were filled in.
    /// A failed lookup leaves the coordinates blank.
    pub async fn ensure_coordinates(&mut self, geocoder: &dyn Geocoder) -> Result<bool> {
        if self.has_coordinates() {
            return Ok(false);
        }
        let query = self.geocode_query();
        if query.is_empty() {
            return Ok(false);
        }
        debug!(?query, "Geocoding bathroom address");
        match geocoder.geocode(&query).await? {
            Some(point) => {
                self.latitude = Some(point.lat);
                self.longitude = Some(point.lng);
                Ok(true)
            }
            None => {
                warn!(?query, "No coordinates found for address");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{
        SortOrder, SortSpec,
        filter::{and, or},
    };
    use sqlx::Pool;
    use test_log::test;

    struct FixedGeocoder(Option<LatLng>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _query: &str) -> Result<Option<LatLng>> {
            Ok(self.0)
        }
    }

    fn lobby() -> Bathroom {
        Bathroom::new(
            "Lobby".to_string(),
            "1 Main St".to_string(),
            "10001".to_string(),
            "9-5".to_string(),
            "Line1\nLine2".to_string(),
            Some(40.0),
            Some(-73.0),
        )
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_insert_bathrooms(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        async fn check(db: &Database, mut bathroom: Bathroom) {
            let res = bathroom.insert(db).await.expect("failed to insert");
            assert_eq!(res.rows_affected(), 1);
            assert_eq!(bathroom.id, res.last_insert_rowid());
            let loaded = Bathroom::load(res.last_insert_rowid(), db)
                .await
                .expect("Failed to load inserted object");
            assert_eq!(bathroom, loaded);
        }

        check(&db, lobby()).await;
        let mut b = lobby();
        b.latitude = None;
        check(&db, b).await;
        check(
            &db,
            Bathroom::new(
                "".to_string(),
                "".to_string(),
                "".to_string(),
                "".to_string(),
                "".to_string(),
                None,
                None,
            ),
        )
        .await;

        // inserting twice is an error
        let mut b = lobby();
        b.insert(&db).await.expect("failed to insert");
        assert!(matches!(
            b.insert(&db).await,
            Err(Error::InvalidInsertObjectAlreadyExists(_))
        ));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("bathrooms"))
    ))]
    async fn test_update_and_delete(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let mut b = Bathroom::load(2, &db).await.expect("Failed to load");
        assert_eq!(b.name, "Cambridge City Hall");
        b.hours = "Mon-Fri 8:30-5".to_string();
        b.update(&db).await.expect("Failed to update");
        assert_eq!(Bathroom::load(2, &db).await.unwrap().hours, "Mon-Fri 8:30-5");

        assert!(matches!(
            lobby().update(&db).await,
            Err(Error::InvalidUpdateObjectNotFound)
        ));

        b.delete(&db).await.expect("Failed to delete");
        assert_eq!(b.id, -1);
        assert!(matches!(
            Bathroom::load(2, &db).await,
            Err(Error::DatabaseError(sqlx::Error::RowNotFound))
        ));
        assert_eq!(Bathroom::count(None, &db).await.unwrap(), 3);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("bathrooms"))
    ))]
    async fn test_transaction_writes(pool: Pool<Sqlite>) {
        let db = Database::from(pool);

        // nothing is written when a batch fails partway
        let mut hall = Bathroom::load(2, &db).await.unwrap();
        let mut tx = db.begin().await.expect("Failed to begin");
        let mut first = lobby();
        first.insert_in(&mut tx).await.expect("failed to insert");
        hall.name = "Renamed".to_string();
        hall.update_in(&mut tx).await.expect("Failed to update");
        Bathroom::delete_id_in(1, &mut tx)
            .await
            .expect("Failed to delete");
        let mut long_zip = lobby();
        long_zip.zip = "94301-1234".to_string();
        assert!(matches!(
            long_zip.insert_in(&mut tx).await,
            Err(Error::DatabaseError(_))
        ));
        tx.rollback().await.expect("Failed to roll back");
        assert_eq!(Bathroom::count(None, &db).await.unwrap(), 4);
        assert_eq!(
            Bathroom::load(2, &db).await.unwrap().name,
            "Cambridge City Hall"
        );

        let mut tx = db.begin().await.expect("Failed to begin");
        let mut b = lobby();
        b.insert_in(&mut tx).await.expect("failed to insert");
        Bathroom::delete_id_in(1, &mut tx)
            .await
            .expect("Failed to delete");
        tx.commit().await.expect("Failed to commit");
        assert_eq!(Bathroom::count(None, &db).await.unwrap(), 4);
        assert_eq!(Bathroom::load(b.id, &db).await.unwrap(), b);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("bathrooms"))
    ))]
    async fn test_filter_bathrooms(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let all = Bathroom::load_all(None, None, &db).await.unwrap();
        assert_eq!(
            all.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            [
                "Belmont Public Library",
                "Cambridge City Hall",
                "Lobby",
                "Town Hall Annex"
            ]
        );

        let halls = Bathroom::load_all(
            Some(Filter::Name(Cmp::Like, "hall".to_string()).into()),
            Some(SortSpec::new(SortField::Id, SortOrder::Descending).into()),
            &db,
        )
        .await
        .unwrap();
        assert_eq!(halls.iter().map(|b| b.id).collect::<Vec<_>>(), [4, 2]);

        let filter = or()
            .push(Filter::Zip(Cmp::Equal, "02139".to_string()))
            .push(
                and()
                    .push(Filter::Address(Cmp::Like, "Main".to_string()))
                    .push(Filter::Id(3))
                    .build(),
            )
            .build();
        assert_eq!(Bathroom::count(Some(filter), &db).await.unwrap(), 2);

        let missing =
            Bathroom::load_all(Some(Filter::MissingCoordinates.into()), None, &db)
                .await
                .unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "Town Hall Annex");
    }

    #[test(tokio::test)]
    async fn test_ensure_coordinates() {
        let point = LatLng::new(42.4, -71.1).unwrap();
        let geocoder = FixedGeocoder(Some(point));

        // already has coordinates
        let mut b = lobby();
        assert!(!b.ensure_coordinates(&geocoder).await.unwrap());
        assert_eq!(b.latitude, Some(40.0));

        // zero is treated as blank
        b.latitude = Some(0.0);
        assert!(!b.has_coordinates());
        assert!(b.ensure_coordinates(&geocoder).await.unwrap());
        assert_eq!(b.position(), Some(point));

        // geocoder finds nothing
        b.longitude = None;
        assert!(!b.ensure_coordinates(&FixedGeocoder(None)).await.unwrap());
        assert_eq!(b.longitude, None);
        assert_eq!(b.position(), None);
    }

    #[test]
    fn test_geocode_query() {
        let mut b = lobby();
        assert_eq!(b.geocode_query(), "1 Main St, 10001");
        b.zip = " ".to_string();
        assert_eq!(b.geocode_query(), "1 Main St");
    }
}
