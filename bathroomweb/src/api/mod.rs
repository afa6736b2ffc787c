use crate::{error::Error, state::AppState};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use libbathroom::{
    bathroom::{Bathroom, SortField},
    core::{
        loadable::Loadable,
        query::{SortOrder, SortSpec},
    },
};

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/bathrooms/", get(list_bathrooms))
        .route("/bathrooms/{id}", get(show_bathroom))
}

async fn list_bathrooms(State(state): State<AppState>) -> Result<Json<Vec<Bathroom>>, Error> {
    let bathrooms = Bathroom::load_all(
        None,
        Some(SortSpec::new(SortField::Id, SortOrder::Ascending).into()),
        &state.db,
    )
    .await?;
    Ok(Json(bathrooms))
}

async fn show_bathroom(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Bathroom>, Error> {
    match Bathroom::load(id, &state.db).await {
        Ok(bathroom) => Ok(Json(bathroom)),
        Err(libbathroom::Error::DatabaseError(sqlx::Error::RowNotFound)) => {
            Err(Error::NotFound(format!("No bathroom with id {id}")))
        }
        Err(e) => Err(e.into()),
    }
}
