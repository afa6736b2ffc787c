use crate::{
    test_app,
    testing::{body_string, geocoder, get},
};
use axum::http::{StatusCode, header::CONTENT_TYPE};
use libbathroom::bathroom::Bathroom;
use sqlx::{Pool, Sqlite};
use test_log::test;

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../db/fixtures", scripts("bathrooms"))
))]
async fn test_list_bathrooms(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/api/bathrooms/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    let body = body_string(response).await;
    let bathrooms: Vec<Bathroom> = serde_json::from_str(&body).expect("invalid json");
    assert_eq!(
        bathrooms.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(bathrooms[3].latitude, None);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../db/fixtures", scripts("bathrooms"))
))]
async fn test_show_bathroom(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/api/bathrooms/3").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let value: serde_json::Value = serde_json::from_str(&body).expect("invalid json");
    assert_eq!(value["name"], "Lobby");
    assert_eq!(value["zip"], "10001");
    assert_eq!(value["latitude"], 40.0);
    assert_eq!(value["longitude"], -73.0);
    assert_eq!(value["hours"], "9-5");
    assert_eq!(value["remarks"], "Line1\nLine2");

    let response = get(&mut app, "/api/bathrooms/99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    let value: serde_json::Value = serde_json::from_str(&body).expect("invalid json");
    assert_eq!(value["error"], "No bathroom with id 99");
}
