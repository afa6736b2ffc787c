use crate::{
    test_app,
    testing::{body_string, failing_geocoder, geocoder, get},
};
use axum::http::{StatusCode, header::LOCATION};
use sqlx::{Pool, Sqlite};
use test_log::test;

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_root_redirects_to_map(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/").await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "/map/");
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("bathrooms"))
))]
async fn test_map(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/map/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    // the record without coordinates is left out
    assert!(body.contains(r#"data-markers="3""#));
    assert!(body.contains(r#"data-skipped="1""#));
    assert!(body.contains("query=40%2C-73"));
    assert!(body.contains(r#""kind":"fit""#));
    assert!(body.contains(r#""max_zoom":15"#));
    assert!(body.contains(r#""padding":100"#));
    assert!(!body.contains("miles away"));
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_empty_map(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/map/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(r#"data-markers="0""#));
    assert!(!body.contains(r#""kind":"fit""#));
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("bathrooms"))
))]
async fn test_map_city(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/map/?city=belmont-massachusetts").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Belmont, Massachusetts"));
    assert!(body.contains("miles away"));
    assert!(body.contains(r#""zoom":13"#));

    // an empty parameter is the same as no parameter
    let response = get(&mut app, "/map/?city=").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&mut app, "/map/?city=atlantis").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("Unknown city"));

    // the geocoder doesn't know this one
    let response = get(&mut app, "/map/?city=springfield-narnia").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("bathrooms"))
))]
async fn test_map_city_geocoder_failure(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, failing_geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/map/?city=belmont-massachusetts").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("<h1>500 Internal Server Error</h1>"));
    assert!(body.contains("Unable to look up the location"));
    // the error details stay in the log
    assert!(!body.contains("service unavailable"));

    // without a city nothing is looked up
    let response = get(&mut app, "/map/").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("bathrooms"))
))]
async fn test_list(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/list?latitude=42.36&longitude=-71.1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let cambridge = body.find("Cambridge City Hall").expect("missing Cambridge");
    let belmont = body
        .find("Belmont Public Library")
        .expect("missing Belmont");
    let lobby = body.find("Lobby").expect("missing Lobby");
    assert!(cambridge < belmont);
    assert!(belmont < lobby);
    assert!(!body.contains("Town Hall Annex"));
    assert!(body.contains("Line1<br>Line2"));

    let response = get(&mut app, "/list?latitude=42.3").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_string(response).await;
    assert!(body.contains("Missing parameter &#x27;longitude&#x27;"));

    let response = get(&mut app, "/list").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = get(&mut app, "/list?latitude=north&longitude=-71").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = get(&mut app, "/list?latitude=95&longitude=-71").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_static_pages(pool: Pool<Sqlite>) {
    let (mut app, _state) = test_app(pool, geocoder())
        .await
        .expect("failed to create test app");
    let response = get(&mut app, "/privacy/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Privacy"));

    let response = get(&mut app, "/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("404"));
}
