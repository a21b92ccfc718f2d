//! Integration tests for the Artisan Catalog Service
//!
//! Drives the full router over an in-memory catalog store, a temp-dir asset
//! store, and the pass-through enricher (the configuration the service runs
//! with when no external credentials are present).

use artisan_catalog::{create_router, AppState, AssetStore, IdentityEnricher, MemoryCatalog};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Helper to create a test app backed by a temporary media directory
fn create_test_app() -> (Router, tempfile::TempDir) {
    let media_dir = tempfile::tempdir().unwrap();
    let assets = AssetStore::new(media_dir.path(), None).unwrap();

    let state = AppState::new(
        Arc::new(MemoryCatalog::new()),
        assets,
        Arc::new(IdentityEnricher),
        false,
    );

    (create_router(state), media_dir)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, file)))
        .unwrap()
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn sample_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 16, |x, y| {
        image::Rgb([(x * 16) as u8, (y * 16) as u8, 120])
    });
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .unwrap();
    out
}

async fn register_artisan(app: &Router, name: &str, location: &str, bio: &str) -> i64 {
    let (status, body) = send_json(
        app,
        json_request(
            "POST",
            "/register_artisan",
            &json!({
                "name": name,
                "location": location,
                "language": "English",
                "bio": bio,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap()
}

async fn upload_product(
    app: &Router,
    artisan_id: i64,
    name: &str,
    price: &str,
    file: (&str, &[u8]),
) -> Value {
    let artisan_id = artisan_id.to_string();
    let (status, body) = send_json(
        app,
        multipart_request(
            "POST",
            "/upload_product",
            &[
                ("artisan_id", artisan_id.as_str()),
                ("product_name", name),
                ("price", price),
            ],
            Some(file),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_health_check() {
    let (app, _media) = create_test_app();

    let (status, body) = send_json(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "artisan-catalog");
    assert_eq!(body["enrichment_enabled"], false);
}

#[tokio::test]
async fn test_register_without_enrichment_stores_identity_bios() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "I make blue pottery").await;

    let (status, body) = send_json(&app, get(&format!("/artisan/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio_original"], "I make blue pottery");
    assert_eq!(body["bio_translated"], "I make blue pottery");
    assert_eq!(body["bio_enriched"], "I make blue pottery");
    assert_eq!(body["language"], "English");
    assert_eq!(body["products"], json!([]));
}

#[tokio::test]
async fn test_register_requires_name_and_location() {
    let (app, _media) = create_test_app();

    let (status, body) = send_json(
        &app,
        json_request("POST", "/register_artisan", &json!({"name": "", "location": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, _) = send_json(
        &app,
        json_request("POST", "/register_artisan", &json!({"name": "A", "location": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_bad_contact_number() {
    let (app, _media) = create_test_app();

    let (status, body) = send_json(
        &app,
        json_request(
            "POST",
            "/register_artisan",
            &json!({"name": "A", "location": "B", "contact_number": "12345"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("contact_number"));

    // Ten digits is accepted.
    let (status, _) = send_json(
        &app,
        json_request(
            "POST",
            "/register_artisan",
            &json!({"name": "A", "location": "B", "contact_number": "9876543210"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_unknown_artisan_is_404() {
    let (app, _media) = create_test_app();

    let (status, body) = send_json(&app, get("/artisan/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Artisan not found");
}

#[tokio::test]
async fn test_update_artisan_location_only_keeps_other_fields() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "My bio").await;

    let (status, body) = send_json(
        &app,
        json_request("PUT", &format!("/artisan/{id}"), &json!({"location": "Udaipur"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["id"], id);

    let (_, profile) = send_json(&app, get(&format!("/artisan/{id}"))).await;
    assert_eq!(profile["location"], "Udaipur");
    assert_eq!(profile["name"], "Meera");
    assert_eq!(profile["language"], "English");
    assert_eq!(profile["bio_original"], "My bio");
    assert_eq!(profile["bio_translated"], "My bio");
    assert_eq!(profile["bio_enriched"], "My bio");
    assert_eq!(profile["contact_number"], "");
}

#[tokio::test]
async fn test_update_artisan_bio_rederives_translations() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "Old bio").await;

    let (status, _) = send_json(
        &app,
        json_request(
            "PUT",
            &format!("/artisan/{id}"),
            &json!({"bio": "New bio", "language": "Hindi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = send_json(&app, get(&format!("/artisan/{id}"))).await;
    assert_eq!(profile["bio_original"], "New bio");
    assert_eq!(profile["bio_translated"], "New bio");
    assert_eq!(profile["language"], "Hindi");
}

#[tokio::test]
async fn test_update_unknown_artisan_is_404() {
    let (app, _media) = create_test_app();

    let (status, _) = send_json(
        &app,
        json_request("PUT", "/artisan/42", &json!({"name": "Nobody"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_product_and_fetch_profile() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "").await;
    let body = upload_product(&app, id, "Blue Pot", "250", ("pot.jpg", &sample_jpeg())).await;

    let product_id = body["id"].as_i64().unwrap();
    let image_url = body["image"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("/static/"));
    assert!(image_url.ends_with(".jpg"));

    let (_, profile) = send_json(&app, get(&format!("/artisan/{id}"))).await;
    let products = profile["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], product_id);
    assert_eq!(products[0]["name"], "Blue Pot");
    assert_eq!(products[0]["price"], "250");
    assert_eq!(products[0]["image_url"], image_url);

    // The legacy binary route serves the stored asset.
    let (status, bytes) = send_raw(&app, get(&format!("/image/{product_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(image::load_from_memory(&bytes).is_ok());
}

#[tokio::test]
async fn test_upload_product_for_unknown_artisan_is_404() {
    let (app, _media) = create_test_app();

    let (status, body) = send_json(
        &app,
        multipart_request(
            "POST",
            "/upload_product",
            &[("artisan_id", "77"), ("product_name", "Pot")],
            Some(("pot.jpg", b"bytes")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Artisan not found");
}

#[tokio::test]
async fn test_upload_product_requires_file_and_name() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "").await;
    let id_str = id.to_string();

    let (status, _) = send_json(
        &app,
        multipart_request(
            "POST",
            "/upload_product",
            &[("artisan_id", id_str.as_str()), ("product_name", "Pot")],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        multipart_request(
            "POST",
            "/upload_product",
            &[("artisan_id", id_str.as_str())],
            Some(("pot.jpg", b"bytes")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        multipart_request(
            "POST",
            "/upload_product",
            &[("artisan_id", "not-a-number"), ("product_name", "Pot")],
            Some(("pot.jpg", b"bytes")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_non_image_serves_back_exact_bytes() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "").await;
    let raw: &[u8] = b"this is not an image at all";
    let body = upload_product(&app, id, "Odd File", "1", ("data.bin", raw)).await;
    let product_id = body["id"].as_i64().unwrap();

    let (status, bytes) = send_raw(&app, get(&format!("/image/{product_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, raw);
}

#[tokio::test]
async fn test_update_product_replaces_image_and_keeps_fields() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "").await;
    let body = upload_product(&app, id, "Blue Pot", "250", ("pot.jpg", &sample_jpeg())).await;
    let product_id = body["id"].as_i64().unwrap();
    let first_url = body["image"].as_str().unwrap().to_string();

    // Price-only update leaves the image reference alone.
    let (status, body) = send_json(
        &app,
        multipart_request(
            "PUT",
            &format!("/product/{product_id}"),
            &[("price", "300")],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, profile) = send_json(&app, get(&format!("/artisan/{id}"))).await;
    assert_eq!(profile["products"][0]["price"], "300");
    assert_eq!(profile["products"][0]["name"], "Blue Pot");
    assert_eq!(profile["products"][0]["image_url"], first_url);

    // A replacement file gets a fresh stored name.
    let (status, _) = send_json(
        &app,
        multipart_request(
            "PUT",
            &format!("/product/{product_id}"),
            &[],
            Some(("new.jpg", &sample_jpeg())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = send_json(&app, get(&format!("/artisan/{id}"))).await;
    let new_url = profile["products"][0]["image_url"].as_str().unwrap();
    assert_ne!(new_url, first_url);
}

#[tokio::test]
async fn test_update_unknown_product_is_404() {
    let (app, _media) = create_test_app();

    let (status, _) = send_json(
        &app,
        multipart_request("PUT", "/product/7", &[("price", "10")], None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_product_twice_returns_404() {
    let (app, _media) = create_test_app();

    let id = register_artisan(&app, "Meera", "Jaipur", "").await;
    let body = upload_product(&app, id, "Blue Pot", "250", ("pot.jpg", b"bytes")).await;
    let product_id = body["id"].as_i64().unwrap();

    let delete = |uri: String| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send_json(&app, delete(format!("/product/{product_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");
    assert_eq!(body["id"], product_id);

    let (status, body) = send_json(&app, delete(format!("/product/{product_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn test_find_artisan_filters_by_name_and_location() {
    let (app, _media) = create_test_app();

    register_artisan(&app, "Meera", "Jaipur", "").await;
    register_artisan(&app, "Ravi", "Jaipur", "").await;
    register_artisan(&app, "Meera Devi", "Pune", "").await;

    let (status, body) = send_json(&app, get("/find_artisan?name=meera")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send_json(&app, get("/find_artisan?name=meera&location=pune")).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Meera Devi");

    // No results is success, not an error.
    let (status, body) = send_json(&app, get("/find_artisan?name=zzz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_location_narrows() {
    let (app, _media) = create_test_app();

    let meera = register_artisan(&app, "Meera", "Testville", "").await;
    let ravi = register_artisan(&app, "Ravi", "Pune", "").await;
    upload_product(&app, meera, "Blue Pot", "250", ("a.jpg", b"a")).await;
    upload_product(&app, ravi, "Clay Pot", "100", ("b.jpg", b"b")).await;
    upload_product(&app, ravi, "Vase", "90", ("c.jpg", b"c")).await;

    let (status, body) = send_json(&app, get("/search?q=Pot")).await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);
    for result in results {
        assert!(result["name"].as_str().unwrap().to_lowercase().contains("pot"));
    }

    let (_, body) = send_json(&app, get("/search?q=Pot&location=Testville")).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Blue Pot");
    assert_eq!(results[0]["artisan"]["name"], "Meera");

    let (_, body) = send_json(&app, get("/search?q=Pot&limit=1")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_scenario_register_upload_search() {
    let (app, _media) = create_test_app();

    // Register.
    let (status, body) = send_json(
        &app,
        json_request(
            "POST",
            "/register_artisan",
            &json!({
                "name": "Auto Tester",
                "location": "Testville",
                "language": "English",
                "bio": "Auto test bio",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Auto Tester");
    let artisan_id = body["id"].as_i64().unwrap();

    // Upload.
    let body = upload_product(
        &app,
        artisan_id,
        "Auto Pot",
        "250",
        ("auto.jpg", &sample_jpeg()),
    )
    .await;
    assert!(body["id"].as_i64().is_some());
    assert!(body["image"].as_str().is_some());

    // Search.
    let (status, body) = send_json(&app, get("/search?q=Auto&location=Testville")).await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Auto Pot");
    assert_eq!(results[0]["price"], "250");
    assert_eq!(results[0]["artisan"]["name"], "Auto Tester");
}

#[tokio::test]
async fn test_image_for_unknown_product_is_404() {
    let (app, _media) = create_test_app();

    let (status, body) = send_json(&app, get("/image/123")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}
