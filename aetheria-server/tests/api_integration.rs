//! API integration tests for aetheria-server.
//!
//! These tests drive the full router with realistic multipart and JSON
//! requests against in-memory stores and a scripted mock model.

use std::sync::Arc;

use aetheria_core::{raster, Capabilities, EncodedImage, MockModel, MockOutcome};
use aetheria_server::{create_router, AppState, Config};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

/// Small PNG with distinct channel values so desaturation changes it.
fn png_bytes() -> Vec<u8> {
    let pixels = RgbaImage::from_fn(6, 4, |x, y| Rgba([(x * 40) as u8, (y * 60) as u8, 200, 255]));
    raster::encode_png(&DynamicImage::ImageRgba8(pixels))
        .unwrap()
        .into_bytes()
}

/// Helper to create multipart body for an upload request
fn create_upload_multipart(
    content: &[u8],
    file_name: &str,
    content_type: &str,
    transform: Option<&str>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    // File field
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    // Transform field
    if let Some(transform) = transform {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"transform\"\r\n\r\n");
        body.extend_from_slice(transform.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    // End boundary
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Multipart body whose file part carries no Content-Type header
fn create_untyped_upload_multipart(content: &[u8], file_name: &str) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Build the test router around a shared mock model
fn create_test_app(model: MockModel) -> (Router, Arc<MockModel>) {
    let model = Arc::new(model);
    let capabilities = Capabilities::in_memory(model.clone());
    let state = AppState::from_capabilities(&capabilities, &Config::default());
    (create_router(state), model)
}

fn upload_request(owner: Option<&str>, content_type: String, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/images")
        .header(header::CONTENT_TYPE, content_type);
    if let Some(owner) = owner {
        builder = builder.header("x-user-id", owner);
    }
    builder.body(Body::from(body)).unwrap()
}

fn get_request(uri: &str, owner: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", owner)
        .body(Body::empty())
        .unwrap()
}

fn json_request(uri: &str, owner: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", owner)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn upload(app: &Router, owner: &str, transform: Option<&str>) -> Value {
    let (content_type, body) =
        create_upload_multipart(&png_bytes(), "A.png", "image/png", transform);
    let (status, json) = send(app, upload_request(Some(owner), content_type, body)).await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {}", json);
    json
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_reports_backends() {
    let (app, _) = create_test_app(MockModel::new());

    let (status, json) = send(&app, get_request("/health", "u1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["service"], "aetheria-server");
    assert_eq!(json["object_store"], "memory");
    assert_eq!(json["document_store"], "memory");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let (app, _) = create_test_app(MockModel::new());

    let (status, json) = send(&app, get_request("/ready", "u1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
}

// ============================================================================
// Upload & History Tests
// ============================================================================

#[tokio::test]
async fn test_upload_requires_owner() {
    let (app, _) = create_test_app(MockModel::new());
    let (content_type, body) = create_upload_multipart(&png_bytes(), "A.png", "image/png", None);

    let (status, json) = send(&app, upload_request(None, content_type, body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_upload_then_list_and_get() {
    let (app, model) = create_test_app(MockModel::new());

    let record = upload(&app, "u1", None).await;
    assert_eq!(record["originalFileName"], "A.png");
    assert_eq!(record["mediaType"], "image/png");
    assert_eq!(record["userId"], "u1");
    assert!(record["transformedImageUrl"].is_null());
    assert!(record["storagePath"]
        .as_str()
        .unwrap()
        .starts_with("users/u1/uploads/"));
    assert_eq!(model.call_count(), 0, "upload never calls the model");

    let (status, list) = send(&app, get_request("/api/v1/images", "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert_eq!(list["images"][0]["id"], record["id"]);

    let uri = format!("/api/v1/images/{}", record["id"].as_str().unwrap());
    let (status, fetched) = send(&app, get_request(&uri, "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], record["id"]);

    // Another owner sees nothing
    let (status, json) = send(&app, get_request(&uri, "u2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    let (_, list) = send(&app, get_request("/api/v1/images", "u2")).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_upload_with_desaturate_records_rendition() {
    let (app, _) = create_test_app(MockModel::new());

    let record = upload(&app, "u1", Some("desaturate")).await;

    assert!(record["transformedImageUrl"].is_string());
}

#[tokio::test]
async fn test_upload_rejects_unsupported_content_type() {
    let (app, _) = create_test_app(MockModel::new());
    let (content_type, body) = create_upload_multipart(b"hello", "notes.txt", "text/plain", None);

    let (status, json) = send(&app, upload_request(Some("u1"), content_type, body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_untyped_part_is_held_to_allow_list() {
    let (app, _) = create_test_app(MockModel::new());

    for name in ["notes.txt", "scan.bmp", "scan.tiff", "README"] {
        let (content_type, body) =
            create_untyped_upload_multipart(b"not an image at all", name);
        let (status, json) = send(&app, upload_request(Some("u1"), content_type, body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", name);
        assert_eq!(json["code"], "INVALID_INPUT");
    }

    let (_, list) = send(&app, get_request("/api/v1/images", "u1")).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_upload_untyped_part_uses_file_name_type() {
    let (app, _) = create_test_app(MockModel::new());
    let (content_type, body) = create_untyped_upload_multipart(&png_bytes(), "A.png");

    let (status, json) = send(&app, upload_request(Some("u1"), content_type, body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["mediaType"], "image/png");
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let (app, _) = create_test_app(MockModel::new());
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"transform\"\r\n\r\ndesaturate\r\n--{b}--\r\n",
        b = BOUNDARY
    );

    let (status, json) = send(
        &app,
        upload_request(
            Some("u1"),
            format!("multipart/form-data; boundary={}", BOUNDARY),
            body.into_bytes(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("No file provided"));
}

#[tokio::test]
async fn test_upload_undecodable_image_with_desaturate_stores_nothing() {
    let (app, _) = create_test_app(MockModel::new());
    let (content_type, body) =
        create_upload_multipart(b"not really a png", "A.png", "image/png", Some("desaturate"));

    let (status, json) = send(&app, upload_request(Some("u1"), content_type, body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DECODE_ERROR");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to upload image:"));

    let (_, list) = send(&app, get_request("/api/v1/images", "u1")).await;
    assert_eq!(list["count"], 0);
}

// ============================================================================
// Transform Tests
// ============================================================================

#[tokio::test]
async fn test_enhance_and_variations_flow() {
    let (app, model) = create_test_app(MockModel::with_script([
        MockOutcome::Image,
        MockOutcome::Image,
        MockOutcome::Fail,
        MockOutcome::Image,
    ]));
    let record = upload(&app, "u1", None).await;
    let id = record["id"].as_str().unwrap();

    let (status, enhancement) = send(
        &app,
        json_request(&format!("/api/v1/images/{}/enhance", id), "u1", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(enhancement["imageRecordId"], id);
    assert_ne!(enhancement["storagePath"], record["storagePath"]);

    let (status, variations) = send(
        &app,
        json_request(
            &format!("/api/v1/images/{}/variations", id),
            "u1",
            json!({ "prompt": "vaporwave" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(variations["count"], 2);
    assert_eq!(variations["variations"][0]["styleName"], "vaporwave");
    assert_eq!(model.call_count(), 4);

    let (_, enhancements) = send(
        &app,
        get_request(&format!("/api/v1/images/{}/enhancements", id), "u1"),
    )
    .await;
    assert_eq!(enhancements["count"], 1);

    let (_, stored) = send(
        &app,
        get_request(&format!("/api/v1/images/{}/variations", id), "u1"),
    )
    .await;
    assert_eq!(stored["count"], 2);

    let (status, gallery) = send(&app, get_request("/api/v1/gallery", "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gallery["entries"][0]["image"]["id"], id);
    assert_eq!(gallery["entries"][0]["enhancements"].as_array().unwrap().len(), 1);
    assert_eq!(gallery["entries"][0]["variations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_enhance_failure_returns_bad_gateway_and_records_nothing() {
    let (app, _) = create_test_app(MockModel::with_script([MockOutcome::Empty]));
    let record = upload(&app, "u1", None).await;
    let id = record["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        json_request(&format!("/api/v1/images/{}/enhance", id), "u1", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "TRANSFORM_FAILED");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to enhance image:"));

    let (_, enhancements) = send(
        &app,
        get_request(&format!("/api/v1/images/{}/enhancements", id), "u1"),
    )
    .await;
    assert_eq!(enhancements["count"], 0);
}

#[tokio::test]
async fn test_variations_require_prompt() {
    let (app, model) = create_test_app(MockModel::new());
    let record = upload(&app, "u1", None).await;
    let uri = format!("/api/v1/images/{}/variations", record["id"].as_str().unwrap());

    let (status, json) = send(&app, json_request(&uri, "u1", json!({ "prompt": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, json_request(&uri, "u1", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_all_variations_failing_is_an_empty_success() {
    let (app, _) = create_test_app(MockModel::failing());
    let record = upload(&app, "u1", None).await;
    let uri = format!("/api/v1/images/{}/variations", record["id"].as_str().unwrap());

    let (status, json) = send(&app, json_request(&uri, "u1", json!({ "prompt": "noir" }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_transform_unknown_image_is_not_found() {
    let (app, model) = create_test_app(MockModel::new());

    let (status, _) = send(
        &app,
        json_request("/api/v1/images/missing/enhance", "u1", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(model.call_count(), 0);
}

// ============================================================================
// Stateless Action Tests
// ============================================================================

#[tokio::test]
async fn test_enhance_action_round_trips_data_uri() {
    let (app, _) = create_test_app(MockModel::new());
    let source = EncodedImage::new("image/png", png_bytes());

    let (status, json) = send(
        &app,
        json_request(
            "/api/v1/actions/enhance",
            "u1",
            json!({ "photoDataUri": source.to_data_uri() }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let output = EncodedImage::from_data_uri(json["enhancedPhotoDataUri"].as_str().unwrap()).unwrap();
    assert_eq!(output, source);
}

#[tokio::test]
async fn test_enhance_action_rejects_malformed_data_uri() {
    let (app, model) = create_test_app(MockModel::new());

    let (status, json) = send(
        &app,
        json_request(
            "/api/v1/actions/enhance",
            "u1",
            json!({ "photoDataUri": "image/png;base64,AAAA" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_DATA_URI");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_variations_action_skips_failures() {
    let (app, _) = create_test_app(MockModel::with_script([
        MockOutcome::Fail,
        MockOutcome::Image,
        MockOutcome::Image,
    ]));
    let source = EncodedImage::new("image/png", png_bytes());

    let (status, json) = send(
        &app,
        json_request(
            "/api/v1/actions/variations",
            "u1",
            json!({ "photoDataUri": source.to_data_uri(), "prompt": "ukiyo-e" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stylisticVariations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_transform_action_desaturates_locally() {
    let (app, model) = create_test_app(MockModel::new());
    let source = EncodedImage::new("image/png", png_bytes());

    let (status, json) = send(
        &app,
        json_request(
            "/api/v1/actions/transform",
            "u1",
            json!({ "photoDataUri": source.to_data_uri(), "operation": "desaturate" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["operation"], "desaturate");
    let output =
        EncodedImage::from_data_uri(json["transformedPhotoDataUri"].as_str().unwrap()).unwrap();
    let pixels = raster::decode(&output).unwrap().to_rgba8();
    assert!(pixels.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    assert_eq!(model.call_count(), 0);

    let (status, _) = send(
        &app,
        json_request(
            "/api/v1/actions/transform",
            "u1",
            json!({ "photoDataUri": source.to_data_uri(), "operation": "enhance" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_action_rejects_invalid_json() {
    let (app, _) = create_test_app(MockModel::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/actions/enhance")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Object & Documentation Tests
// ============================================================================

#[tokio::test]
async fn test_stored_object_is_served_with_media_type() {
    let (app, _) = create_test_app(MockModel::new());
    let record = upload(&app, "u1", None).await;
    let path = record["storagePath"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/objects/{}", path))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.as_ref(), png_bytes().as_slice());

    let (status, _) = send(&app, get_request("/objects/users/u1/uploads/none.png", "u1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (app, _) = create_test_app(MockModel::new());

    let (status, json) = send(&app, get_request("/api-docs/openapi.json", "u1")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/images"].is_object());
    assert!(json["paths"]["/api/v1/actions/enhance"].is_object());
}
