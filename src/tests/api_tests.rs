use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{difficulty_id, region_fields, walk_fields, TestEnv};
use crate::config::AppConfig;
use crate::routes;
use crate::state::AppState;

const READER: &str = "reader-secret";
const WRITER: &str = "writer-secret";

fn app_with(env: &TestEnv, config: AppConfig) -> (Router, AppState) {
    let state = AppState::new(env.pool.clone(), config);
    (routes::router(state.clone()), state)
}

fn app(env: &TestEnv) -> (Router, AppState) {
    app_with(env, env.config.clone())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = res.into_body().collect().await.unwrap().to_bytes().to_vec();
    Reply { status, headers, body }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_upload(file_name: &str, original: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "nzwalks-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{o}\"\r\nContent-Type: image/jpeg\r\n\r\n",
            b = boundary,
            o = original
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(
        format!(
            "\r\n--{b}\r\nContent-Disposition: form-data; name=\"fileName\"\r\n\r\n{n}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"fileDescription\"\r\n\r\nSouthern sky\r\n--{b}--\r\n",
            b = boundary,
            n = file_name
        )
        .as_bytes(),
    );
    Request::builder()
        .method("POST")
        .uri("/api/images/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .header(header::HOST, "localhost:8080")
        .body(Body::from(body))
        .unwrap()
}

async fn seed_walks(state: &AppState) {
    let region = state.regions.create(region_fields("STL", "Southland")).await.unwrap();
    for (name, km, difficulty) in [("Hump Ridge", 12.5, "Hard"), ("Milford", 3.0, "Medium"), ("Abel Tasman", 4.5, "Easy")] {
        state.walks.create(walk_fields(name, km, region.id, difficulty)).await.unwrap();
    }
}

fn walk_names(v: &Value) -> Vec<String> {
    v.as_array().unwrap().iter().map(|w| w["name"].as_str().unwrap().to_string()).collect()
}

#[tokio::test]
async fn healthz_carries_security_headers() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let reply = send(&app, get("/healthz")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"ok");
    assert_eq!(reply.headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(reply.headers.get("x-frame-options").unwrap(), "DENY");

    assert_eq!(send(&app, get("/readyz")).await.status, StatusCode::OK);
    let version = send(&app, get("/version")).await.json();
    assert_eq!(version["name"], "nzwalks");
}

#[tokio::test]
async fn region_lifecycle_over_http() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let created = send(&app, with_json("POST", "/api/regions", json!({"code": "AKL", "name": "Auckland"}))).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let body = created.json();
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(created.headers.get(header::LOCATION).unwrap(), &format!("/api/regions/{}", id));
    assert_eq!(body["regionImageUrl"], Value::Null);
    assert_eq!(created.headers.get(header::CACHE_CONTROL).unwrap(), "no-store");

    let fetched = send(&app, get(&format!("/api/regions/{}", id))).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["name"], "Auckland");

    let updated = send(
        &app,
        with_json(
            "PUT",
            &format!("/api/regions/{}", id),
            json!({"code": "AKL", "name": "Tāmaki Makaurau", "regionImageUrl": "https://example.nz/akl.jpg"}),
        ),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["regionImageUrl"], "https://example.nz/akl.jpg");

    let listed = send(&app, get("/api/regions")).await.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let deleted = send(&app, Request::builder().method("DELETE").uri(format!("/api/regions/{}", id)).body(Body::empty()).unwrap()).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.json()["id"], id.as_str());

    let gone = send(&app, get(&format!("/api/regions/{}", id))).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    let envelope = gone.json();
    assert_eq!(envelope["error"]["code"], "NOT_FOUND");
    assert_eq!(envelope["status"], 404);
    assert!(envelope["timestamp"].is_string());
}

#[tokio::test]
async fn missing_region_update_is_not_found() {
    let env = TestEnv::new().await;
    let (app, state) = app(&env);

    let uri = format!("/api/regions/{}", uuid::Uuid::new_v4());
    let reply = send(&app, with_json("PUT", &uri, json!({"code": "NTL", "name": "Northland"}))).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(state.regions.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_id_and_invalid_body_are_bad_requests() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let reply = send(&app, get("/api/regions/not-a-uuid")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["code"], "INVALID_INPUT");

    let reply = send(&app, with_json("POST", "/api/regions", json!({"code": "AK", "name": "Auckland"}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = reply.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "code");
}

#[tokio::test]
async fn walk_listing_applies_query_string() {
    let env = TestEnv::new().await;
    let (app, state) = app(&env);
    seed_walks(&state).await;

    let filtered = send(&app, get("/api/walks?filterOn=Name&filterQuery=M")).await;
    assert_eq!(filtered.status, StatusCode::OK);
    assert_eq!(walk_names(&filtered.json()), vec!["Milford"]);

    let paged = send(&app, get("/api/walks?sortBy=Length&isAscending=FALSE&pageNumber=1&pageSize=2")).await.json();
    assert_eq!(walk_names(&paged), vec!["Hump Ridge", "Abel Tasman"]);
    assert_eq!(paged[0]["difficulty"]["name"], "Hard");
    assert_eq!(paged[0]["region"]["code"], "STL");

    let unknown = send(&app, get("/api/walks?sortBy=Rating&filterOn=Colour&filterQuery=x")).await.json();
    assert_eq!(walk_names(&unknown), vec!["Hump Ridge", "Milford", "Abel Tasman"]);

    let by_name = send(&app, get("/api/walks?sortBy=Name&isAscending=True")).await.json();
    assert_eq!(walk_names(&by_name), vec!["Abel Tasman", "Hump Ridge", "Milford"]);

    let bad_flag = send(&app, get("/api/walks?isAscending=maybe")).await;
    assert_eq!(bad_flag.status, StatusCode::BAD_REQUEST);

    assert_eq!(state.metrics.get_snapshot().walk_list_queries, 4);
}

#[tokio::test]
async fn walk_writes_map_store_errors() {
    let env = TestEnv::new().await;
    let (app, state) = app(&env);
    let region = state.regions.create(region_fields("NSN", "Nelson")).await.unwrap();
    let easy = difficulty_id("Easy");

    let walk = json!({
        "name": "Abel Tasman",
        "description": "Coastal track",
        "lengthInKm": 4.5,
        "difficultyId": easy,
        "regionId": region.id,
    });
    let created = send(&app, with_json("POST", "/api/walks", walk.clone())).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["region"]["name"], "Nelson");

    let mut orphan = walk.clone();
    orphan["regionId"] = json!(uuid::Uuid::new_v4());
    let conflict = send(&app, with_json("POST", "/api/walks", orphan)).await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.json()["error"]["code"], "CONFLICT");

    let restrict = send(
        &app,
        Request::builder().method("DELETE").uri(format!("/api/regions/{}", region.id)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(restrict.status, StatusCode::CONFLICT);

    let mut too_long = walk;
    too_long["lengthInKm"] = json!(75.0);
    assert_eq!(send(&app, with_json("POST", "/api/walks", too_long)).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn difficulties_are_seeded() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let reply = send(&app, get("/api/difficulties")).await.json();
    let names: Vec<&str> = reply.as_array().unwrap().iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Easy", "Medium", "Hard"]);
}

#[tokio::test]
async fn upload_then_serve_image() {
    let env = TestEnv::new().await;
    let (app, state) = app(&env);

    let reply = send(&app, multipart_upload("sky", "IMG_0001.JPG", b"\xFF\xD8\xFFsky")).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let body = reply.json();
    assert_eq!(body["filePath"], "http://localhost:8080/images/sky.jpg");
    assert_eq!(body["fileExtension"], ".jpg");
    assert_eq!(body["fileDescription"], "Southern sky");
    assert_eq!(body["fileSizeInBytes"], 6);
    assert!(env.config.images.root_dir.join("sky.jpg").is_file());
    assert_eq!(state.metrics.get_snapshot().images_uploaded, 1);

    let served = send(&app, get("/images/sky.jpg")).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, b"\xFF\xD8\xFFsky");
}

#[tokio::test]
async fn uploaded_image_url_resolves_for_awkward_names() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let reply = send(&app, multipart_upload("my sky #1?", "sky.png", b"\x89PNGsky")).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let body = reply.json();
    let url = body["filePath"].as_str().unwrap();
    assert_eq!(url, "http://localhost:8080/images/my%20sky%20%231%3F.png");
    assert!(env.config.images.root_dir.join("my sky #1?.png").is_file());

    let path = url.strip_prefix("http://localhost:8080").unwrap();
    let served = send(&app, get(path)).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, b"\x89PNGsky");
}

#[tokio::test]
async fn overlong_upload_name_is_a_validation_error() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let name = "a".repeat(230);
    let reply = send(&app, multipart_upload(&name, "sky.jpg", b"\xFF\xD8\xFFsky")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = reply.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "fileName");
    assert!(!env.config.images.root_dir.join(format!("{}.jpg", name)).exists());
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    let reply = send(&app, multipart_upload("anim", "anim.gif", b"GIF89a")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(!env.config.images.root_dir.join("anim.gif").exists());
}

#[tokio::test]
async fn roles_are_enforced_when_tokens_are_configured() {
    let env = TestEnv::new().await;
    let mut config = env.config.clone();
    config.auth.reader_token = Some(READER.into());
    config.auth.writer_token = Some(WRITER.into());
    let (app, _) = app_with(&env, config);

    let bearer = |req: Request<Body>, token: &str| {
        let (mut parts, body) = req.into_parts();
        parts.headers.insert(header::AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        Request::from_parts(parts, body)
    };
    let new_region = || with_json("POST", "/api/regions", json!({"code": "WGN", "name": "Wellington"}));

    assert_eq!(send(&app, get("/healthz")).await.status, StatusCode::OK);
    assert_eq!(send(&app, get("/api/regions")).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(send(&app, bearer(get("/api/regions"), "nope")).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(send(&app, bearer(get("/api/regions"), READER)).await.status, StatusCode::OK);
    assert_eq!(send(&app, bearer(new_region(), READER)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(send(&app, bearer(new_region(), WRITER)).await.status, StatusCode::CREATED);
    assert_eq!(send(&app, bearer(get("/api/regions"), WRITER)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_count_writes() {
    let env = TestEnv::new().await;
    let (app, _) = app(&env);

    send(&app, with_json("POST", "/api/regions", json!({"code": "BOP", "name": "Bay Of Plenty"}))).await;
    let metrics = send(&app, get("/metrics")).await.json();
    assert_eq!(metrics["regions_created"], 1);
    assert_eq!(metrics["walks_created"], 0);
}
