//! In-process fake of the APS endpoints used by the clients.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, head, patch, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use aps_core::ApsConfig;
use aps_infrastructure::ApsClients;

pub const TEST_TOKEN: &str = "test-token";

#[derive(Default)]
pub struct FakeState {
    pub base: String,
    pub token_requests: AtomicUsize,
    pub reject_token: Mutex<bool>,
    pub buckets: Mutex<HashMap<String, String>>,
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub staged: Mutex<HashMap<String, (String, String, Option<Vec<u8>>)>>,
    pub nickname: Mutex<Option<String>>,
    pub versions: Mutex<HashMap<(String, String), u32>>,
    pub aliases: Mutex<HashMap<(String, String, String), u32>>,
    pub alias_patches: AtomicUsize,
    pub package_uploads: Mutex<Vec<String>>,
    pub translated: Mutex<Vec<String>>,
    /// Statuses returned by successive `GET /workitems/{id}` calls; the last one repeats.
    pub workitem_script: Mutex<Vec<String>>,
    pub workitem_polls: AtomicUsize,
    pub submitted: Mutex<Vec<Value>>,
}

pub struct FakeAps {
    pub base: String,
    pub state: Arc<FakeState>,
}

impl FakeAps {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(FakeState {
            base: base.clone(),
            ..FakeState::default()
        });

        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, state }
    }

    pub fn config(&self) -> ApsConfig {
        ApsConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            base_url: self.base.clone(),
            ..ApsConfig::default()
        }
    }

    pub fn clients(&self) -> ApsClients {
        ApsClients::new(&self.config()).unwrap()
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }
}

fn router(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/authentication/v2/token", post(token))
        .route("/oss/v2/buckets", post(create_bucket))
        .route("/oss/v2/buckets/{bucket}", axum::routing::delete(delete_bucket))
        .route("/oss/v2/buckets/{bucket}/details", get(bucket_details))
        .route("/oss/v2/buckets/{bucket}/objects", get(list_objects))
        .route(
            "/oss/v2/buckets/{bucket}/objects/{key}",
            head(head_object).delete(delete_object),
        )
        .route(
            "/oss/v2/buckets/{bucket}/objects/{key}/signeds3upload",
            get(start_upload).post(complete_upload),
        )
        .route(
            "/oss/v2/buckets/{bucket}/objects/{key}/signeds3download",
            get(signed_download),
        )
        .route("/s3/upload/{upload_key}", put(s3_put))
        .route("/s3/download/{bucket}/{key}", get(s3_get))
        .route("/s3/bundle", post(s3_bundle))
        .route(
            "/da/us-east/v3/forgeapps/me",
            get(get_nickname).patch(set_nickname).delete(delete_app),
        )
        .route("/da/us-east/v3/workitems", post(submit_workitem))
        .route("/da/us-east/v3/workitems/{id}", get(workitem_status))
        .route("/da/us-east/v3/{collection}", post(create_definition).get(list_definitions))
        .route("/da/us-east/v3/{collection}/{id}/versions", post(create_version))
        .route("/da/us-east/v3/{collection}/{id}/aliases", post(create_alias))
        .route(
            "/da/us-east/v3/{collection}/{id}/aliases/{alias}",
            patch(update_alias),
        )
        .route("/modelderivative/v2/designdata/job", post(translate))
        .route("/modelderivative/v2/designdata/{urn}/manifest", get(manifest))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TEST_TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"developerMessage": "bad token"}))).into_response()
}

async fn token(State(state): State<Arc<FakeState>>, headers: HeaderMap, body: String) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);

    let basic = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if *state.reject_token.lock().unwrap() || !basic.starts_with("Basic ") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client"})),
        )
            .into_response();
    }
    assert!(body.contains("grant_type=client_credentials"));
    assert!(body.contains("scope=bucket%3Acreate+bucket%3Aread"));

    Json(json!({
        "access_token": TEST_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3599
    }))
    .into_response()
}

async fn bucket_details(
    State(state): State<Arc<FakeState>>,
    Path(bucket): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.buckets.lock().unwrap().get(&bucket) {
        Some(policy) => Json(json!({
            "bucketKey": bucket,
            "bucketOwner": "test-client",
            "createdDate": 1700000000000i64,
            "permissions": [],
            "policyKey": policy
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"reason": "Bucket not found"}))).into_response(),
    }
}

async fn create_bucket(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let bucket = body["bucketKey"].as_str().unwrap_or_default().to_string();
    let policy = body["policyKey"].as_str().unwrap_or_default().to_string();

    let mut buckets = state.buckets.lock().unwrap();
    if buckets.contains_key(&bucket) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"reason": "Bucket already exists"})),
        )
            .into_response();
    }
    buckets.insert(bucket.clone(), policy.clone());
    Json(json!({"bucketKey": bucket, "policyKey": policy, "permissions": []})).into_response()
}

async fn delete_bucket(
    State(state): State<Arc<FakeState>>,
    Path(bucket): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.buckets.lock().unwrap().remove(&bucket).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    state
        .objects
        .lock()
        .unwrap()
        .retain(|(b, _), _| b != &bucket);
    StatusCode::OK.into_response()
}

async fn list_objects(
    State(state): State<Arc<FakeState>>,
    Path(bucket): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !state.buckets.lock().unwrap().contains_key(&bucket) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let mut items: Vec<Value> = state
        .objects
        .lock()
        .unwrap()
        .iter()
        .filter(|((b, _), _)| b == &bucket)
        .map(|((b, k), bytes)| {
            json!({
                "bucketKey": b,
                "objectKey": k,
                "objectId": format!("urn:adsk.objects:os.object:{b}/{k}"),
                "size": bytes.len()
            })
        })
        .collect();
    items.sort_by(|a, b| a["objectKey"].as_str().cmp(&b["objectKey"].as_str()));
    Json(json!({ "items": items })).into_response()
}

async fn head_object(
    State(state): State<Arc<FakeState>>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.objects.lock().unwrap().get(&(bucket, key)) {
        Some(bytes) => (StatusCode::OK, [(CONTENT_LENGTH, bytes.len().to_string())]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_object(
    State(state): State<Arc<FakeState>>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.objects.lock().unwrap().remove(&(bucket, key)) {
        Some(_) => StatusCode::OK.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_upload(
    State(state): State<Arc<FakeState>>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !state.buckets.lock().unwrap().contains_key(&bucket) {
        return (StatusCode::NOT_FOUND, Json(json!({"reason": "Bucket not found"}))).into_response();
    }
    let mut staged = state.staged.lock().unwrap();
    let upload_key = format!("upload-{}", staged.len() + 1);
    staged.insert(upload_key.clone(), (bucket, key, None));

    Json(json!({
        "uploadKey": upload_key,
        "urls": [format!("{}/s3/upload/{upload_key}", state.base)],
        "urlExpiration": 1700000000
    }))
    .into_response()
}

async fn s3_put(
    State(state): State<Arc<FakeState>>,
    Path(upload_key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // pre-signed URLs reject bearer tokens
    if headers.contains_key(AUTHORIZATION) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    match state.staged.lock().unwrap().get_mut(&upload_key) {
        Some(entry) => {
            entry.2 = Some(body.to_vec());
            StatusCode::OK.into_response()
        }
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

async fn complete_upload(
    State(state): State<Arc<FakeState>>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let upload_key = body["uploadKey"].as_str().unwrap_or_default();
    let Some((b, k, Some(bytes))) = state.staged.lock().unwrap().remove(upload_key) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"reason": "upload not found"}))).into_response();
    };
    assert_eq!((b.as_str(), k.as_str()), (bucket.as_str(), key.as_str()));

    let size = bytes.len();
    state.objects.lock().unwrap().insert((bucket.clone(), key.clone()), bytes);
    Json(json!({
        "bucketKey": bucket,
        "objectId": format!("urn:adsk.objects:os.object:{bucket}/{key}"),
        "objectKey": key,
        "size": size,
        "contentType": "application/octet-stream"
    }))
    .into_response()
}

async fn signed_download(
    State(state): State<Arc<FakeState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    assert_eq!(query.get("minutesExpiration").map(String::as_str), Some("60"));
    if !state
        .objects
        .lock()
        .unwrap()
        .contains_key(&(bucket.clone(), key.clone()))
    {
        return (StatusCode::NOT_FOUND, Json(json!({"reason": "Object not found"}))).into_response();
    }
    Json(json!({
        "status": "complete",
        "url": format!("{}/s3/download/{bucket}/{key}", state.base)
    }))
    .into_response()
}

async fn s3_get(
    State(state): State<Arc<FakeState>>,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    match state.objects.lock().unwrap().get(&(bucket, key)) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn s3_bundle(State(state): State<Arc<FakeState>>, headers: HeaderMap, body: Bytes) -> Response {
    if headers.contains_key(AUTHORIZATION) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let text = String::from_utf8_lossy(&body).to_string();
    state.package_uploads.lock().unwrap().push(text);
    StatusCode::NO_CONTENT.into_response()
}

async fn get_nickname(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.nickname.lock().unwrap().clone() {
        Some(nickname) => Json(json!(nickname)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn set_nickname(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !state.versions.lock().unwrap().is_empty() {
        return (
            StatusCode::CONFLICT,
            Json(json!({"diagnostic": "app already has resources"})),
        )
            .into_response();
    }
    *state.nickname.lock().unwrap() = body["nickname"].as_str().map(str::to_string);
    StatusCode::OK.into_response()
}

async fn delete_app(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let had_nickname = state.nickname.lock().unwrap().take().is_some();
    let had_definitions = {
        let mut versions = state.versions.lock().unwrap();
        let had = !versions.is_empty();
        versions.clear();
        had
    };
    state.aliases.lock().unwrap().clear();
    if had_nickname || had_definitions {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn nickname_of(state: &FakeState) -> String {
    state
        .nickname
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| "test-client".to_string())
}

fn definition_response(state: &FakeState, collection: &str, id: &str, version: u32) -> Value {
    let mut body = json!({
        "id": format!("{}.{id}", nickname_of(state)),
        "version": version,
    });
    if collection == "appbundles" {
        body["uploadParameters"] = json!({
            "endpointURL": format!("{}/s3/bundle", state.base),
            "formData": {"key": format!("{id}.zip"), "policy": "signed-policy"}
        });
    }
    body
}

async fn create_definition(
    State(state): State<Arc<FakeState>>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let id = body["id"].as_str().unwrap_or_default().to_string();
    let mut versions = state.versions.lock().unwrap();
    if versions.contains_key(&(collection.clone(), id.clone())) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"diagnostic": format!("{id} already exists")})),
        )
            .into_response();
    }
    versions.insert((collection.clone(), id.clone()), 1);
    drop(versions);
    Json(definition_response(&state, &collection, &id, 1)).into_response()
}

async fn list_definitions(
    State(state): State<Arc<FakeState>>,
    Path(collection): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let nickname = nickname_of(&state);
    let mut data: Vec<String> = state
        .versions
        .lock()
        .unwrap()
        .keys()
        .filter(|(c, _)| c == &collection)
        .map(|(_, id)| format!("{nickname}.{id}+default"))
        .collect();
    data.push(format!("Autodesk.Shared{collection}+prod"));
    data.sort();
    Json(json!({ "data": data, "paginationToken": null })).into_response()
}

async fn create_version(
    State(state): State<Arc<FakeState>>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body.get("id").is_some() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"diagnostic": "id is not allowed on versions"})),
        )
            .into_response();
    }
    let version = {
        let mut versions = state.versions.lock().unwrap();
        let Some(version) = versions.get_mut(&(collection.clone(), id.clone())) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        *version += 1;
        *version
    };
    Json(definition_response(&state, &collection, &id, version)).into_response()
}

async fn create_alias(
    State(state): State<Arc<FakeState>>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let alias = body["id"].as_str().unwrap_or_default().to_string();
    let version = body["version"].as_u64().unwrap_or_default() as u32;
    let mut aliases = state.aliases.lock().unwrap();
    let key = (collection, id, alias.clone());
    if aliases.contains_key(&key) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"diagnostic": "alias exists"})),
        )
            .into_response();
    }
    aliases.insert(key, version);
    Json(json!({"id": alias, "version": version})).into_response()
}

async fn update_alias(
    State(state): State<Arc<FakeState>>,
    Path((collection, id, alias)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.alias_patches.fetch_add(1, Ordering::SeqCst);
    let version = body["version"].as_u64().unwrap_or_default() as u32;
    let mut aliases = state.aliases.lock().unwrap();
    let Some(current) = aliases.get_mut(&(collection, id, alias.clone())) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *current = version;
    Json(json!({"id": alias, "version": version})).into_response()
}

async fn translate(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let urn = body["input"]["urn"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["output"]["formats"][0]["type"], "svf2");
    state.translated.lock().unwrap().push(urn.clone());
    (StatusCode::CREATED, Json(json!({"result": "created", "urn": urn}))).into_response()
}

async fn manifest(
    State(state): State<Arc<FakeState>>,
    Path(urn): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !state.translated.lock().unwrap().contains(&urn) {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "urn": urn,
        "status": "inprogress",
        "progress": "25% complete",
        "derivatives": [{
            "status": "inprogress",
            "messages": [],
            "children": [{"messages": [{"type": "warning", "code": "Revit-Warning", "message": "missing link"}]}]
        }]
    }))
    .into_response()
}

async fn submit_workitem(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.submitted.lock().unwrap().push(body);
    Json(json!({"id": "wi-1", "status": "pending"})).into_response()
}

async fn workitem_status(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != "wi-1" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let poll = state.workitem_polls.fetch_add(1, Ordering::SeqCst);
    let script = state.workitem_script.lock().unwrap();
    let status = script
        .get(poll)
        .or_else(|| script.last())
        .cloned()
        .unwrap_or_else(|| "pending".to_string());

    Json(json!({
        "id": id,
        "status": status,
        "reportUrl": format!("{}/reports/{id}.txt", state.base),
        "stats": {"timeQueued": "2024-01-01T00:00:00Z"}
    }))
    .into_response()
}
