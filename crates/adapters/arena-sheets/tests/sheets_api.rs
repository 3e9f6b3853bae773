//! Drives `SheetsClient` against a local axum stand-in for the Sheets v4 API.
//! The stand-in keeps its tabs in a `MemoryStore` so range semantics match.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use arena_core::cell::{Cell, Grid};
use arena_core::layout::SheetLayout;
use arena_core::range::A1Range;
use arena_core::store::{MemoryStore, RangeStore, StoreError};
use arena_core::intake::EliminationSubmission;
use arena_core::test_helpers::make_registration;
use arena_core::{Game, Tournament};
use arena_sheets::token::SHEETS_SCOPE;
use arena_sheets::{SheetsClient, SheetsConfig};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

const SPREADSHEET: &str = "sheet-1";
const TOKEN: &str = "test-token";
const SERVICE_EMAIL: &str = "arena-bot@campus-arena.iam.gserviceaccount.com";
const PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/service_account_pub.pem");

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    uri: String,
    auth: Option<String>,
}

#[derive(Clone)]
struct Mock {
    store: Arc<MemoryStore>,
    seen: Arc<Mutex<Vec<Seen>>>,
    /// Tokens handed out by the token endpoint, in order.
    minted: Arc<Mutex<Vec<String>>>,
    /// Tokens the API now answers 401 for.
    revoked: Arc<Mutex<Vec<String>>>,
    /// `expires_in` returned with each minted token.
    expires_in: Arc<AtomicU64>,
    appends: Arc<AtomicUsize>,
}

impl Mock {
    fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn mint_count(&self) -> usize {
        self.minted.lock().unwrap().len()
    }

    fn accepts(&self, bearer: &str) -> bool {
        bearer == TOKEN || self.minted.lock().unwrap().iter().any(|t| t == bearer)
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(what) => error(StatusCode::NOT_FOUND, &what),
        other => error(StatusCode::BAD_REQUEST, &other.to_string()),
    }
}

/// Records the request and checks spreadsheet id and bearer token.
fn admit(mock: &Mock, method: Method, uri: &Uri, headers: &HeaderMap, id: &str) -> Option<Response> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.seen.lock().unwrap().push(Seen {
        method,
        uri: uri.to_string(),
        auth: auth.clone(),
    });
    let bearer = auth.as_deref().and_then(|a| a.strip_prefix("Bearer ")).unwrap_or("");
    if mock.revoked.lock().unwrap().iter().any(|t| t == bearer) {
        return Some(error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials."));
    }
    if !mock.accepts(bearer) {
        return Some(error(StatusCode::FORBIDDEN, "The caller does not have permission"));
    }
    if id != SPREADSHEET {
        return Some(error(StatusCode::NOT_FOUND, "Requested entity was not found."));
    }
    None
}

fn parse_range(raw: &str) -> Result<A1Range, Response> {
    raw.parse::<A1Range>()
        .map_err(|_| error(StatusCode::BAD_REQUEST, &format!("Unable to parse range: {raw}")))
}

fn grid_of(body: &Value) -> Grid {
    serde_json::from_value(body["values"].clone()).unwrap_or_default()
}

async fn read_values(
    State(mock): State<Mock>,
    Path((id, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = admit(&mock, Method::GET, &uri, &headers, &id) {
        return denied;
    }
    if query.get("valueRenderOption").map(String::as_str) != Some("UNFORMATTED_VALUE") {
        return error(StatusCode::BAD_REQUEST, "expected unformatted values");
    }
    let range = match parse_range(&range) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match mock.store.read(&range).await {
        Ok(values) => Json(json!({ "range": range.to_string(), "values": values })).into_response(),
        Err(e) => store_error(e),
    }
}

async fn append_values(
    State(mock): State<Mock>,
    Path((id, range)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = admit(&mock, Method::POST, &uri, &headers, &id) {
        return denied;
    }
    let Some(range) = range.strip_suffix(":append") else {
        return error(StatusCode::BAD_REQUEST, "expected :append");
    };
    let range = match parse_range(range) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mock.appends.fetch_add(1, Ordering::SeqCst);
    match mock.store.append(&range, grid_of(&body)).await {
        Ok(()) => Json(json!({ "spreadsheetId": SPREADSHEET })).into_response(),
        Err(e) => store_error(e),
    }
}

async fn update_values(
    State(mock): State<Mock>,
    Path((id, range)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = admit(&mock, Method::PUT, &uri, &headers, &id) {
        return denied;
    }
    let range = match parse_range(&range) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match mock.store.write(&range, grid_of(&body)).await {
        Ok(()) => Json(json!({ "updatedRange": range.to_string() })).into_response(),
        Err(e) => store_error(e),
    }
}

async fn metadata(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = admit(&mock, Method::GET, &uri, &headers, &id) {
        return denied;
    }
    let titles = mock.store.list_sheets().await.unwrap_or_default();
    let sheets: Vec<Value> = titles
        .into_iter()
        .map(|t| json!({ "properties": { "title": t } }))
        .collect();
    Json(json!({ "sheets": sheets })).into_response()
}

async fn batch_update(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(id) = id.strip_suffix(":batchUpdate") else {
        return error(StatusCode::NOT_FOUND, "unknown method");
    };
    if let Some(denied) = admit(&mock, Method::POST, &uri, &headers, id) {
        return denied;
    }
    let Some(title) = body["requests"][0]["addSheet"]["properties"]["title"].as_str() else {
        return error(StatusCode::BAD_REQUEST, "expected addSheet");
    };
    match mock.store.add_sheet(title).await {
        Ok(()) => Json(json!({ "replies": [{}] })).into_response(),
        Err(e) => store_error(e),
    }
}

/// OAuth token endpoint: verifies the signed assertion and hands out
/// `minted-<n>` tokens.
async fn token_exchange(
    State(mock): State<Mock>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if form.get("grant_type").map(String::as_str)
        != Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    {
        return error(StatusCode::BAD_REQUEST, "unsupported_grant_type");
    }
    let Some(assertion) = form.get("assertion") else {
        return error(StatusCode::BAD_REQUEST, "missing assertion");
    };
    let Ok(key) = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()) else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "bad fixture key");
    };
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let claims = match jsonwebtoken::decode::<Value>(assertion, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => return error(StatusCode::BAD_REQUEST, &format!("invalid_grant: {e}")),
    };
    let aud_ok = claims["aud"].as_str().is_some_and(|a| a.ends_with("/token"));
    if claims["iss"] != SERVICE_EMAIL || claims["scope"] != SHEETS_SCOPE || !aud_ok {
        return error(StatusCode::BAD_REQUEST, "invalid_grant: unexpected claims");
    }
    let token = {
        let mut minted = mock.minted.lock().unwrap();
        let token = format!("minted-{}", minted.len() + 1);
        minted.push(token.clone());
        token
    };
    Json(json!({
        "access_token": token,
        "expires_in": mock.expires_in.load(Ordering::SeqCst),
        "token_type": "Bearer",
    }))
    .into_response()
}

async fn spawn_mock(store: MemoryStore) -> (String, Mock) {
    let mock = Mock {
        store: Arc::new(store),
        seen: Arc::new(Mutex::new(Vec::new())),
        minted: Arc::new(Mutex::new(Vec::new())),
        revoked: Arc::new(Mutex::new(Vec::new())),
        expires_in: Arc::new(AtomicU64::new(3600)),
        appends: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/token", post(token_exchange))
        .route("/v4/spreadsheets/{id}", get(metadata).post(batch_update))
        .route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(read_values).post(append_values).put(update_values),
        )
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

fn client(base: &str, token: &str) -> SheetsClient {
    SheetsClient::new(SheetsConfig {
        spreadsheet_id: SPREADSHEET.to_string(),
        access_token: token.to_string(),
        base_url: base.to_string(),
        ..SheetsConfig::default()
    })
    .unwrap()
}

fn service_account_client(base: &str) -> SheetsClient {
    SheetsClient::new(SheetsConfig {
        spreadsheet_id: SPREADSHEET.to_string(),
        service_account_email: SERVICE_EMAIL.to_string(),
        private_key: PRIVATE_KEY.replace('\n', "\\n"),
        token_url: format!("{base}/token"),
        base_url: base.to_string(),
        ..SheetsConfig::default()
    })
    .unwrap()
}

fn row(cells: &[&str]) -> Vec<Cell> {
    cells.iter().map(|c| Cell::from(*c)).collect()
}

fn range(s: &str) -> A1Range {
    s.parse().unwrap()
}

#[tokio::test]
async fn read_sends_bearer_and_unformatted_option() {
    let (base, mock) = spawn_mock(MemoryStore::with_sheets([(
        "Teams",
        vec![row(&["id", "name"]), row(&["T1", "Alpha"])],
    )]))
    .await;
    let sheets = client(&base, TOKEN);

    let grid = sheets.read(&range("Teams!A2:O")).await.unwrap();
    assert_eq!(grid, vec![row(&["T1", "Alpha"])]);

    let seen = mock.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].auth.as_deref(), Some("Bearer test-token"));
    assert!(seen[0].uri.contains("valueRenderOption=UNFORMATTED_VALUE"));
}

#[tokio::test]
async fn missing_tab_maps_to_not_found() {
    let (base, _mock) = spawn_mock(MemoryStore::new()).await;
    let sheets = client(&base, TOKEN);
    let err = sheets.read(&range("Results!A2:H")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
    let err = sheets
        .append(&range("Results!A:H"), vec![row(&["M1"])])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn rejected_token_maps_to_backend() {
    let (base, _mock) = spawn_mock(MemoryStore::new()).await;
    let sheets = client(&base, "wrong");
    let err = sheets.list_sheets().await.unwrap_err();
    match err {
        StoreError::Backend(msg) => assert!(msg.contains("403"), "got {msg}"),
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn add_append_and_write_round_trip() {
    let (base, mock) = spawn_mock(MemoryStore::new()).await;
    let sheets = client(&base, TOKEN);

    sheets.add_sheet("Teams").await.unwrap();
    assert_eq!(sheets.list_sheets().await.unwrap(), vec!["Teams".to_string()]);

    sheets
        .write(&range("Teams!A1:B1"), vec![row(&["id", "name"])])
        .await
        .unwrap();
    sheets
        .append(&range("Teams!A:O"), vec![row(&["T1", "Alpha"])])
        .await
        .unwrap();
    sheets
        .write(&range("Teams!C2:C2"), vec![vec![Cell::from(7u32)]])
        .await
        .unwrap();

    let grid = mock.store.snapshot("Teams").await.unwrap();
    assert_eq!(grid[1], vec![
        Cell::from("T1"),
        Cell::from("Alpha"),
        Cell::Number(7.0)
    ]);

    let uris: Vec<String> = mock.requests().into_iter().map(|s| s.uri).collect();
    assert!(uris.iter().any(|u| u.ends_with("sheet-1:batchUpdate")));
    assert!(uris.iter().any(|u| u.contains(":append?") && u.contains("insertDataOption=INSERT_ROWS")));
    assert!(
        mock.requests()
            .iter()
            .any(|s| s.method == Method::PUT && s.uri.contains("valueInputOption=RAW"))
    );
}

#[tokio::test]
async fn values_are_sent_raw_and_kept_as_text() {
    let (base, mock) = spawn_mock(MemoryStore::with_sheets([("Teams", vec![row(&["id", "name", "phone"])])])).await;
    let sheets = client(&base, TOKEN);

    sheets
        .append(&range("Teams!A:C"), vec![
            row(&["T1", "=IMPORTXML(\"http://x\")", "0987654321"]),
            row(&["T2", "+91 98765", "1/2"]),
        ])
        .await
        .unwrap();
    assert_eq!(mock.appends.load(Ordering::SeqCst), 1);

    let grid = sheets.read(&range("Teams!A2:C")).await.unwrap();
    assert_eq!(grid, vec![
        row(&["T1", "=IMPORTXML(\"http://x\")", "0987654321"]),
        row(&["T2", "+91 98765", "1/2"]),
    ]);

    let writes: Vec<Seen> = mock
        .requests()
        .into_iter()
        .filter(|s| s.method != Method::GET)
        .collect();
    assert!(!writes.is_empty());
    for seen in writes {
        assert!(seen.uri.contains("valueInputOption=RAW"), "{}", seen.uri);
        assert!(!seen.uri.contains("USER_ENTERED"));
    }
}

#[tokio::test]
async fn service_account_token_is_minted_once_and_reused() {
    let (base, mock) = spawn_mock(MemoryStore::with_sheets([("Teams", vec![row(&["id"])])])).await;
    let sheets = service_account_client(&base);

    sheets.list_sheets().await.unwrap();
    sheets.read(&range("Teams!A1:A")).await.unwrap();

    assert_eq!(mock.mint_count(), 1);
    let auths: Vec<Option<String>> = mock.requests().into_iter().map(|s| s.auth).collect();
    assert_eq!(auths, vec![Some("Bearer minted-1".to_string()); 2]);
}

#[tokio::test]
async fn service_account_token_near_expiry_is_refreshed() {
    let (base, mock) = spawn_mock(MemoryStore::new()).await;
    // Shorter than the refresh margin, so every token is already stale
    mock.expires_in.store(30, Ordering::SeqCst);
    let sheets = service_account_client(&base);

    sheets.list_sheets().await.unwrap();
    sheets.list_sheets().await.unwrap();

    assert_eq!(mock.mint_count(), 2);
    let last = mock.requests().pop().unwrap();
    assert_eq!(last.auth.as_deref(), Some("Bearer minted-2"));
}

#[tokio::test]
async fn unauthorized_response_drops_cached_token() {
    let (base, mock) = spawn_mock(MemoryStore::new()).await;
    let sheets = service_account_client(&base);

    sheets.list_sheets().await.unwrap();
    mock.revoked.lock().unwrap().push("minted-1".to_string());

    let err = sheets.list_sheets().await.unwrap_err();
    assert!(matches!(err, StoreError::Backend(ref m) if m.contains("401")), "got {err:?}");

    sheets.list_sheets().await.unwrap();
    assert_eq!(mock.mint_count(), 2);
}

#[tokio::test]
async fn rejected_token_exchange_is_a_backend_error() {
    let (base, mock) = spawn_mock(MemoryStore::new()).await;
    let sheets = SheetsClient::new(SheetsConfig {
        spreadsheet_id: SPREADSHEET.to_string(),
        service_account_email: "someone-else@example.iam.gserviceaccount.com".to_string(),
        private_key: PRIVATE_KEY.to_string(),
        token_url: format!("{base}/token"),
        base_url: base.clone(),
        ..SheetsConfig::default()
    })
    .unwrap();

    let err = sheets.list_sheets().await.unwrap_err();
    assert!(matches!(err, StoreError::Backend(ref m) if m.contains("token exchange")), "got {err:?}");
    assert_eq!(mock.mint_count(), 0);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn tournament_runs_over_sheets() {
    let (base, mock) = spawn_mock(MemoryStore::new()).await;
    let tournament = Tournament::new(client(&base, TOKEN), SheetLayout::default());

    let team = tournament
        .register_team(make_registration("Team Alpha", Game::Bgmi))
        .await
        .unwrap();
    tournament
        .submit_elimination_result(EliminationSubmission {
            match_id: "M1".to_string(),
            team_id: team.id.clone(),
            game: Game::Bgmi,
            placement: 2,
            kills: 4,
        })
        .await
        .unwrap();

    let board = tournament.leaderboard(Game::Bgmi).await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].team.points, 10);
    assert_eq!(board[0].team.matches, 1);

    let tabs = mock.store.list_sheets().await.unwrap();
    assert_eq!(tabs, vec!["Results".to_string(), "Teams".to_string()]);
}
