//! Fake backend (PostgREST, GoTrue and Realtime subsets) and app wiring shared by
//! the route tests.
#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, Bytes, to_bytes},
    extract::{
        Path, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use serde_json::{Value, json};
use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{net::TcpListener, sync::broadcast};
use tower::ServiceExt;
use url::Url;
use vectorshop::config::{StoreConfig, SupabaseConfig};
use vectorshop::relay::{self, FeedSource, RelayHandle};
use vectorshop::server::{AppState, app_router};
use vectorshop::supabase::SupabaseClient;

pub const ANA_TOKEN: &str = "token-ana";
pub const ANA_ID: &str = "user-ana";
pub const ADMIN_TOKEN: &str = "token-admin";
pub const ADMIN_ID: &str = "user-admin";
/// Makes the fake auth server fail with a 500.
pub const BROKEN_TOKEN: &str = "token-broken";
/// Auth server answers 500 with a JSON error body.
pub const FAILING_TOKEN: &str = "token-failing";
pub const PASSWORD: &str = "secret";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub table: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Captured {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    content_range: Option<String>,
    body: Value,
}

/// Channels currently joined on the fake Realtime socket, and the change frames
/// waiting to be pushed to them.
struct RealtimeHub {
    joined: Mutex<Vec<String>>,
    changes: broadcast::Sender<Value>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self {
            joined: Mutex::new(Vec::new()),
            changes: broadcast::channel(64).0,
        }
    }
}

/// Records every REST call and answers with queued responses, falling back to
/// PostgREST-like defaults (empty reads, echoed writes).
#[derive(Clone, Default)]
pub struct Upstream {
    reqs: Arc<Mutex<Vec<Captured>>>,
    canned: Arc<Mutex<HashMap<(Method, String), VecDeque<Canned>>>>,
    realtime: Arc<RealtimeHub>,
}

impl Upstream {
    pub fn respond(&self, method: Method, table: &str, status: u16, body: Value) -> &Self {
        self.push(method, table, status, None, body)
    }

    pub fn respond_count(&self, table: &str, total: u64) -> &Self {
        let range = if total == 0 {
            "*/0".to_string()
        } else {
            format!("0-{}/{}", total - 1, total)
        };
        self.push(Method::HEAD, table, 200, Some(range), Value::Null)
    }

    /// Single-row reads that find nothing.
    pub fn respond_no_rows(&self, method: Method, table: &str) -> &Self {
        self.respond(
            method,
            table,
            406,
            json!({
                "code": "PGRST116",
                "details": "The result contains 0 rows",
                "hint": null,
                "message": "JSON object requested, multiple (or no) rows returned"
            }),
        )
    }

    fn push(
        &self,
        method: Method,
        table: &str,
        status: u16,
        content_range: Option<String>,
        body: Value,
    ) -> &Self {
        self.canned
            .lock()
            .unwrap()
            .entry((method, table.to_string()))
            .or_default()
            .push_back(Canned {
                status: StatusCode::from_u16(status).expect("valid status"),
                content_range,
                body,
            });
        self
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }

    pub fn calls(&self, method: Method, table: &str) -> Vec<Captured> {
        self.requests()
            .into_iter()
            .filter(|c| c.method == method && c.table == table)
            .collect()
    }

    /// Realtime topics (`realtime:<channel>`) with a live join.
    pub fn joined_topics(&self) -> Vec<String> {
        self.realtime.joined.lock().unwrap().clone()
    }

    /// Waits until `topic` is joined (or left, when `joined` is false).
    pub async fn wait_for_topic(&self, topic: &str, joined: bool) {
        for _ in 0..250 {
            if self.joined_topics().iter().any(|t| t == topic) == joined {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("topic {topic} never reached joined={joined}");
    }

    /// Pushes an INSERT of `record` into `table` to sockets joined on `topic`.
    pub fn push_insert(&self, topic: &str, table: &str, record: Value) {
        let frame = json!({
            "topic": topic,
            "event": "postgres_changes",
            "payload": {"data": {"table": table, "type": "INSERT", "record": record}},
            "ref": null,
        });
        let _ = self.realtime.changes.send(frame);
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/realtime/v1/websocket", get(realtime_handler))
            .route("/rest/v1/{table}", any(rest_handler))
            .route("/auth/v1/user", get(user_handler))
            .route("/auth/v1/signup", post(signup_handler))
            .route("/auth/v1/token", post(token_handler))
            .with_state(self.clone())
    }
}

fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    let raw = format!("http://fake{}", uri);
    Url::parse(&raw)
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

/// Adds an `id` to rows that lack one, like a serial primary key would.
fn with_ids(body: Value) -> Value {
    match body {
        Value::Array(rows) => Value::Array(
            rows.into_iter()
                .enumerate()
                .map(|(i, row)| with_id(row, i as i64 + 1))
                .collect(),
        ),
        row => with_id(row, 1),
    }
}

fn with_id(mut row: Value, id: i64) -> Value {
    if let Some(obj) = row.as_object_mut() {
        obj.entry("id").or_insert(json!(id));
    }
    row
}

fn default_response(method: &Method, headers: &HeaderMap, body: Value) -> Canned {
    let single = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == SINGLE_OBJECT);
    let minimal = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=minimal"));

    let ok = |status: StatusCode, body: Value| Canned {
        status,
        content_range: None,
        body,
    };

    match *method {
        Method::GET if single => ok(
            StatusCode::NOT_ACCEPTABLE,
            json!({"code": "PGRST116", "message": "JSON object requested, multiple (or no) rows returned"}),
        ),
        Method::GET => ok(StatusCode::OK, json!([])),
        Method::HEAD => Canned {
            status: StatusCode::OK,
            content_range: Some("*/0".to_string()),
            body: Value::Null,
        },
        Method::POST => {
            let rows = with_ids(body);
            if single || rows.is_array() {
                ok(StatusCode::CREATED, rows)
            } else {
                ok(StatusCode::CREATED, Value::Array(vec![rows]))
            }
        }
        Method::PATCH if minimal => ok(StatusCode::NO_CONTENT, Value::Null),
        Method::PATCH if single => ok(StatusCode::OK, body),
        Method::PATCH => ok(StatusCode::OK, Value::Array(vec![body])),
        _ => ok(StatusCode::NO_CONTENT, Value::Null),
    }
}

async fn rest_handler(
    State(up): State<Upstream>,
    Path(table): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    up.reqs.lock().unwrap().push(Captured {
        method: method.clone(),
        table: table.clone(),
        query: query_pairs(&uri),
        headers: headers.clone(),
        body: body.clone(),
    });

    let canned = up
        .canned
        .lock()
        .unwrap()
        .get_mut(&(method.clone(), table))
        .and_then(VecDeque::pop_front)
        .unwrap_or_else(|| default_response(&method, &headers, body));

    let mut resp = if canned.body.is_null() {
        canned.status.into_response()
    } else {
        (canned.status, Json(canned.body)).into_response()
    };
    if let Some(range) = canned.content_range {
        resp.headers_mut()
            .insert(header::CONTENT_RANGE, range.parse().expect("header value"));
    }
    resp
}

async fn realtime_handler(State(up): State<Upstream>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| realtime_socket(socket, up))
}

async fn realtime_socket(mut socket: WebSocket, up: Upstream) {
    let mut changes = up.realtime.changes.subscribe();
    let mut topics: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            frame = socket.recv() => {
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let Ok(msg) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                let topic = msg["topic"].as_str().unwrap_or_default().to_string();
                match msg["event"].as_str() {
                    Some("phx_join") => {
                        up.realtime.joined.lock().unwrap().push(topic.clone());
                        topics.push(topic);
                        let reply = json!({
                            "topic": msg["topic"],
                            "event": "phx_reply",
                            "payload": {"status": "ok", "response": {}},
                            "ref": msg["ref"],
                        });
                        if socket.send(WsMessage::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Some("phx_leave") => {
                        topics.retain(|t| *t != topic);
                        forget_topic(&up, &topic);
                    }
                    _ => {}
                }
            }
            change = changes.recv() => match change {
                Ok(frame) => {
                    let wanted = frame["topic"]
                        .as_str()
                        .is_some_and(|t| topics.iter().any(|joined| joined == t));
                    if wanted && socket.send(WsMessage::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    for topic in topics {
        forget_topic(&up, &topic);
    }
}

fn forget_topic(up: &Upstream, topic: &str) {
    let mut joined = up.realtime.joined.lock().unwrap();
    if let Some(at) = joined.iter().position(|t| t == topic) {
        joined.remove(at);
    }
}

fn user_for(token: &str) -> Option<Value> {
    match token {
        ANA_TOKEN => Some(json!({"id": ANA_ID, "email": "ana@example.com", "role": "authenticated"})),
        ADMIN_TOKEN => Some(json!({"id": ADMIN_ID, "email": "admin@example.com"})),
        _ => None,
    }
}

async fn user_handler(headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if token == BROKEN_TOKEN {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if token == FAILING_TOKEN {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"code": 500, "error_code": "unexpected_failure", "msg": "database unavailable"})),
        )
            .into_response();
    }
    match user_for(token) {
        Some(user) => Json(user).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "error_code": "bad_jwt", "msg": "invalid JWT: unable to parse or verify signature"})),
        )
            .into_response(),
    }
}

/// E-mails containing `confirm` get a bare user back, as when confirmation is on.
async fn signup_handler(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email.contains("taken") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"code": 422, "error_code": "user_already_exists", "msg": "User already registered"})),
        )
            .into_response();
    }
    let user = json!({"id": "user-new", "email": email});
    if email.contains("confirm") {
        Json(user).into_response()
    } else {
        Json(json!({
            "access_token": "token-new",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-new",
            "user": user,
        }))
        .into_response()
    }
}

async fn token_handler(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({
            "access_token": ANA_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-ana",
            "user": {"id": ANA_ID, "email": body["email"]},
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
        )
            .into_response()
    }
}

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

fn unique_static_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("vectorshop-public-{}-{}", std::process::id(), nanos));
    std::fs::create_dir_all(&dir).expect("create static dir");
    for page in ["index", "signup", "login"] {
        std::fs::write(dir.join(format!("{page}.html")), format!("<h1>{page}</h1>"))
            .expect("write page");
    }
    std::fs::write(dir.join("app.js"), "console.log('shop');").expect("write asset");
    dir
}

pub struct TestApp {
    pub router: Router,
    pub upstream: Upstream,
    pub relay: RelayHandle,
}

/// Knobs the default app turns off.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestOptions {
    pub retry_max_times: usize,
    /// Open per-user notification feeds against the fake Realtime socket.
    pub feeds: bool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(opts: TestOptions) -> Self {
        let upstream = Upstream::default();
        let base = spawn_test_server(upstream.router()).await;

        let cfg = SupabaseConfig {
            url: Some(base),
            anon_key: "anon-test-key".to_string(),
            retry_max_times: opts.retry_max_times,
            auth_cache_ttl_secs: 0,
            ..Default::default()
        };
        let supabase = SupabaseClient::from_config(&cfg).expect("backend client");
        let source = opts
            .feeds
            .then(|| FeedSource::new(supabase.clone()).expect("feed source"));
        let relay = relay::spawn(source).await.expect("relay");

        let state = AppState::new(
            supabase,
            relay.clone(),
            StoreConfig::default(),
            unique_static_dir(),
        );

        Self {
            router: app_router(state),
            upstream,
            relay,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("router response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, path, token, None)).await
    }

    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(request(method, path, token, Some(body))).await
    }
}

pub fn request(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
