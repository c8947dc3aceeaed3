//! Actix-web server for the Graph-Atlas JSON API (feature-gated)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{error, web, App, HttpRequest, HttpResponse, HttpServer};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::graph_utils::error::GraphError;
use crate::graph_utils::model::{NewNode, NewRelationship, Properties, RelationshipPatch};
use crate::graph_utils::shared::SharedGraph;
use crate::persistence::settings::AppSettings;

static REQ_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Everything a handler needs; cloned into every worker.
#[derive(Clone)]
pub struct ApiState {
    pub graph: SharedGraph,
    pub api_key: Option<String>,
    /// Access log directory. `None` disables the file log.
    pub log_dir: Option<PathBuf>,
}

impl ApiState {
    pub fn new(graph: SharedGraph) -> Self {
        Self { graph, api_key: None, log_dir: None }
    }

    pub fn from_settings(settings: &AppSettings, graph: SharedGraph) -> Self {
        Self {
            graph,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            log_dir: Some(settings.api_log_dir()),
        }
    }
}

fn log_line(dir: &Path, line: &str) {
    use std::io::Write;
    let now = time::OffsetDateTime::now_utc();
    let date = time::macros::format_description!("[year][month][day]");
    let ts = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let fname = match now.format(&date) { Ok(s) => format!("api_{}.log", s), Err(_) => "api.log".to_string() };
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }
    let ts_s = now.format(&ts).unwrap_or_else(|_| String::new());
    let msg = format!("{} | {}\n", ts_s, line);
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(dir.join(fname)) {
        let _ = f.write_all(msg.as_bytes());
    }
}

fn next_request_id() -> String {
    let n = REQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    format!("{}-{}", now, n)
}

fn error_json(status: StatusCode, msg: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": msg.into() }))
}

fn unauthorized() -> HttpResponse { error_json(StatusCode::UNAUTHORIZED, "unauthorized") }

fn graph_error(e: &GraphError) -> HttpResponse {
    let status = match e {
        GraphError::NodeNotFound(_) | GraphError::RelationshipNotFound(_) => StatusCode::NOT_FOUND,
        GraphError::DuplicateId(_) => StatusCode::CONFLICT,
        GraphError::InvalidEndpoint { .. } | GraphError::Validation(_) | GraphError::Query(_) => StatusCode::BAD_REQUEST,
    };
    error_json(status, e.to_string())
}

fn check_api_key(req: &HttpRequest, state: &ApiState) -> bool {
    match &state.api_key {
        None => true,
        Some(required) => match req.headers().get("X-API-Key") {
            Some(h) => h.to_str().map(|v| v == required).unwrap_or(false),
            None => false,
        },
    }
}

// Key check, request id and access log around a handler body.
fn traced(state: &ApiState, req: &HttpRequest, body: impl FnOnce() -> HttpResponse) -> HttpResponse {
    let rid = next_request_id();
    let t0 = Instant::now();
    let resp = if check_api_key(req, state) { body() } else { unauthorized() };
    let dt = t0.elapsed();
    let peer = req.peer_addr().map(|a| a.to_string()).unwrap_or_else(|| "unknown".into());
    let line = format!(
        "RID={} {} {} from {} -> {} dt_ms={}",
        rid,
        req.method(),
        req.path(),
        peer,
        resp.status().as_u16(),
        dt.as_millis()
    );
    if resp.status().is_server_error() {
        log::error!("{}", line);
    } else {
        log::debug!("{}", line);
    }
    if let Some(dir) = &state.log_dir {
        log_line(dir, &line);
    }
    resp
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[derive(Deserialize)]
struct QueryBody {
    query: String,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct UpdateNodeBody {
    #[serde(default)]
    properties: Properties,
}

async fn get_data(state: web::Data<ApiState>, req: HttpRequest) -> HttpResponse {
    traced(&state, &req, || HttpResponse::Ok().json(state.graph.snapshot()))
}

async fn post_data(state: web::Data<ApiState>, req: HttpRequest, body: web::Json<QueryBody>) -> HttpResponse {
    traced(&state, &req, || match state.graph.run_query(&body.query, &body.params) {
        Ok(outcome) => HttpResponse::Ok().json(json!({ "success": true, "result": outcome.rows })),
        Err(e) => graph_error(&e),
    })
}

async fn create_node(state: web::Data<ApiState>, req: HttpRequest, body: web::Json<NewNode>) -> HttpResponse {
    traced(&state, &req, || match state.graph.create_node(body.into_inner()) {
        Ok(node) => HttpResponse::Ok().json(node),
        Err(e) => graph_error(&e),
    })
}

async fn update_node(
    state: web::Data<ApiState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateNodeBody>,
) -> HttpResponse {
    traced(&state, &req, || {
        let Some(id) = parse_id(&path) else {
            return error_json(StatusCode::NOT_FOUND, "Node not found");
        };
        match state.graph.update_node(id, body.into_inner().properties) {
            Ok(node) => HttpResponse::Ok().json(node),
            Err(e) => graph_error(&e),
        }
    })
}

async fn delete_node(state: web::Data<ApiState>, req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    traced(&state, &req, || {
        let Some(id) = parse_id(&path) else {
            return error_json(StatusCode::NOT_FOUND, "Node not found");
        };
        // Unknown ids are not an error
        state.graph.delete_node(id);
        HttpResponse::Ok().json(json!({ "success": true }))
    })
}

async fn create_relationship(
    state: web::Data<ApiState>,
    req: HttpRequest,
    body: web::Json<NewRelationship>,
) -> HttpResponse {
    traced(&state, &req, || match state.graph.create_relationship(body.into_inner()) {
        Ok(rel) => HttpResponse::Ok().json(rel),
        Err(e) => graph_error(&e),
    })
}

async fn update_relationship(
    state: web::Data<ApiState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<RelationshipPatch>,
) -> HttpResponse {
    traced(&state, &req, || {
        let Some(id) = parse_id(&path) else {
            return error_json(StatusCode::NOT_FOUND, "Relationship not found");
        };
        match state.graph.update_relationship(id, body.into_inner()) {
            Ok(rel) => HttpResponse::Ok().json(rel),
            Err(e) => graph_error(&e),
        }
    })
}

async fn delete_relationship(state: web::Data<ApiState>, req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    traced(&state, &req, || {
        let Some(id) = parse_id(&path) else {
            return error_json(StatusCode::NOT_FOUND, "Relationship not found");
        };
        state.graph.delete_relationship(id);
        HttpResponse::Ok().json(json!({ "success": true }))
    })
}

async fn execute_queries(state: web::Data<ApiState>, req: HttpRequest, body: web::Json<serde_json::Value>) -> HttpResponse {
    traced(&state, &req, || {
        let Some(queries) = body.get("queries").and_then(|q| q.as_str()) else {
            return error_json(StatusCode::BAD_REQUEST, "Queries parameter is required and must be a string");
        };
        match state.graph.execute_batch(queries) {
            Ok(report) => HttpResponse::Ok().json(report),
            Err(e) => graph_error(&e),
        }
    })
}

async fn healthz(state: web::Data<ApiState>) -> HttpResponse {
    let (nodes, relationships) = state.graph.counts();
    HttpResponse::Ok().json(json!({ "status": "ok", "nodes": nodes, "relationships": relationships }))
}

/// Register every route. The caller provides `web::Data<ApiState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_cfg = web::JsonConfig::default()
        .limit(4 * 1024 * 1024)
        .error_handler(|err, _req| {
            let msg = err.to_string();
            error::InternalError::from_response(err, error_json(StatusCode::BAD_REQUEST, msg)).into()
        });
    cfg.app_data(json_cfg)
        .route("/healthz", web::get().to(healthz))
        .service(
            web::scope("/api")
                .route("/data", web::get().to(get_data))
                .route("/data", web::post().to(post_data))
                .route("/nodes", web::post().to(create_node))
                .route("/nodes/{id}", web::put().to(update_node))
                .route("/nodes/{id}", web::delete().to(delete_node))
                .route("/relationships", web::post().to(create_relationship))
                .route("/relationships/{id}", web::put().to(update_relationship))
                .route("/relationships/{id}", web::delete().to(delete_relationship))
                .route("/execute-queries", web::post().to(execute_queries)),
        );
}

/// Serve until the server is stopped (signal or handle).
pub async fn serve(settings: &AppSettings, graph: SharedGraph) -> anyhow::Result<()> {
    let bind = settings.api_endpoint();
    let state = ApiState::from_settings(settings, graph);
    if let Some(dir) = &state.log_dir {
        log_line(dir, &format!("Server starting on {}", bind));
    }
    log::info!("API listening on http://{}", bind);
    HttpServer::new(move || App::new().app_data(web::Data::new(state.clone())).configure(configure))
        .bind(&bind)?
        .run()
        .await?;
    Ok(())
}

/// Server running on its own thread and runtime (the viewer's embedded backend).
pub struct ApiServer {
    /// Address actually bound, `host:port`.
    endpoint: String,
    handle: Option<ServerHandle>,
    thread: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn endpoint(&self) -> &str { &self.endpoint }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(h) = self.handle.take() {
            // The stop command is sent right away; completion is awaited by joining the thread.
            drop(h.stop(false));
        }
        if let Some(t) = self.thread.take()
            && t.join().is_err()
        {
            log::error!("API server thread panicked");
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn spawn_background(settings: &AppSettings, graph: SharedGraph) -> anyhow::Result<ApiServer> {
    let bind = settings.api_endpoint();
    let state = ApiState::from_settings(settings, graph);
    let (tx, rx) = std::sync::mpsc::channel::<Result<(ServerHandle, String), String>>();
    let thread_bind = bind.clone();

    let thread = std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build() {
            Ok(r) => r,
            Err(e) => {
                let _ = tx.send(Err(format!("failed to create tokio runtime for API: {}", e)));
                return;
            }
        };
        rt.block_on(async move {
            if let Some(dir) = &state.log_dir {
                log_line(dir, &format!("Server starting on {}", thread_bind));
            }
            let (server, bound) = match HttpServer::new(move || {
                App::new().app_data(web::Data::new(state.clone())).configure(configure)
            })
            .workers(2)
            .bind(&thread_bind)
            {
                Ok(s) => {
                    // Port 0 binds an ephemeral port; report the real one
                    let bound = s.addrs().first().map(|a| a.to_string()).unwrap_or_else(|| thread_bind.clone());
                    (s.run(), bound)
                }
                Err(e) => {
                    let _ = tx.send(Err(format!("API server bind failed on {}: {}", thread_bind, e)));
                    return;
                }
            };
            let _ = tx.send(Ok((server.handle(), bound)));
            if let Err(e) = server.await {
                log::error!("API server stopped with error: {}", e);
            }
        });
    });

    match rx.recv() {
        Ok(Ok((handle, endpoint))) => {
            log::info!("embedded API listening on http://{}", endpoint);
            Ok(ApiServer { endpoint, handle: Some(handle), thread: Some(thread) })
        }
        Ok(Err(msg)) => {
            let _ = thread.join();
            Err(anyhow::anyhow!(msg))
        }
        Err(_) => {
            let _ = thread.join();
            Err(anyhow::anyhow!("API server thread exited before starting"))
        }
    }
}
