#![cfg(feature = "api")]

use graph_atlas::api::server::{spawn_background, ApiServer};
use graph_atlas::client::{GraphStore, RemoteBackend, StoreError};
use graph_atlas::graph_utils::graph::GraphDatabase;
use graph_atlas::graph_utils::model::{NodeKind, Properties, Scalar};
use graph_atlas::graph_utils::shared::SharedGraph;
use graph_atlas::persistence::seed::{seed_sample_data, SAMPLE_NODE_COUNT, SAMPLE_RELATIONSHIP_COUNT};
use graph_atlas::persistence::settings::AppSettings;
use tempfile::TempDir;
use uuid::Uuid;

// Seeded server on an ephemeral port, access log in a scratch dir.
fn start_server(api_key: Option<&str>) -> (TempDir, ApiServer) {
    let logs = TempDir::new().unwrap();
    let settings = AppSettings {
        api_port: 0,
        api_key: api_key.map(str::to_string),
        api_log_override: Some(logs.path().to_path_buf()),
        ..AppSettings::default()
    };
    let mut db = GraphDatabase::new();
    seed_sample_data(&mut db).unwrap();
    let api = spawn_background(&settings, SharedGraph::new(db)).unwrap();
    assert!(api.is_running());
    assert!(!api.endpoint().ends_with(":0"), "real port is reported");
    (logs, api)
}

fn remote_store(api: &ApiServer, api_key: Option<&str>) -> GraphStore<RemoteBackend> {
    let mut backend = RemoteBackend::new(&format!("http://{}/", api.endpoint()));
    assert_eq!(backend.base_url(), format!("http://{}", api.endpoint()));
    if let Some(key) = api_key {
        backend = backend.with_api_key(key);
    }
    GraphStore::new(backend)
}

#[tokio::test]
async fn store_round_trips_over_http() {
    let (logs, api) = start_server(None);
    let mut store = remote_store(&api, None);

    store.load().await.unwrap();
    assert_eq!(store.nodes().len(), SAMPLE_NODE_COUNT);
    assert_eq!(store.relationships().len(), SAMPLE_RELATIONSHIP_COUNT);

    let mut props = Properties::new();
    props.insert("department".into(), Scalar::text("Research"));
    props.insert("experience".into(), Scalar::Int(6));
    let ada = store.create_node("Ada", NodeKind::Employee, props).await.unwrap();

    // A fresh client sees the node exactly as created
    let mut other = remote_store(&api, None);
    other.load().await.unwrap();
    assert_eq!(other.node(ada.id), Some(&ada));

    let ghost = Uuid::now_v7();
    match store.update_node(ghost, Properties::new()).await {
        Err(StoreError::NotFound(msg)) => assert_eq!(msg, format!("node not found: {}", ghost)),
        unexpected => panic!("expected NotFound, got {:?}", unexpected),
    }

    match store.create_relationship(Some(ada.id), Some(ghost), "REPORTS_TO").await {
        Err(StoreError::Rejected { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.starts_with("invalid endpoint"), "{}", message);
        }
        unexpected => panic!("expected a 400, got {:?}", unexpected),
    }

    let company = store.nodes()[0].id;
    let rel = store.create_relationship(Some(ada.id), Some(company), "REPORTS_TO").await.unwrap();
    store.delete_node(ada.id).await.unwrap();
    assert!(store.relationship(rel.id).is_none());
    other.load().await.unwrap();
    assert!(other.relationship(rel.id).is_none(), "cascade happened on the server too");

    let report = store.execute_queries("MATCH NODE Project; CREATE NODE {broken").await.unwrap();
    assert_eq!((report.successful_queries, report.failed_queries), (1, 1));

    let logged = std::fs::read_dir(logs.path()).unwrap().filter_map(Result::ok).any(|e| {
        let name = e.file_name().to_string_lossy().into_owned();
        name.starts_with("api_") && name.ends_with(".log")
    });
    assert!(logged, "access log written");

    api.stop();
    let err = store.load().await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "{:?}", err);
    assert_eq!(store.nodes().len(), SAMPLE_NODE_COUNT, "stale cache stays visible");
}

#[tokio::test]
async fn api_key_travels_in_the_header() {
    let (_logs, api) = start_server(Some("s3cret"));

    let mut anonymous = remote_store(&api, None);
    match anonymous.load().await {
        Err(StoreError::Rejected { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "unauthorized");
        }
        unexpected => panic!("expected a 401, got {:?}", unexpected),
    }
    assert_eq!(anonymous.last_error(), Some("backend rejected request (401): unauthorized"));

    let mut wrong = remote_store(&api, Some("guess"));
    assert!(matches!(wrong.load().await, Err(StoreError::Rejected { status: 401, .. })));

    let mut keyed = remote_store(&api, Some("s3cret"));
    keyed.load().await.unwrap();
    assert_eq!(keyed.nodes().len(), SAMPLE_NODE_COUNT);
}
