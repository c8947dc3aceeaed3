// HTTP API (feature-gated). Non-API builds get a stub that refuses to start.
#[cfg(feature = "api")]
pub mod server;

#[cfg(not(feature = "api"))]
pub mod server {
    use crate::graph_utils::shared::SharedGraph;
    use crate::persistence::settings::AppSettings;

    pub struct ApiServer;

    impl ApiServer {
        pub fn endpoint(&self) -> &str { "" }
        pub fn is_running(&self) -> bool { false }
        pub fn stop(self) {}
    }

    pub fn spawn_background(_settings: &AppSettings, _graph: SharedGraph) -> anyhow::Result<ApiServer> {
        Err(anyhow::anyhow!("built without the `api` feature"))
    }
}
