// atlas-server: headless Graph-Atlas backend (HTTP API only)
// Build with: cargo build --bin atlas-server

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use graph_atlas::api::server;
use graph_atlas::persistence::persist;
use graph_atlas::persistence::settings::AppSettings;

fn cli() -> Command {
    Command::new("atlas-server")
        .about("Graph-Atlas backend: serves the graph over HTTP and persists it to disk")
        .arg(Arg::new("bind").long("bind").value_name("ADDR").help("Bind address (defaults to settings)"))
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Listen port (defaults to settings)"),
        )
        .arg(Arg::new("api_key").long("api-key").value_name("KEY").help("Require this X-API-Key on /api requests"))
        .arg(
            Arg::new("data")
                .long("data")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory holding graph.ron"),
        )
        .arg(
            Arg::new("no_seed")
                .long("no-seed")
                .action(ArgAction::SetTrue)
                .help("Start with an empty graph instead of the sample dataset"),
        )
        .arg(Arg::new("no_autosave").long("no-autosave").action(ArgAction::SetTrue).help("Keep changes in memory only"))
}

fn apply_args(settings: &mut AppSettings, matches: &clap::ArgMatches) {
    if let Some(bind) = matches.get_one::<String>("bind") {
        settings.api_bind_addr = bind.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        settings.api_port = *port;
    }
    if let Some(key) = matches.get_one::<String>("api_key") {
        settings.api_key = Some(key.clone());
    }
    if let Some(dir) = matches.get_one::<PathBuf>("data") {
        settings.data_override = Some(dir.clone());
    }
    if matches.get_flag("no_seed") {
        settings.seed_when_empty = false;
    }
    if matches.get_flag("no_autosave") {
        settings.autosave = false;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = cli().get_matches();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {:#}", e);
        AppSettings::default()
    });
    apply_args(&mut settings, &matches);

    let graph = persist::open_shared_graph(&settings)?;
    let (nodes, relationships) = graph.counts();
    log::info!("serving {} nodes and {} relationships", nodes, relationships);
    server::serve(&settings, graph).await
}
