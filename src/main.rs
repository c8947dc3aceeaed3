use eframe::egui;

use graph_atlas::api::server::{self, ApiServer};
use graph_atlas::gui::frontend::AtlasApp;
use graph_atlas::persistence::persist;
use graph_atlas::persistence::settings::AppSettings;

fn start_embedded_api(settings: &AppSettings) -> Option<ApiServer> {
    if !settings.embedded_api {
        return None;
    }
    let graph = match persist::open_shared_graph(settings) {
        Ok(g) => g,
        Err(e) => {
            log::error!("could not open graph data: {:#}", e);
            return None;
        }
    };
    match server::spawn_background(settings, graph) {
        Ok(api) => Some(api),
        Err(e) => {
            // Another instance may already be serving this endpoint; the viewer still connects to it.
            log::warn!("embedded API not started: {:#}", e);
            None
        }
    }
}

fn main() -> eframe::Result {
    env_logger::init();
    let settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {:#}", e);
        AppSettings::default()
    });
    let api = start_embedded_api(&settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 760.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Graph-Atlas",
        options,
        Box::new(move |cc| {
            let app = AtlasApp::new(cc.egui_ctx.clone(), settings, api).map_err(|e| e.to_string())?;
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
}
