use std::future::Future;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, RichText, Sense, Vec2};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::server::ApiServer;
use crate::client::{build_properties, GraphBackend, GraphStore, RemoteBackend, StoreResult};
use crate::gql::query_interface::BatchReport;
use crate::graph_utils::model::{
    GraphSnapshot, Node, NodeId, NodeKind, Relationship, RelationshipId, RelationshipPatch,
};
use crate::persistence::export;
use crate::persistence::settings::AppSettings;
use crate::view::layout::{LayoutEngine, LayoutMode, PointerOutcome};
use crate::view::overview::{apply_filter, node_details, CompanyStats, FilteredView, GraphOverview, TypeFilter};
use crate::view::scene::{build_scene, Scene};
use crate::view::search::{advanced_search, parse_date, AdvancedFilter, LiveSearch, ResultKind, SearchResult};
use crate::view::style::{node_type_color, relationship_color, RELATIONSHIP_TYPES};

const NOTICE_TTL: Duration = Duration::from_secs(4);
const NODE_TYPES: [&str; 3] = ["Company", "Employee", "Project"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SidebarMode {
    Overview,
    Search,
    Manage,
    Query,
}

/// Backend round trips finished on the runtime, applied to the store on the UI thread.
enum Completion {
    Loaded { result: StoreResult<GraphSnapshot>, announce: bool },
    NodeCreated(StoreResult<Node>),
    NodeUpdated(NodeId, StoreResult<Node>),
    NodeDeleted(NodeId, StoreResult<()>),
    RelationshipCreated(StoreResult<Relationship>),
    RelationshipUpdated(RelationshipId, StoreResult<Relationship>),
    RelationshipDeleted(RelationshipId, StoreResult<()>),
    Batch(StoreResult<BatchReport>),
}

struct Notice {
    text: String,
    is_error: bool,
    at: Instant,
}

// Text buffers behind the advanced search form
#[derive(Default)]
struct AdvancedForm {
    node_type: String,
    property_key: String,
    property_value: String,
    start: String,
    end: String,
    relationship_type: String,
}

impl AdvancedForm {
    fn to_filter(&self) -> Result<AdvancedFilter, String> {
        let opt = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());
        let date = |s: &str| -> Result<Option<time::Date>, String> {
            if s.trim().is_empty() {
                return Ok(None);
            }
            parse_date(s).map(Some).ok_or_else(|| format!("invalid date: {}", s.trim()))
        };
        let mut filter = AdvancedFilter {
            node_type: opt(&self.node_type),
            property_key: opt(&self.property_key),
            property_value: opt(&self.property_value),
            relationship_type: opt(&self.relationship_type),
            ..Default::default()
        };
        filter.date_range.start = date(&self.start)?;
        filter.date_range.end = date(&self.end)?;
        Ok(filter)
    }
}

pub struct AtlasApp {
    runtime: Runtime,
    ctx: egui::Context,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    pending: usize,
    store: GraphStore<RemoteBackend>,
    settings: AppSettings,
    _api: Option<ApiServer>,
    layout: LayoutEngine,
    search: LiveSearch,
    search_text: String,
    advanced: AdvancedForm,
    advanced_results: Vec<SearchResult>,
    filter: TypeFilter,
    filtered: FilteredView,
    filtered_key: Option<(u64, TypeFilter)>,
    scene: Scene,
    sidebar_mode: SidebarMode,
    notice: Option<Notice>,
    // Creation forms state
    create_node_name: String,
    create_node_type: String,
    create_node_props: Vec<(String, String)>,
    create_rel_source: Option<NodeId>,
    create_rel_target: Option<NodeId>,
    create_rel_type: String,
    // Edit helpers for the selected node / relationship
    edit_props: Vec<(String, String)>,
    edit_rel: Option<RelationshipId>,
    edit_rel_patch: RelationshipPatch,
    // Batch query console
    batch_text: String,
    batch_report: Option<BatchReport>,
    export_is_json: bool,
}

impl AtlasApp {
    pub fn new(ctx: egui::Context, settings: AppSettings, api: Option<ApiServer>) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build()?;
        let mut backend = RemoteBackend::new(&settings.backend_base_url());
        if let Some(key) = settings.api_key.as_ref().filter(|k| !k.is_empty()) {
            backend = backend.with_api_key(key.clone());
        }
        let store = GraphStore::new(backend);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let debounce = Duration::from_millis(settings.search_debounce_ms);
        let mut app = Self {
            runtime,
            ctx,
            completions_tx,
            completions_rx,
            pending: 0,
            store,
            layout: LayoutEngine::new(settings.layout_mode, settings.hub_type.clone()),
            search: LiveSearch::new(debounce),
            search_text: String::new(),
            advanced: AdvancedForm::default(),
            advanced_results: Vec::new(),
            filter: TypeFilter::All,
            filtered: FilteredView::default(),
            filtered_key: None,
            scene: Scene::default(),
            sidebar_mode: SidebarMode::Overview,
            notice: None,
            create_node_name: String::new(),
            create_node_type: NODE_TYPES[0].to_string(),
            create_node_props: vec![(String::new(), String::new())],
            create_rel_source: None,
            create_rel_target: None,
            create_rel_type: RELATIONSHIP_TYPES[0].to_string(),
            edit_props: Vec::new(),
            edit_rel: None,
            edit_rel_patch: RelationshipPatch::default(),
            batch_text: String::new(),
            batch_report: None,
            export_is_json: true,
            settings,
            _api: api,
        };
        // A failed first load leaves an error banner; the user can retry from the top bar.
        app.start_load(false);
        Ok(app)
    }

    /// Run a backend call off the UI thread; its completion is applied in `update`.
    fn dispatch<F>(&mut self, op: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.pending += 1;
        let tx = self.completions_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            // The receiver lives as long as the app
            let _ = tx.send(op.await);
            ctx.request_repaint();
        });
    }

    fn is_busy(&self) -> bool {
        self.pending > 0 || self.store.is_loading()
    }

    fn start_load(&mut self, announce: bool) {
        self.store.begin_load();
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::Loaded { result: backend.fetch_graph().await, announce } });
    }

    fn drain_completions(&mut self) {
        while let Ok(done) = self.completions_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.complete(done);
        }
    }

    fn complete(&mut self, done: Completion) {
        match done {
            Completion::Loaded { result, announce } => {
                let result = self.store.finish_load(result);
                if announce {
                    self.settle(result, |_| "Graph reloaded".to_string());
                }
            }
            Completion::NodeCreated(result) => {
                let result = self.store.finish_create_node(result);
                if self.settle(result, |n| format!("Created {} '{}'", n.kind, n.name)).is_some() {
                    self.create_node_name.clear();
                    self.create_node_props = vec![(String::new(), String::new())];
                }
            }
            Completion::NodeUpdated(id, result) => {
                let result = self.store.finish_update_node(id, result);
                if self.settle(result, |n| format!("Updated '{}'", n.name)).is_some() {
                    self.edit_props = vec![(String::new(), String::new())];
                }
            }
            Completion::NodeDeleted(id, result) => {
                let name = self.node_name(id);
                let result = self.store.finish_delete_node(id, result);
                if self.settle(result, |_| format!("Deleted '{}' and its relationships", name)).is_some()
                    && self.layout.selected() == Some(id)
                {
                    self.select_node(None);
                }
            }
            Completion::RelationshipCreated(result) => {
                let result = self.store.finish_create_relationship(result);
                if self.settle(result, |r| format!("Created {} relationship", r.kind)).is_some() {
                    self.create_rel_source = None;
                    self.create_rel_target = None;
                }
            }
            Completion::RelationshipUpdated(id, result) => {
                let result = self.store.finish_update_relationship(id, result);
                if self.settle(result, |r| format!("Updated {} relationship", r.kind)).is_some()
                    && self.edit_rel == Some(id)
                {
                    self.edit_rel = None;
                }
            }
            Completion::RelationshipDeleted(id, result) => {
                let result = self.store.finish_delete_relationship(id, result);
                self.settle(result, |_| "Relationship deleted".to_string());
                if self.edit_rel == Some(id) {
                    self.edit_rel = None;
                }
            }
            Completion::Batch(result) => {
                let result = self.store.finish_execute_queries(result);
                if let Some(report) = self.settle(result, |r| r.message.clone()) {
                    if !report.success {
                        self.notify(report.message.clone(), true);
                    }
                    if report.mutated {
                        self.start_load(false);
                    }
                    self.batch_report = Some(report);
                }
            }
        }
    }

    fn notify(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice { text: text.into(), is_error, at: Instant::now() });
    }

    // Store errors are already logged and kept in last_error; surface them as a toast too.
    fn settle<T>(&mut self, result: StoreResult<T>, ok_msg: impl FnOnce(&T) -> String) -> Option<T> {
        match result {
            Ok(v) => {
                let msg = ok_msg(&v);
                self.notify(msg, false);
                Some(v)
            }
            Err(e) => {
                self.notify(e.to_string(), true);
                None
            }
        }
    }

    fn node_name(&self, id: NodeId) -> String {
        self.store.node(id).map(|n| n.name.clone()).unwrap_or_else(|| "(missing)".to_string())
    }

    fn refresh_filtered(&mut self) {
        let key = (self.store.revision(), self.filter.clone());
        if self.filtered_key.as_ref() != Some(&key) {
            self.filtered = apply_filter(self.store.nodes(), self.store.relationships(), &self.filter);
            self.filtered_key = Some(key);
            self.search.invalidate(Instant::now());
        }
    }

    fn select_node(&mut self, id: Option<NodeId>) {
        self.layout.select(id);
        self.edit_rel = None;
        self.edit_props = match id.and_then(|id| self.store.node(id)) {
            Some(_) => vec![(String::new(), String::new())],
            None => Vec::new(),
        };
    }

    fn reload(&mut self) {
        self.start_load(true);
    }

    fn create_node(&mut self) {
        let props = match build_properties(&self.create_node_props) {
            Ok(p) => p,
            Err(e) => {
                self.notify(e.to_string(), true);
                return;
            }
        };
        let kind = NodeKind::parse(self.create_node_type.trim());
        let req = self.store.node_request(&self.create_node_name, kind, props);
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::NodeCreated(backend.create_node(&req).await) });
    }

    fn create_relationship(&mut self) {
        let (source, target) = (self.create_rel_source, self.create_rel_target);
        let req = match self.store.relationship_request(source, target, &self.create_rel_type) {
            Ok(req) => req,
            Err(e) => {
                self.notify(e.to_string(), true);
                return;
            }
        };
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::RelationshipCreated(backend.create_relationship(&req).await) });
    }

    fn update_selected_node(&mut self, id: NodeId) {
        let props = match build_properties(&self.edit_props) {
            Ok(p) if p.is_empty() => {
                self.notify("Nothing to update", false);
                return;
            }
            Ok(p) => p,
            Err(e) => {
                self.notify(e.to_string(), true);
                return;
            }
        };
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::NodeUpdated(id, backend.update_node(id, &props).await) });
    }

    fn delete_node(&mut self, id: NodeId) {
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::NodeDeleted(id, backend.delete_node(id).await) });
    }

    fn update_relationship(&mut self, id: RelationshipId) {
        let patch = std::mem::take(&mut self.edit_rel_patch);
        if let Err(e) = self.store.check_relationship_patch(&patch) {
            self.notify(e.to_string(), true);
            return;
        }
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::RelationshipUpdated(id, backend.update_relationship(id, &patch).await) });
    }

    fn delete_relationship(&mut self, id: RelationshipId) {
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::RelationshipDeleted(id, backend.delete_relationship(id).await) });
    }

    fn run_batch(&mut self) {
        if let Err(e) = self.store.check_queries(&self.batch_text) {
            self.notify(e.to_string(), true);
            return;
        }
        let queries = self.batch_text.clone();
        let backend = self.store.backend().clone();
        self.dispatch(async move { Completion::Batch(backend.execute_queries(&queries).await) });
    }

    fn export_graph(&mut self) {
        let now = time::OffsetDateTime::now_utc();
        let fmt = time::macros::format_description!("[year][month][day]_[hour][minute][second]");
        let stamp = now.format(&fmt).unwrap_or_else(|_| "now".into());
        let ext = if self.export_is_json { "json" } else { "csv" };
        let path = self.settings.export_dir().join(format!("graph_export_{}.{}", stamp, ext));
        let (nodes, rels) = (self.store.nodes(), self.store.relationships());
        let result = if self.export_is_json {
            export::export_graph_json(nodes, rels, &path).map(|_| path.display().to_string())
        } else {
            export::export_graph_csv(nodes, rels, &path).map(|(n, r)| format!("{} and {}", n.display(), r.display()))
        };
        match result {
            Ok(written) => self.notify(format!("Exported to {}", written), false),
            Err(e) => {
                log::error!("export failed: {:#}", e);
                self.notify(format!("Export failed: {}", e), true);
            }
        }
    }

    fn export_hits(&mut self, hits: Vec<Node>) {
        let now = time::OffsetDateTime::now_utc();
        let fmt = time::macros::format_description!("[year][month][day]_[hour][minute][second]");
        let stamp = now.format(&fmt).unwrap_or_else(|_| "now".into());
        let ext = if self.export_is_json { "json" } else { "csv" };
        let path = self.settings.export_dir().join(format!("search_hits_{}.{}", stamp, ext));
        let result = if self.export_is_json {
            export::export_nodes_json(&hits, &path)
        } else {
            export::export_nodes_csv(&hits, &path)
        };
        match result {
            Ok(()) => self.notify(format!("Exported {} nodes to {}", hits.len(), path.display()), false),
            Err(e) => self.notify(format!("Export failed: {}", e), true),
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Graph-Atlas").strong());
                ui.separator();
                let mode = match self.layout.mode() {
                    LayoutMode::Ring => "Layout: Ring",
                    LayoutMode::Grid => "Layout: Grid",
                };
                if ui.button(mode).on_hover_text("Toggle ring / grid placement").clicked() {
                    self.layout.toggle_mode();
                }
                if ui.button("Reset Layout").clicked() {
                    self.layout.reset();
                }
                let mut hub = self.layout.hub_kind().to_string();
                egui::ComboBox::from_id_salt("hub_kind")
                    .selected_text(format!("Hub: {}", hub))
                    .show_ui(ui, |ui| {
                        for t in NODE_TYPES {
                            ui.selectable_value(&mut hub, t.to_string(), t);
                        }
                    });
                if hub != self.layout.hub_kind() {
                    self.layout.set_hub_kind(hub);
                }
                let reload_hint = format!("Fetch the graph from {}", self.store.backend().base_url());
                if ui.button("Reload").on_hover_text(reload_hint).clicked() {
                    self.reload();
                }
                ui.menu_button("Export", |ui| {
                    ui.checkbox(&mut self.export_is_json, "JSON (uncheck for CSV)");
                    if ui.button("Export Graph").clicked() {
                        self.export_graph();
                        ui.close();
                    }
                });
                ui.separator();
                ui.small(format!("N:{} R:{}", self.store.nodes().len(), self.store.relationships().len()));
                if self.is_busy() {
                    ui.spinner();
                }
                if let Some(label) = self.filter.label() {
                    ui.separator();
                    ui.small(format!("Filter: {}", label));
                }
                let mut clear = false;
                if let Some(err) = self.store.last_error() {
                    ui.separator();
                    ui.colored_label(Color32::RED, err);
                    clear = ui.small_button("x").clicked();
                }
                if clear {
                    self.store.clear_error();
                }
            });
        });
    }

    fn overview_panel(&mut self, ui: &mut egui::Ui) {
        let overview = GraphOverview::compute(self.store.nodes(), self.store.relationships());
        let stats = CompanyStats::compute(self.store.nodes());

        ui.heading("Company");
        egui::Grid::new("company_stats").num_columns(2).show(ui, |ui| {
            ui.label("Employees");
            ui.label(stats.total_employees.to_string());
            ui.end_row();
            ui.label("Projects");
            ui.label(stats.active_projects.to_string());
            ui.end_row();
            ui.label("Departments");
            ui.label(stats.departments.to_string());
            ui.end_row();
            ui.label("Avg. experience");
            ui.label(stats.avg_experience.map(|y| format!("{}y", y)).unwrap_or_else(|| "-".into()));
            ui.end_row();
        });
        ui.separator();

        ui.horizontal(|ui| {
            ui.heading("Overview");
            if self.filter.is_active() && ui.small_button("Clear filter").clicked() {
                self.filter = TypeFilter::All;
                self.select_node(None);
            }
        });
        ui.label(format!("{} nodes, {} relationships", overview.total_nodes, overview.total_relationships));
        ui.add_space(4.0);
        ui.label("Node types");
        ui.horizontal_wrapped(|ui| {
            for (kind, count) in &overview.node_types {
                let active = self.filter == TypeFilter::NodeType(kind.clone());
                let chip = egui::Button::new(RichText::new(format!("{} ({})", kind, count)).color(Color32::WHITE))
                    .fill(node_type_color(kind))
                    .selected(active);
                if ui.add(chip).clicked() {
                    self.filter = TypeFilter::NodeType(kind.clone());
                    self.select_node(None);
                }
            }
        });
        ui.label("Relationship types");
        ui.horizontal_wrapped(|ui| {
            for (kind, count) in &overview.relationship_types {
                let active = self.filter == TypeFilter::RelationshipType(kind.clone());
                let chip = egui::Button::new(RichText::new(format!("{} ({})", kind, count)).color(Color32::WHITE))
                    .fill(relationship_color(kind))
                    .selected(active);
                if ui.add(chip).clicked() {
                    self.filter = TypeFilter::RelationshipType(kind.clone());
                    self.select_node(None);
                }
            }
        });
        egui::CollapsingHeader::new(format!("Property keys ({})", overview.property_keys.len()))
            .default_open(false)
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for key in &overview.property_keys {
                        ui.small(key);
                    }
                });
            });
    }

    fn result_row(ui: &mut egui::Ui, result: &SearchResult) -> bool {
        let kind = match result.kind {
            ResultKind::Node => "node",
            ResultKind::Relationship => "rel",
        };
        let resp = ui.selectable_label(false, format!("[{}] {}", kind, result.title()));
        ui.small(format!("Matched in: {} | relevance {}", result.matched_fields.join(", "), result.relevance));
        resp.clicked()
    }

    fn search_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Search");
        let resp = ui.add(egui::TextEdit::singleline(&mut self.search_text).hint_text("name, type or property"));
        if resp.changed() {
            self.search.set_query(&self.search_text, Instant::now());
        }
        if self.search.is_searching() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.small("searching...");
            });
        }
        let mut pick = None;
        for result in self.search.results() {
            if Self::result_row(ui, result) {
                pick = result.node_id();
            }
        }
        if !self.search_text.trim().is_empty() && self.search.results().is_empty() && !self.search.is_searching() {
            ui.small("No matches");
        }
        ui.separator();

        ui.heading("Advanced");
        egui::Grid::new("advanced_form").num_columns(2).show(ui, |ui| {
            ui.label("Node type");
            ui.text_edit_singleline(&mut self.advanced.node_type);
            ui.end_row();
            ui.label("Property key");
            ui.text_edit_singleline(&mut self.advanced.property_key);
            ui.end_row();
            ui.label("Property value");
            ui.text_edit_singleline(&mut self.advanced.property_value);
            ui.end_row();
            ui.label("From (YYYY-MM-DD)");
            ui.text_edit_singleline(&mut self.advanced.start);
            ui.end_row();
            ui.label("To (YYYY-MM-DD)");
            ui.text_edit_singleline(&mut self.advanced.end);
            ui.end_row();
            ui.label("Relationship type");
            ui.text_edit_singleline(&mut self.advanced.relationship_type);
            ui.end_row();
        });
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                match self.advanced.to_filter() {
                    Ok(filter) => {
                        self.advanced_results = advanced_search(self.store.nodes(), self.store.relationships(), &filter);
                        let n = self.advanced_results.len();
                        self.notify(format!("{} results", n), false);
                    }
                    Err(e) => self.notify(e, true),
                }
            }
            if ui.button("Reset").clicked() {
                self.advanced = AdvancedForm::default();
                self.advanced_results.clear();
            }
        });
        egui::ScrollArea::vertical().id_salt("advanced_results").max_height(220.0).show(ui, |ui| {
            for result in &self.advanced_results {
                if Self::result_row(ui, result) {
                    pick = result.node_id();
                }
            }
        });
        if !self.advanced_results.is_empty() && ui.button("Export node hits").clicked() {
            let hits: Vec<Node> = self
                .advanced_results
                .iter()
                .filter_map(|r| r.node_id())
                .filter_map(|id| self.store.node(id).cloned())
                .collect();
            self.export_hits(hits);
        }
        if let Some(id) = pick {
            self.filter = TypeFilter::All;
            self.refresh_filtered();
            self.select_node(Some(id));
        }
    }

    fn node_combo(ui: &mut egui::Ui, id_salt: &str, nodes: &[Node], value: &mut Option<NodeId>) {
        let text = value
            .and_then(|id| nodes.iter().find(|n| n.id == id))
            .map(|n| format!("{} ({})", n.name, n.kind))
            .unwrap_or_else(|| "Select node".to_string());
        egui::ComboBox::from_id_salt(id_salt).selected_text(text).width(200.0).show_ui(ui, |ui| {
            for n in nodes {
                ui.selectable_value(value, Some(n.id), format!("{} ({})", n.name, n.kind));
            }
        });
    }

    fn props_editor(ui: &mut egui::Ui, rows: &mut Vec<(String, String)>) {
        let mut remove = None;
        for (i, (k, v)) in rows.iter_mut().enumerate() {
            ui.horizontal(|ui| {
                ui.add(egui::TextEdit::singleline(k).hint_text("key").desired_width(90.0));
                ui.add(egui::TextEdit::singleline(v).hint_text("value").desired_width(120.0));
                if ui.small_button("-").clicked() {
                    remove = Some(i);
                }
            });
        }
        if let Some(i) = remove {
            rows.remove(i);
        }
        if ui.small_button("+ property").clicked() {
            rows.push((String::new(), String::new()));
        }
    }

    fn manage_panel(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Create Node").default_open(true).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut self.create_node_name);
            });
            ui.horizontal(|ui| {
                ui.label("Type");
                egui::ComboBox::from_id_salt("create_node_type")
                    .selected_text(self.create_node_type.clone())
                    .show_ui(ui, |ui| {
                        for t in NODE_TYPES {
                            ui.selectable_value(&mut self.create_node_type, t.to_string(), t);
                        }
                    });
            });
            Self::props_editor(ui, &mut self.create_node_props);
            if ui.button("Create").clicked() {
                self.create_node();
            }
        });

        egui::CollapsingHeader::new("Create Relationship").default_open(true).show(ui, |ui| {
            let nodes = self.store.nodes().to_vec();
            ui.label("From");
            Self::node_combo(ui, "create_rel_source", &nodes, &mut self.create_rel_source);
            ui.label("To");
            Self::node_combo(ui, "create_rel_target", &nodes, &mut self.create_rel_target);
            ui.horizontal(|ui| {
                ui.label("Type");
                egui::ComboBox::from_id_salt("create_rel_type")
                    .selected_text(self.create_rel_type.clone())
                    .show_ui(ui, |ui| {
                        for t in RELATIONSHIP_TYPES {
                            ui.selectable_value(&mut self.create_rel_type, t.to_string(), t);
                        }
                    });
            });
            if ui.button("Create").clicked() {
                self.create_relationship();
            }
        });

        ui.separator();
        match self.layout.selected() {
            Some(id) => self.selected_node_panel(ui, id),
            None => {
                ui.small("Click a node on the canvas to inspect or edit it.");
            }
        }
    }

    fn selected_node_panel(&mut self, ui: &mut egui::Ui, id: NodeId) {
        let Some(details) = node_details(self.store.nodes(), self.store.relationships(), id) else {
            ui.small("Selected node is no longer in the graph.");
            return;
        };
        ui.heading(&details.node.name);
        ui.label(format!("{} | connectivity {}%", details.node.kind, details.connectivity_percent));
        egui::Grid::new("selected_props").num_columns(2).striped(true).show(ui, |ui| {
            for (k, v) in &details.node.properties {
                ui.label(k);
                ui.label(v.to_string());
                ui.end_row();
            }
        });

        ui.add_space(4.0);
        ui.label(format!("Outgoing ({})", details.outgoing.len()));
        let mut delete_rel = None;
        let mut edit_rel = None;
        for (rel, peer) in details.outgoing.iter().chain(details.incoming.iter()) {
            ui.horizontal(|ui| {
                let arrow = if rel.source == id { "->" } else { "<-" };
                ui.small(format!("{} {} {}", arrow, rel.kind, peer.name));
                if ui.small_button("edit").clicked() {
                    edit_rel = Some(rel.id);
                }
                if ui.small_button("del").clicked() {
                    delete_rel = Some(rel.id);
                }
            });
        }
        if let Some(rid) = delete_rel {
            self.delete_relationship(rid);
        }
        if let Some(rid) = edit_rel {
            self.edit_rel = Some(rid);
            self.edit_rel_patch = RelationshipPatch::default();
        }
        if let Some(rid) = self.edit_rel {
            self.relationship_editor(ui, rid);
        }

        ui.separator();
        ui.label("Add / change properties");
        Self::props_editor(ui, &mut self.edit_props);
        ui.horizontal(|ui| {
            if ui.button("Update").clicked() {
                self.update_selected_node(id);
            }
            let del = egui::Button::new(RichText::new("Delete node").color(Color32::WHITE)).fill(Color32::from_rgb(0xdc, 0x26, 0x26));
            if ui.add(del).clicked() {
                self.delete_node(id);
            }
        });
    }

    fn relationship_editor(&mut self, ui: &mut egui::Ui, rid: RelationshipId) {
        let Some(rel) = self.store.relationship(rid).cloned() else {
            self.edit_rel = None;
            return;
        };
        let nodes = self.store.nodes().to_vec();
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.label(format!("Edit {}", rel.kind));
            let mut source = Some(self.edit_rel_patch.source.unwrap_or(rel.source));
            let mut target = Some(self.edit_rel_patch.target.unwrap_or(rel.target));
            Self::node_combo(ui, "edit_rel_source", &nodes, &mut source);
            Self::node_combo(ui, "edit_rel_target", &nodes, &mut target);
            let mut kind = self.edit_rel_patch.kind.clone().unwrap_or_else(|| rel.kind.clone());
            ui.text_edit_singleline(&mut kind);
            self.edit_rel_patch.source = source.filter(|s| *s != rel.source);
            self.edit_rel_patch.target = target.filter(|t| *t != rel.target);
            self.edit_rel_patch.kind = (kind != rel.kind).then_some(kind);
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    self.update_relationship(rid);
                }
                if ui.button("Cancel").clicked() {
                    self.edit_rel = None;
                }
            });
        });
    }

    fn query_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Execute Queries");
        ui.small("Separate statements with ';'. Each runs independently.");
        ui.add(
            egui::TextEdit::multiline(&mut self.batch_text)
                .code_editor()
                .desired_rows(8)
                .hint_text("CREATE NODE Employee {name:\"Ada\", department:\"Engineering\"};\nMATCH NODE Employee"),
        );
        ui.horizontal(|ui| {
            if ui.button("Run").clicked() {
                self.run_batch();
            }
            if ui.button("Clear").clicked() {
                self.batch_text.clear();
                self.batch_report = None;
            }
        });
        let Some(report) = &self.batch_report else {
            return;
        };
        ui.separator();
        let color = if report.success { Color32::from_rgb(0x05, 0x96, 0x69) } else { Color32::RED };
        ui.colored_label(color, &report.message);
        ui.small(format!(
            "total {} | ok {} | failed {}",
            report.total_queries, report.successful_queries, report.failed_queries
        ));
        egui::ScrollArea::vertical().id_salt("batch_report").max_height(260.0).show(ui, |ui| {
            for r in &report.results {
                ui.small(format!("OK ({} rows): {}", r.affected_rows, r.query));
            }
            for e in &report.errors {
                ui.colored_label(Color32::RED, format!("#{} {}: {}", e.query_index, e.query, e.error));
            }
        });
    }

    fn sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("atlas_sidebar").resizable(true).default_width(300.0).show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (mode, label) in [
                    (SidebarMode::Overview, "Overview"),
                    (SidebarMode::Search, "Search"),
                    (SidebarMode::Manage, "Manage"),
                    (SidebarMode::Query, "Query"),
                ] {
                    if ui.selectable_label(self.sidebar_mode == mode, label).clicked() {
                        self.sidebar_mode = mode;
                    }
                }
            });
            ui.separator();
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| match self.sidebar_mode {
                SidebarMode::Overview => self.overview_panel(ui),
                SidebarMode::Search => self.search_panel(ui),
                SidebarMode::Manage => self.manage_panel(ui),
                SidebarMode::Query => self.query_panel(ui),
            });
        });
    }

    fn canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let size = ui.available_size();
            let (resp, painter) = ui.allocate_painter(size, Sense::click_and_drag());
            let rect = resp.rect;
            let origin = rect.min.to_vec2();
            self.layout.sync(&self.filtered.nodes, self.store.revision(), rect.size());

            let (pressed, down, released, latest) = ui.input(|i| {
                (i.pointer.primary_pressed(), i.pointer.primary_down(), i.pointer.primary_released(), i.pointer.latest_pos())
            });
            if let Some(p) = latest {
                let local = p - origin;
                if pressed && resp.hovered() {
                    if self.layout.pointer_down(local) == PointerOutcome::Cleared {
                        self.select_node(None);
                    }
                } else if down {
                    if let PointerOutcome::Moved(_) = self.layout.pointer_move(local) {
                        ctx.request_repaint();
                    }
                }
                if released {
                    if let PointerOutcome::Selected(id) = self.layout.pointer_up(local) {
                        self.select_node(Some(id));
                        if self.sidebar_mode != SidebarMode::Manage {
                            self.sidebar_mode = SidebarMode::Manage;
                        }
                    }
                }
            }

            let scene = build_scene(
                &self.filtered.nodes,
                &self.filtered.relationships,
                self.layout.positions(),
                self.layout.selected(),
            );
            let diff = scene.diff(&self.scene);
            if !diff.is_empty() {
                log::trace!("scene: +{} -{} ~{}", diff.added.len(), diff.removed.len(), diff.changed.len());
                self.scene = scene;
            }
            painter.rect_filled(rect, 0.0, Color32::from_rgb(0xf8, 0xfa, 0xfc));
            self.scene.paint(&painter, origin);

            if self.filtered.nodes.is_empty() {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    if self.is_busy() { "Loading..." } else { "No nodes to display" },
                    egui::FontId::proportional(16.0),
                    Color32::GRAY,
                );
            }
        });
    }

    fn notice_overlay(&mut self, ctx: &egui::Context) {
        let expired = self.notice.as_ref().is_some_and(|n| n.at.elapsed() > NOTICE_TTL);
        if expired {
            self.notice = None;
        }
        let Some(notice) = &self.notice else {
            return;
        };
        let margin = Vec2::new(12.0, 12.0);
        egui::Area::new(egui::Id::new("notice"))
            .anchor(egui::Align2::RIGHT_BOTTOM, -margin)
            .show(ctx, |ui| {
                let fill = if notice.is_error { Color32::from_rgb(0xb9, 0x1c, 0x1c) } else { Color32::from_rgb(0x0f, 0x76, 0x6e) };
                egui::Frame::new().fill(fill).corner_radius(8.0).inner_margin(8.0).show(ui, |ui| {
                    ui.colored_label(Color32::WHITE, &notice.text);
                });
            });
        ctx.request_repaint_after(Duration::from_millis(500));
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_completions();
        self.refresh_filtered();
        let now = Instant::now();
        self.search.tick(self.store.nodes(), self.store.relationships(), now);
        if let Some(left) = self.search.debouncer().remaining(now) {
            ctx.request_repaint_after(left);
        }

        self.top_bar(ctx);
        self.sidebar(ctx);
        // Actions in the panels may have changed the cache
        self.refresh_filtered();
        self.canvas(ctx);
        self.notice_overlay(ctx);
    }
}
