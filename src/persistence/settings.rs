use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::view::layout::LayoutMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // API service configuration (actix)
    #[serde(default = "AppSettings::default_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "AppSettings::default_port")]
    pub api_port: u16,
    #[serde(default)]
    pub api_key: Option<String>,
    // If None, server traffic logs go to OS temp dir
    #[serde(default)]
    pub api_log_override: Option<PathBuf>,
    // If None, graph snapshots live in the OS state dir
    #[serde(default)]
    pub data_override: Option<PathBuf>,
    // If None, use OS temporary directory for exports
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    #[serde(default = "AppSettings::default_true")]
    pub autosave: bool,
    // Viewer: where the backend lives. None means the local api endpoint.
    #[serde(default)]
    pub backend_url: Option<String>,
    // Viewer: start an in-process backend on the api endpoint
    #[serde(default = "AppSettings::default_true")]
    pub embedded_api: bool,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default = "AppSettings::default_hub_type")]
    pub hub_type: String,
    #[serde(default = "AppSettings::default_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "AppSettings::default_true")]
    pub seed_when_empty: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_bind_addr: Self::default_bind_addr(),
            api_port: Self::default_port(),
            api_key: None,
            api_log_override: None,
            data_override: None,
            export_override: None,
            autosave: true,
            backend_url: None,
            embedded_api: true,
            layout_mode: LayoutMode::default(),
            hub_type: Self::default_hub_type(),
            search_debounce_ms: Self::default_debounce_ms(),
            seed_when_empty: true,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Graph-Atlas
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Graph-Atlas");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Graph-Atlas
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Graph-Atlas");
            }
            return PathBuf::from("Graph-Atlas");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Graph-Atlas or ~/.config/Graph-Atlas
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Graph-Atlas");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Graph-Atlas");
        }
    }

    fn data_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            return Self::config_dir().join("Data");
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Graph-Atlas\Data else TEMP
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join("Graph-Atlas").join("Data");
            }
            return std::env::temp_dir().join("Graph-Atlas");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_STATE_HOME/graph-atlas or ~/.local/state/graph-atlas, else /tmp/Graph-Atlas
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("graph-atlas");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("graph-atlas");
            }
            return PathBuf::from("/tmp").join("Graph-Atlas");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let json_path = Self::config_dir().join("settings.json");
        if !json_path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(json_path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Directory holding settings.json. Resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    pub fn data_dir(&self) -> PathBuf {
        if let Some(p) = &self.data_override { return p.clone(); }
        Self::data_default_dir()
    }

    pub fn graph_path(&self) -> PathBuf {
        self.data_dir().join("graph.ron")
    }

    /// Default export directory when no override is set: {temp_dir}/Graph-Atlas/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Atlas");
        p.push("exports");
        p
    }

    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub(crate) fn default_bind_addr() -> String { "127.0.0.1".to_string() }
    pub(crate) fn default_port() -> u16 { 8787 }
    fn default_hub_type() -> String { "Company".to_string() }
    fn default_debounce_ms() -> u64 { 300 }
    fn default_true() -> bool { true }

    pub fn api_endpoint(&self) -> String {
        format!("{}:{}", self.api_bind_addr, self.api_port)
    }

    /// Base URL the viewer talks to.
    pub fn backend_base_url(&self) -> String {
        match &self.backend_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.api_endpoint()),
        }
    }

    /// Default API log directory when no override is set: {temp_dir}/Graph-Atlas/api-logs
    pub fn api_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Atlas");
        p.push("api-logs");
        p
    }

    pub fn api_log_dir(&self) -> PathBuf {
        if let Some(p) = &self.api_log_override { return p.clone(); }
        Self::api_log_default_dir()
    }
}
