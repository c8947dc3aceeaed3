use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ron::ser::PrettyConfig;
use time::macros::format_description;
use time::OffsetDateTime;

use super::seed;
use super::settings::AppSettings;
use crate::graph_utils::graph::GraphDatabase;
use crate::graph_utils::model::GraphSnapshot;
use crate::graph_utils::shared::SharedGraph;

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("ron.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

pub fn save_graph(path: &Path, snapshot: &GraphSnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let pretty = PrettyConfig::new().separate_tuple_members(true);
    let s = ron::ser::to_string_pretty(snapshot, pretty)?;
    atomic_write(path, s.as_bytes())?;
    Ok(())
}

/// Copy of the current snapshot next to `path`, stamped with the UTC time.
pub fn save_versioned(path: &Path, snapshot: &GraphSnapshot) -> anyhow::Result<PathBuf> {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("graph");
    let versioned = path.with_file_name(format!("{}_{}.ron", stem, stamp));
    save_graph(&versioned, snapshot)?;
    Ok(versioned)
}

pub fn load_graph(path: &Path) -> anyhow::Result<Option<GraphSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let snapshot: GraphSnapshot = ron::from_str(&buf)?;
    Ok(Some(snapshot))
}

/// Load the database at `path`, falling back to an empty one when nothing was saved yet.
pub fn load_database(path: &Path) -> anyhow::Result<GraphDatabase> {
    match load_graph(path)? {
        Some(snapshot) => Ok(GraphDatabase::from_snapshot(snapshot)?),
        None => Ok(GraphDatabase::new()),
    }
}

/// Open the backend graph described by `settings`: load the snapshot, seed an empty graph
/// when asked to, and autosave after every write when enabled.
pub fn open_shared_graph(settings: &AppSettings) -> anyhow::Result<SharedGraph> {
    let path = settings.graph_path();
    let mut db = load_database(&path)?;
    log::info!("graph loaded from {}: {} nodes, {} relationships", path.display(), db.node_count(), db.relationship_count());
    if db.node_count() == 0 && settings.seed_when_empty {
        seed::seed_sample_data(&mut db)?;
        if settings.autosave {
            save_graph(&path, &db.snapshot())?;
        }
    }
    Ok(if settings.autosave { SharedGraph::with_autosave(db, path) } else { SharedGraph::new(db) })
}
