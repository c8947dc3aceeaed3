use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::graph_utils::model::{Node, NodeId, Properties, Relationship};

fn props_json(props: &Properties) -> String {
    serde_json::to_string(props).unwrap_or_else(|_| "{}".into())
}

// Export a set of nodes (e.g. the current search hits or filter)
pub fn export_nodes_json(nodes: &[Node], path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
    let mut f = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut f, nodes)?;
    // ensure newline at end
    f.write_all(b"\n")?;
    Ok(())
}

pub fn export_nodes_csv(nodes: &[Node], path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
    let mut wtr = csv::Writer::from_path(path)?;
    // headers: id,name,type,properties_json
    wtr.write_record(["id", "name", "type", "properties_json"])?;
    for n in nodes {
        wtr.write_record([n.id.to_string(), n.name.clone(), n.kind.to_string(), props_json(&n.properties)])?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct RelRef<'a> {
    rel_id: &'a uuid::Uuid,
    #[serde(rename = "type")]
    kind: &'a str,
    peer: &'a NodeId,
}

#[derive(Serialize)]
struct NodeOut<'a> {
    #[serde(flatten)]
    node: &'a Node,
    out_rels: Vec<RelRef<'a>>,
    in_rels: Vec<RelRef<'a>>,
}

#[derive(Serialize)]
struct GraphOut<'a> {
    nodes: Vec<NodeOut<'a>>,
    relationships: &'a [Relationship],
}

fn node_refs<'a>(node: &'a Node, relationships: &'a [Relationship]) -> (Vec<RelRef<'a>>, Vec<RelRef<'a>>) {
    let mut out_rels = Vec::new();
    let mut in_rels = Vec::new();
    for rel in relationships {
        if rel.source == node.id {
            out_rels.push(RelRef { rel_id: &rel.id, kind: &rel.kind, peer: &rel.target });
        }
        if rel.target == node.id {
            in_rels.push(RelRef { rel_id: &rel.id, kind: &rel.kind, peer: &rel.source });
        }
    }
    (out_rels, in_rels)
}

/// Whole graph as one JSON document; every node lists its outgoing and incoming relationships.
pub fn export_graph_json(nodes: &[Node], relationships: &[Relationship], path: &Path) -> anyhow::Result<()> {
    let node_outs = nodes
        .iter()
        .map(|node| {
            let (out_rels, in_rels) = node_refs(node, relationships);
            NodeOut { node, out_rels, in_rels }
        })
        .collect();
    if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
    let mut f = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut f, &GraphOut { nodes: node_outs, relationships })?;
    f.write_all(b"\n")?;
    Ok(())
}

/// Writes `<stem>_nodes.csv` and `<stem>_relationships.csv` next to `base_path`.
pub fn export_graph_csv(nodes: &[Node], relationships: &[Relationship], base_path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let parent = base_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("graph");
    let nodes_path = parent.join(format!("{}_nodes.csv", stem));
    let rels_path = parent.join(format!("{}_relationships.csv", stem));
    {
        let mut wtr = csv::Writer::from_path(&nodes_path)?;
        wtr.write_record(["id", "name", "type", "properties_json", "out_rels_json", "in_rels_json"])?;
        for n in nodes {
            let (out_refs, in_refs) = node_refs(n, relationships);
            let out_json = serde_json::to_string(&out_refs).unwrap_or_else(|_| "[]".into());
            let in_json = serde_json::to_string(&in_refs).unwrap_or_else(|_| "[]".into());
            wtr.write_record([n.id.to_string(), n.name.clone(), n.kind.to_string(), props_json(&n.properties), out_json, in_json])?;
        }
        wtr.flush()?;
    }
    {
        let mut wtr = csv::Writer::from_path(&rels_path)?;
        wtr.write_record(["id", "source", "target", "type", "properties_json"])?;
        for r in relationships {
            wtr.write_record([r.id.to_string(), r.source.to_string(), r.target.to_string(), r.kind.clone(), props_json(&r.properties)])?;
        }
        wtr.flush()?;
    }
    Ok((nodes_path, rels_path))
}
