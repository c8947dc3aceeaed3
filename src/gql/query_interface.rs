use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::graph_utils::graph::{GraphDatabase, UNNAMED};
use crate::graph_utils::model::{Node, NodeId, NodeKind, Properties, Relationship, Scalar};
use crate::graph_utils::normalize::normalize_value;

pub type Params = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryResultRow {
    Node(Node),
    Relationship(Relationship),
    Info { message: String },
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct QueryOutcome {
    pub rows: Vec<QueryResultRow>,
    pub affected_nodes: usize,
    pub affected_relationships: usize,
    pub mutated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResult {
    pub query: String,
    pub success: bool,
    pub result: Vec<serde_json::Value>,
    pub affected_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementError {
    pub query: String,
    pub error: String,
    /// 1-based position of the statement in the submitted text.
    pub query_index: usize,
}

/// Report for a multi-statement submission. `success` only when no statement failed.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub success: bool,
    pub total_queries: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub results: Vec<StatementResult>,
    pub errors: Vec<StatementError>,
    pub message: String,
    #[serde(default)]
    pub mutated: bool,
}

type StatementOutcome = (Vec<QueryResultRow>, usize, usize, bool);

/// Split on `sep` outside of single/double quoted text.
fn split_outside_quotes(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0usize;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                } else if ch == sep {
                    parts.push(&s[start..i]);
                    start = i + ch.len_utf8();
                }
            }
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Non-empty, trimmed statements of a `;`-separated submission.
pub fn split_statements(text: &str) -> Vec<&str> {
    split_outside_quotes(text, ';')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn execute_query(db: &mut GraphDatabase, query: &str) -> Result<QueryOutcome> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("empty query"));
    }

    // We allow multiple statements separated by semicolons; execute sequentially
    let mut outcome = QueryOutcome::default();
    let mut any_mut = false;
    for stmt in split_statements(trimmed) {
        let (rows, n_cnt, r_cnt, mutated) = execute_statement(db, stmt)?;
        outcome.rows.extend(rows);
        outcome.affected_nodes += n_cnt;
        outcome.affected_relationships += r_cnt;
        any_mut = any_mut || mutated;
    }
    outcome.mutated = any_mut;
    Ok(outcome)
}

pub fn execute_with_params(db: &mut GraphDatabase, query: &str, params: &Params) -> Result<QueryOutcome> {
    let bound = bind_params(query, params)?;
    execute_query(db, &bound)
}

/// Run every statement independently, collecting successes and failures.
pub fn execute_batch(db: &mut GraphDatabase, queries: &str) -> Result<BatchReport> {
    let statements = split_statements(queries);
    if statements.is_empty() {
        return Err(anyhow!("No valid queries found"));
    }

    let mut results = Vec::new();
    let mut errors = Vec::new();
    let mut mutated = false;
    for (i, stmt) in statements.iter().enumerate() {
        match execute_statement(db, stmt) {
            Ok((rows, n_cnt, r_cnt, stmt_mut)) => {
                let affected_rows = if stmt_mut { n_cnt + r_cnt } else { rows.len() };
                let result = rows
                    .iter()
                    .map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null))
                    .collect();
                mutated = mutated || stmt_mut;
                results.push(StatementResult { query: stmt.to_string(), success: true, result, affected_rows });
            }
            Err(e) => {
                log::warn!("statement {} failed: {}", i + 1, e);
                errors.push(StatementError { query: stmt.to_string(), error: e.to_string(), query_index: i + 1 });
            }
        }
    }

    let total = statements.len();
    let message = if errors.is_empty() {
        format!("All {} queries executed successfully", total)
    } else {
        format!("{} of {} queries executed successfully", results.len(), total)
    };
    Ok(BatchReport {
        success: errors.is_empty(),
        total_queries: total,
        successful_queries: results.len(),
        failed_queries: errors.len(),
        results,
        errors,
        message,
        mutated,
    })
}

fn execute_statement(db: &mut GraphDatabase, stmt: &str) -> Result<StatementOutcome> {
    let upper = stmt.to_ascii_uppercase();
    if upper.starts_with("CREATE NODE ") {
        exec_create_node(db, &stmt[12..])
    } else if upper.starts_with("CREATE REL ") {
        exec_create_rel(db, &stmt[11..])
    } else if upper.starts_with("MATCH NODE ") {
        exec_match_node(db, &stmt[11..])
    } else if upper.starts_with("MATCH REL ") {
        exec_match_rel(db, &stmt[10..])
    } else if upper.starts_with("SET NODE ") {
        exec_set_node(db, &stmt[9..])
    } else if upper.starts_with("DELETE NODE ") {
        exec_delete_node(db, &stmt[12..]).map(|cnt| (Vec::new(), cnt, 0, cnt > 0))
    } else if upper.starts_with("DELETE REL ") {
        exec_delete_rel(db, &stmt[11..]).map(|cnt| (Vec::new(), 0, cnt, cnt > 0))
    } else {
        Err(anyhow!("unrecognized statement: {}", stmt))
    }
}

/// Replace `$name` tokens outside quoted text with the bound parameter rendered as a literal.
pub fn bind_params(query: &str, params: &Params) -> Result<String> {
    let mut out = String::with_capacity(query.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = query.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
            out.push(ch);
            continue;
        }
        let starts_ident = matches!(chars.peek(), Some((_, c)) if c.is_ascii_alphabetic() || *c == '_');
        if ch != '$' || !starts_ident {
            out.push(ch);
            continue;
        }
        let mut name = String::new();
        while let Some((_, c)) = chars.peek() {
            if c.is_ascii_alphanumeric() || *c == '_' {
                name.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        let value = params.get(&name).ok_or_else(|| anyhow!("missing parameter ${}", name))?;
        out.push_str(&render_literal(&normalize_value(value)));
    }
    Ok(out)
}

fn render_literal(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_text(s),
        other => quote_text(&other.to_string()),
    }
}

fn quote_text(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

// Split on a top-level WHERE (case-insensitive). Returns (head, where_clause)
fn split_where(rest: &str) -> (String, Option<String>) {
    // naive approach: find " WHERE " (case-insensitive). Also support trailing where without spaces around
    let upper = rest.to_ascii_uppercase();
    if let Some(idx) = upper.find(" WHERE ") {
        let head = rest[..idx].trim().to_string();
        let tail = rest[idx + 7..].trim().to_string();
        (head, if tail.is_empty() { None } else { Some(tail) })
    } else if let Some(idx) = upper.find(" WHERE") {
        let head = rest[..idx].trim().to_string();
        let tail = rest[idx + 6..].trim().to_string();
        (head, if tail.is_empty() { None } else { Some(tail) })
    } else {
        (rest.trim().to_string(), None)
    }
}

/// Parse a literal value: quoted text, booleans, null, integers, floats; bare words are text.
pub fn parse_literal(raw: &str) -> Scalar {
    let t = raw.trim();
    if t.len() >= 2
        && ((t.starts_with('"') && t.ends_with('"')) || (t.starts_with('\'') && t.ends_with('\'')))
    {
        return Scalar::Text(unescape(&t[1..t.len() - 1]));
    }
    if t.eq_ignore_ascii_case("true") {
        return Scalar::Bool(true);
    }
    if t.eq_ignore_ascii_case("false") {
        return Scalar::Bool(false);
    }
    if t.eq_ignore_ascii_case("null") {
        return Scalar::Null;
    }
    if let Ok(i) = t.parse::<i64>() {
        return Scalar::Int(i);
    }
    if let Ok(f) = t.parse::<f64>()
        && f.is_finite()
    {
        return Scalar::Float(f);
    }
    Scalar::Text(t.to_string())
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_label_and_props(rest: &str) -> Result<(String, Properties)> {
    // Expect: Label {k:"v", a:"b"} or just Label
    let mut label = rest.trim().to_string();
    let mut props = Properties::new();
    if let Some(idx) = rest.find('{') {
        label = rest[..idx].trim().to_string();
        props = parse_keyvals(brace_body(rest, idx)?)?;
    }
    if label.is_empty() { return Err(anyhow!("missing label")); }
    Ok((label, props))
}

/// Text between the `{` at `open` and the last `}` after it.
fn brace_body(s: &str, open: usize) -> Result<&str> {
    let after = &s[open + 1..];
    let end = after.rfind('}').ok_or_else(|| anyhow!("unclosed property block"))?;
    Ok(&after[..end])
}

fn parse_keyvals(s: &str) -> Result<Properties> {
    let mut map = Properties::new();
    for part in split_outside_quotes(s, ',') {
        let p = part.trim();
        if p.is_empty() { continue; }
        let mut kv = p.splitn(2, ':');
        let k = kv.next().ok_or_else(|| anyhow!("missing key"))?.trim();
        let v = kv.next().ok_or_else(|| anyhow!("missing value for {}", k))?;
        let k = k.trim_matches('"').trim_matches('\'');
        if k.is_empty() { return Err(anyhow!("empty property key")); }
        if map.insert(k.to_string(), parse_literal(v)).is_some() {
            return Err(anyhow!("duplicate property key: {}", k));
        }
    }
    Ok(map)
}

#[derive(Debug, Clone)]
enum WhereCond {
    // Nodes and Relationships
    IdEquals(Uuid),
    TypeEquals(String),
    HasKey(String),
    PropEq(String, Scalar),
    PropNe(String, Scalar),
    // Nodes only
    NameEquals(String),
    // Relationships only
    FromEquals(Uuid),
    ToEquals(Uuid),
}

fn parse_where_conds(s: &str) -> Result<Vec<WhereCond>> {
    // Conditions are separated by AND (case-insensitive), outside quoted text
    let mut out = Vec::new();
    let mut conds: Vec<&str> = Vec::new();
    let mut start = 0usize;
    let mut quote: Option<char> = None;
    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let ch = bytes[i] as char;
        if let Some(q) = quote {
            if ch == q { quote = None; }
            i += 1;
            continue;
        }
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
            i += 1;
            continue;
        }
        if i + 3 <= bytes.len() && s.is_char_boundary(i) && s.is_char_boundary(i + 3) && s[i..i + 3].eq_ignore_ascii_case("AND") {
            // word boundary: previous and next must be whitespace or parenthesis
            let prev_ok = i == 0 || s[..i].chars().last().map(|c| c.is_whitespace() || c == ')').unwrap_or(true);
            let next_ok = i + 3 >= s.len() || s[i + 3..].chars().next().map(|c| c.is_whitespace() || c == '(').unwrap_or(true);
            if prev_ok && next_ok {
                conds.push(s[start..i].trim());
                i += 3;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    conds.push(s[start..].trim());

    for c in conds.into_iter().filter(|c| !c.is_empty()) {
        let cu = c.to_ascii_uppercase();
        if cu.starts_with("HAS(") && c.ends_with(')') {
            let key = c[4..c.len() - 1].trim().trim_matches('"').trim_matches('\'');
            if key.is_empty() { return Err(anyhow!("WHERE has() requires a key")); }
            out.push(WhereCond::HasKey(key.to_string()));
            continue;
        }
        // inequality key!="v"
        if let Some(pos) = c.find("!=") {
            let key = c[..pos].trim();
            if key.is_empty() { return Err(anyhow!("missing key before !=")); }
            if ["id", "name", "type", "label", "from", "to"].iter().any(|k| key.eq_ignore_ascii_case(k)) {
                return Err(anyhow!("'!=' supported only for property keys"));
            }
            out.push(WhereCond::PropNe(key.to_string(), parse_literal(&c[pos + 2..])));
            continue;
        }
        // equality key="v" or id=uuid or type=Type or from/to=uuid
        if let Some(pos) = c.find('=') {
            let key = c[..pos].trim();
            let val_raw = c[pos + 1..].trim();
            let unquoted = val_raw.trim_matches('"').trim_matches('\'');
            if key.is_empty() { return Err(anyhow!("missing key before =")); }
            let cond = if key.eq_ignore_ascii_case("id") {
                WhereCond::IdEquals(parse_uuid_from(unquoted)?)
            } else if key.eq_ignore_ascii_case("from") {
                WhereCond::FromEquals(parse_uuid_from(unquoted)?)
            } else if key.eq_ignore_ascii_case("to") {
                WhereCond::ToEquals(parse_uuid_from(unquoted)?)
            } else if key.eq_ignore_ascii_case("type") || key.eq_ignore_ascii_case("label") {
                WhereCond::TypeEquals(unquoted.to_string())
            } else if key.eq_ignore_ascii_case("name") {
                WhereCond::NameEquals(unquoted.to_string())
            } else {
                WhereCond::PropEq(key.to_string(), parse_literal(val_raw))
            };
            out.push(cond);
            continue;
        }
        return Err(anyhow!("unrecognized WHERE condition: {}", c));
    }
    Ok(out)
}

// Property comparison is on display form, so 5 and "5" compare equal.
fn prop_matches(props: &Properties, key: &str, expected: &Scalar) -> bool {
    props.get(key).map(|v| v.to_string() == expected.to_string()).unwrap_or(false)
}

fn node_matches(n: &Node, props: &Properties, conds: &[WhereCond]) -> bool {
    if !props.iter().all(|(k, v)| prop_matches(&n.properties, k, v)) {
        return false;
    }
    conds.iter().all(|c| match c {
        WhereCond::IdEquals(u) => n.id == *u,
        WhereCond::TypeEquals(t) => n.kind.as_str() == t,
        WhereCond::HasKey(k) => n.properties.contains_key(k),
        WhereCond::PropEq(k, v) => prop_matches(&n.properties, k, v),
        WhereCond::PropNe(k, v) => !prop_matches(&n.properties, k, v),
        WhereCond::NameEquals(name) => n.name == *name,
        // Relationship-only filters never match nodes
        WhereCond::FromEquals(_) | WhereCond::ToEquals(_) => false,
    })
}

fn rel_matches(r: &Relationship, props: &Properties, conds: &[WhereCond]) -> bool {
    if !props.iter().all(|(k, v)| prop_matches(&r.properties, k, v)) {
        return false;
    }
    conds.iter().all(|c| match c {
        WhereCond::IdEquals(u) => r.id == *u,
        WhereCond::TypeEquals(t) => r.kind == *t,
        WhereCond::HasKey(k) => r.properties.contains_key(k),
        WhereCond::PropEq(k, v) => prop_matches(&r.properties, k, v),
        WhereCond::PropNe(k, v) => !prop_matches(&r.properties, k, v),
        WhereCond::FromEquals(u) => r.source == *u,
        WhereCond::ToEquals(u) => r.target == *u,
        WhereCond::NameEquals(_) => false,
    })
}

fn wildcard(label: &str) -> Option<&str> {
    if label == "*" { None } else { Some(label) }
}

fn exec_create_node(db: &mut GraphDatabase, rest: &str) -> Result<StatementOutcome> {
    // rest: Type {name:"Acme", k:"v", ...}
    let (label, mut props) = parse_label_and_props(rest)?;
    let name = props.remove("name").map(|v| v.to_string()).unwrap_or_else(|| UNNAMED.to_string());
    let id = db.add_node(name, NodeKind::parse(&label), props)?;
    let rows = db.get_node(id).cloned().map(QueryResultRow::Node).into_iter().collect();
    Ok((rows, 1, 0, true))
}

fn exec_create_rel(db: &mut GraphDatabase, rest: &str) -> Result<StatementOutcome> {
    // rest: from=<uuid> to=<uuid> type=TYPE {k:"v", ...}
    let mut from: Option<Uuid> = None;
    let mut to: Option<Uuid> = None;
    let mut kind: Option<String> = None;
    let mut props = Properties::new();

    // Split on spaces but keep brace content for props
    let mut cursor = rest.trim();
    if let Some(brace_idx) = cursor.find('{') {
        props = parse_keyvals(brace_body(cursor, brace_idx)?)?;
        cursor = &cursor[..brace_idx];
    }
    for token in cursor.split_whitespace() {
        let up = token.to_ascii_uppercase();
        if up.starts_with("FROM=") { from = Some(parse_uuid_from(&token[5..])?); }
        else if up.starts_with("TO=") { to = Some(parse_uuid_from(&token[3..])?); }
        else if up.starts_with("TYPE=") { kind = Some(token[5..].to_string()); }
        else if up.starts_with("LABEL=") { kind = Some(token[6..].to_string()); }
        else { return Err(anyhow!("unexpected token in CREATE REL: {}", token)); }
    }
    let from = from.ok_or_else(|| anyhow!("missing from uuid"))?;
    let to = to.ok_or_else(|| anyhow!("missing to uuid"))?;
    let kind = kind.ok_or_else(|| anyhow!("missing type"))?;
    let id = db.add_relationship(from, to, kind, props)?;
    let rows = db.get_relationship(id).cloned().map(QueryResultRow::Relationship).into_iter().collect();
    Ok((rows, 0, 1, true))
}

fn exec_match_node(db: &GraphDatabase, rest: &str) -> Result<StatementOutcome> {
    // Support optional WHERE after the label/props
    let (head, where_clause) = split_where(rest);
    let (label, props) = parse_label_and_props(&head)?;
    let conds = match where_clause { Some(ws) => parse_where_conds(&ws)?, None => Vec::new() };
    let rows = db
        .find_node_ids_by_kind(wildcard(&label))
        .into_iter()
        .filter_map(|id| db.get_node(id))
        .filter(|n| node_matches(n, &props, &conds))
        .cloned()
        .map(QueryResultRow::Node)
        .collect();
    Ok((rows, 0, 0, false))
}

fn exec_match_rel(db: &GraphDatabase, rest: &str) -> Result<StatementOutcome> {
    let (head, where_clause) = split_where(rest);
    let (label, props) = parse_label_and_props(&head)?;
    let conds = match where_clause { Some(ws) => parse_where_conds(&ws)?, None => Vec::new() };
    let rows = db
        .find_relationship_ids_by_kind(wildcard(&label))
        .into_iter()
        .filter_map(|id| db.get_relationship(id))
        .filter(|r| rel_matches(r, &props, &conds))
        .cloned()
        .map(QueryResultRow::Relationship)
        .collect();
    Ok((rows, 0, 0, false))
}

fn exec_set_node(db: &mut GraphDatabase, rest: &str) -> Result<StatementOutcome> {
    // rest: <uuid> {k:"v", ...}
    let rest = rest.trim();
    let brace = rest.find('{').ok_or_else(|| anyhow!("SET NODE requires a property block"))?;
    let id = parse_uuid_from(&rest[..brace])?;
    let props = parse_keyvals(brace_body(rest, brace)?)?;
    let node = db.merge_node_properties(id, props)?.clone();
    Ok((vec![QueryResultRow::Node(node)], 1, 0, true))
}

fn exec_delete_node(db: &mut GraphDatabase, rest: &str) -> Result<usize> {
    let id = parse_uuid_from(rest)?;
    Ok(if db.remove_node(id) { 1 } else { 0 })
}

fn exec_delete_rel(db: &mut GraphDatabase, rest: &str) -> Result<usize> {
    let id = parse_uuid_from(rest)?;
    Ok(if db.remove_relationship(id) { 1 } else { 0 })
}

fn parse_uuid_from(s: &str) -> Result<NodeId> { Uuid::parse_str(s.trim()).map_err(|e| anyhow!("invalid uuid: {}", e)) }
