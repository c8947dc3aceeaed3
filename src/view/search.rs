//! Linear-scan search over the cached graph.
//!
//! Two paths exist on purpose. Live search scores substring matches and keeps the best
//! [`LIVE_RESULT_CAP`] hits for the typing popover. Advanced search applies exact
//! filters and returns every hit unscored (relevance fixed at 100).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use time::macros::format_description;
use time::Date;

use crate::graph_utils::model::{Node, NodeId, Relationship};

pub const LIVE_RESULT_CAP: usize = 2;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const ADVANCED_RELEVANCE: u32 = 100;
pub const DATE_PROPERTIES: [&str; 3] = ["startDate", "founded", "endDate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Node,
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchItem {
    Node(Node),
    Relationship {
        relationship: Relationship,
        source: Option<Node>,
        target: Option<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub kind: ResultKind,
    pub item: SearchItem,
    pub matched_fields: Vec<String>,
    pub relevance: u32,
}

impl SearchResult {
    pub fn node_id(&self) -> Option<NodeId> {
        match &self.item {
            SearchItem::Node(n) => Some(n.id),
            SearchItem::Relationship { .. } => None,
        }
    }

    pub fn title(&self) -> String {
        match &self.item {
            SearchItem::Node(n) => n.name.clone(),
            SearchItem::Relationship { relationship, source, target } => format!(
                "{} -[{}]-> {}",
                source.as_ref().map(|n| n.name.as_str()).unwrap_or("?"),
                relationship.kind,
                target.as_ref().map(|n| n.name.as_str()).unwrap_or("?"),
            ),
        }
    }
}

fn relevance(name: Option<&str>, kind: &str, query: &str, matched: usize) -> u32 {
    let mut score = 0;
    if let Some(name) = name.map(str::to_lowercase) {
        if name == query {
            score += 100;
        } else if name.starts_with(query) {
            score += 50;
        } else if name.contains(query) {
            score += 25;
        }
    }
    let kind = kind.to_lowercase();
    if kind == query {
        score += 75;
    } else if kind.contains(query) {
        score += 15;
    }
    score + 10 * matched as u32
}

fn index_nodes(nodes: &[Node]) -> HashMap<NodeId, &Node> {
    nodes.iter().map(|n| (n.id, n)).collect()
}

/// Every substring match, best first. Ties keep scan order: nodes, then relationships.
pub fn scored_search(nodes: &[Node], relationships: &[Relationship], query: &str) -> Vec<SearchResult> {
    // Only the blank check trims; surrounding spaces are part of the term
    if query.trim().is_empty() {
        return Vec::new();
    }
    let q = query.to_lowercase();
    let mut results = Vec::new();

    for node in nodes {
        let mut fields = Vec::new();
        if node.name.to_lowercase().contains(&q) {
            fields.push("name".to_string());
        }
        if node.kind.as_str().to_lowercase().contains(&q) {
            fields.push("type".to_string());
        }
        for (key, value) in &node.properties {
            if value.to_string().to_lowercase().contains(&q) {
                fields.push(key.clone());
            }
        }
        if !fields.is_empty() {
            let score = relevance(Some(node.name.as_str()), node.kind.as_str(), &q, fields.len());
            results.push(SearchResult {
                kind: ResultKind::Node,
                item: SearchItem::Node(node.clone()),
                matched_fields: fields,
                relevance: score,
            });
        }
    }

    let by_id = index_nodes(nodes);
    for rel in relationships {
        let source = by_id.get(&rel.source).copied();
        let target = by_id.get(&rel.target).copied();
        let mut fields = Vec::new();
        if rel.kind.to_lowercase().contains(&q) {
            fields.push("type".to_string());
        }
        if source.is_some_and(|n| n.name.to_lowercase().contains(&q)) {
            fields.push("source".to_string());
        }
        if target.is_some_and(|n| n.name.to_lowercase().contains(&q)) {
            fields.push("target".to_string());
        }
        if !fields.is_empty() {
            // Relationships have no name of their own
            let score = relevance(None, &rel.kind, &q, fields.len());
            results.push(SearchResult {
                kind: ResultKind::Relationship,
                item: SearchItem::Relationship {
                    relationship: rel.clone(),
                    source: source.cloned(),
                    target: target.cloned(),
                },
                matched_fields: fields,
                relevance: score,
            });
        }
    }

    results.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    results
}

/// Popover results: the [`LIVE_RESULT_CAP`] best matches.
pub fn live_search(nodes: &[Node], relationships: &[Relationship], query: &str) -> Vec<SearchResult> {
    let mut results = scored_search(nodes, relationships, query);
    results.truncate(LIVE_RESULT_CAP);
    results
}

/// Parse `YYYY-MM-DD` (anything after the date, such as a time part, is ignored) or a bare `YYYY`.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        return Date::from_ordinal_date(raw.parse().ok()?, 1).ok();
    }
    let head = raw.get(..10)?;
    Date::parse(head, format_description!("[year]-[month]-[day]")).ok()
}

/// Inclusive date bounds; an open end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedFilter {
    pub node_type: Option<String>,
    pub property_key: Option<String>,
    pub property_value: Option<String>,
    pub date_range: DateRange,
    pub relationship_type: Option<String>,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl AdvancedFilter {
    fn property_criterion(&self) -> Option<(&str, &str)> {
        Some((non_blank(&self.property_key)?, non_blank(&self.property_value)?))
    }

    pub fn has_node_criteria(&self) -> bool {
        non_blank(&self.node_type).is_some() || self.property_criterion().is_some() || self.date_range.is_active()
    }

    pub fn has_relationship_criteria(&self) -> bool {
        non_blank(&self.relationship_type).is_some()
    }

    pub fn matches_node(&self, node: &Node) -> bool {
        if let Some(kind) = non_blank(&self.node_type)
            && node.kind.as_str() != kind
        {
            return false;
        }
        if let Some((key, value)) = self.property_criterion()
            && node.properties.get(key).is_none_or(|v| v.to_string() != value)
        {
            return false;
        }
        if self.date_range.is_active() {
            return DATE_PROPERTIES
                .iter()
                .filter_map(|k| node.properties.get(*k))
                .filter_map(|v| parse_date(&v.to_string()))
                .any(|d| self.date_range.contains(d));
        }
        true
    }

    pub fn matches_relationship(&self, rel: &Relationship) -> bool {
        non_blank(&self.relationship_type).is_none_or(|kind| rel.kind == kind)
    }
}

/// Unscored, uncapped filter results in collection order.
pub fn advanced_search(nodes: &[Node], relationships: &[Relationship], filter: &AdvancedFilter) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let matched = || vec!["advanced_filter".to_string()];

    if filter.has_node_criteria() || !filter.has_relationship_criteria() {
        results.extend(nodes.iter().filter(|n| filter.matches_node(n)).map(|n| SearchResult {
            kind: ResultKind::Node,
            item: SearchItem::Node(n.clone()),
            matched_fields: matched(),
            relevance: ADVANCED_RELEVANCE,
        }));
    }
    if filter.has_relationship_criteria() || !filter.has_node_criteria() {
        let by_id = index_nodes(nodes);
        results.extend(relationships.iter().filter(|r| filter.matches_relationship(r)).map(|r| SearchResult {
            kind: ResultKind::Relationship,
            item: SearchItem::Relationship {
                relationship: r.clone(),
                source: by_id.get(&r.source).map(|n| (*n).clone()),
                target: by_id.get(&r.target).map(|n| (*n).clone()),
            },
            matched_fields: matched(),
            relevance: ADVANCED_RELEVANCE,
        }));
    }
    results
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceEvent {
    Idle,
    Pending,
    Clear,
    Fire(String),
}

/// Runs a query once the input has been quiet for `delay`. Blank input clears at once.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration { self.delay }
    pub fn is_pending(&self) -> bool { self.pending.is_some() }

    pub fn input(&mut self, query: &str, now: Instant) -> DebounceEvent {
        if query.trim().is_empty() {
            self.pending = None;
            return DebounceEvent::Clear;
        }
        self.pending = Some((query.to_string(), now));
        DebounceEvent::Pending
    }

    pub fn poll(&mut self, now: Instant) -> DebounceEvent {
        let ready = match &self.pending {
            None => return DebounceEvent::Idle,
            Some((_, at)) => now.duration_since(*at) >= self.delay,
        };
        if !ready {
            return DebounceEvent::Pending;
        }
        match self.pending.take() {
            Some((query, _)) => DebounceEvent::Fire(query),
            None => DebounceEvent::Idle,
        }
    }

    /// Time left before the pending query fires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref().map(|(_, at)| self.delay.saturating_sub(now.duration_since(*at)))
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Search box state: current text, debouncer and the last popover results.
#[derive(Debug, Clone, Default)]
pub struct LiveSearch {
    query: String,
    debouncer: SearchDebouncer,
    results: Vec<SearchResult>,
}

impl LiveSearch {
    pub fn new(delay: Duration) -> Self {
        Self { query: String::new(), debouncer: SearchDebouncer::new(delay), results: Vec::new() }
    }

    pub fn query(&self) -> &str { &self.query }
    pub fn results(&self) -> &[SearchResult] { &self.results }
    pub fn is_searching(&self) -> bool { self.debouncer.is_pending() }
    pub fn debouncer(&self) -> &SearchDebouncer { &self.debouncer }

    pub fn set_query(&mut self, query: &str, now: Instant) {
        if query == self.query {
            return;
        }
        self.query = query.to_string();
        if self.debouncer.input(query, now) == DebounceEvent::Clear {
            self.results.clear();
        }
    }

    /// Re-arm the pending scan, e.g. after the underlying data changed.
    pub fn invalidate(&mut self, now: Instant) {
        if self.debouncer.input(&self.query, now) == DebounceEvent::Clear {
            self.results.clear();
        }
    }

    /// Returns true when a scan ran.
    pub fn tick(&mut self, nodes: &[Node], relationships: &[Relationship], now: Instant) -> bool {
        match self.debouncer.poll(now) {
            DebounceEvent::Fire(query) => {
                self.results = live_search(nodes, relationships, &query);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.debouncer.input("", Instant::now());
        self.results.clear();
    }
}
