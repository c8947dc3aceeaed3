use std::time::{Duration, Instant};

use graph_atlas::graph_utils::model::{Node, NodeKind, Properties, Relationship, Scalar};
use graph_atlas::view::search::{
    advanced_search, live_search, parse_date, scored_search, AdvancedFilter, DateRange, DebounceEvent, LiveSearch,
    ResultKind, SearchDebouncer, ADVANCED_RELEVANCE,
};
use time::macros::date;
use uuid::Uuid;

fn node(name: &str, kind: NodeKind, props: &[(&str, &str)]) -> Node {
    let properties: Properties = props.iter().map(|(k, v)| (k.to_string(), Scalar::text(*v))).collect();
    Node { id: Uuid::now_v7(), name: name.to_string(), kind, properties }
}

fn rel(source: &Node, target: &Node, kind: &str) -> Relationship {
    Relationship { id: Uuid::now_v7(), source: source.id, target: target.id, kind: kind.to_string(), properties: Properties::new() }
}

#[test]
fn exact_name_beats_prefix_beats_substring() {
    let nodes = vec![
        node("Beta Acme", NodeKind::Company, &[]),
        node("Acme Corp", NodeKind::Company, &[]),
        node("Acme", NodeKind::Company, &[]),
        node("Zeta", NodeKind::Company, &[]),
    ];
    let results = scored_search(&nodes, &[], "ACME");
    let titles: Vec<String> = results.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Acme", "Acme Corp", "Beta Acme"]);
    assert_eq!(results[0].relevance, 110);
    assert_eq!(results[1].relevance, 60);
    assert_eq!(results[2].relevance, 35);

    let live = live_search(&nodes, &[], "acme");
    assert_eq!(live.len(), 2);
    assert_eq!(live[0].title(), "Acme");
}

#[test]
fn surrounding_spaces_are_part_of_the_term() {
    let nodes = vec![
        node("Beta Acme", NodeKind::Company, &[]),
        node("Acme Corp", NodeKind::Company, &[]),
        node("Acme", NodeKind::Company, &[]),
    ];
    let results = scored_search(&nodes, &[], "acme ");
    let titles: Vec<String> = results.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Acme Corp"]);
    assert_eq!(results[0].relevance, 60, "prefix match on the padded term");

    let results = scored_search(&nodes, &[], " acme");
    let titles: Vec<String> = results.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Beta Acme"]);
}

#[test]
fn blank_query_matches_nothing() {
    let nodes = vec![node("Acme", NodeKind::Company, &[])];
    assert!(scored_search(&nodes, &[], "   ").is_empty());
}

#[test]
fn properties_and_type_contribute_matched_fields() {
    let ada = node("Ada", NodeKind::Employee, &[("department", "Engineering"), ("skills", "Rust, SQL")]);
    let results = scored_search(std::slice::from_ref(&ada), &[], "employee");
    assert_eq!(results[0].matched_fields, vec!["type"]);
    assert_eq!(results[0].relevance, 85);

    let results = scored_search(std::slice::from_ref(&ada), &[], "rust");
    assert_eq!(results[0].matched_fields, vec!["skills"]);
    assert_eq!(results[0].relevance, 10);
}

#[test]
fn relationships_match_on_type_and_endpoint_names() {
    let acme = node("Acme", NodeKind::Company, &[]);
    let ada = node("Ada", NodeKind::Employee, &[]);
    let r = rel(&acme, &ada, "EMPLOYS");
    let nodes = vec![acme.clone(), ada.clone()];

    let results = scored_search(&nodes, std::slice::from_ref(&r), "employs");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, ResultKind::Relationship);
    assert_eq!(results[0].title(), "Acme -[EMPLOYS]-> Ada");
    assert_eq!(results[0].relevance, 85);
    assert_eq!(results[0].node_id(), None);

    let results = scored_search(&nodes, std::slice::from_ref(&r), "ada");
    let rel_hit = results.iter().find(|r| r.kind == ResultKind::Relationship).unwrap();
    assert_eq!(rel_hit.matched_fields, vec!["target"]);
    assert_eq!(results[0].node_id(), Some(ada.id), "the node itself ranks first");
}

#[test]
fn parse_date_accepts_years_and_timestamps() {
    assert_eq!(parse_date("2018"), Some(date!(2018 - 01 - 01)));
    assert_eq!(parse_date("2024-03-01"), Some(date!(2024 - 03 - 01)));
    assert_eq!(parse_date("2024-03-01T10:00:00Z"), Some(date!(2024 - 03 - 01)));
    assert_eq!(parse_date("March"), None);
    assert_eq!(parse_date(""), None);
}

#[test]
fn date_range_is_inclusive_and_open_ended() {
    let range = DateRange { start: Some(date!(2024 - 01 - 01)), end: Some(date!(2024 - 06 - 30)) };
    assert!(range.contains(date!(2024 - 01 - 01)));
    assert!(range.contains(date!(2024 - 06 - 30)));
    assert!(!range.contains(date!(2024 - 07 - 01)));
    let open = DateRange { start: None, end: Some(date!(2020 - 01 - 01)) };
    assert!(open.contains(date!(1990 - 05 - 05)));
    assert!(!DateRange::default().is_active());
}

fn sample() -> (Vec<Node>, Vec<Relationship>) {
    let acme = node("Acme", NodeKind::Company, &[("founded", "2018")]);
    let ada = node("Ada", NodeKind::Employee, &[("department", "Engineering")]);
    let bob = node("Bob", NodeKind::Employee, &[("department", "Design")]);
    let web = node("Web", NodeKind::Project, &[("startDate", "2024-01-15"), ("endDate", "2024-12-31")]);
    let bot = node("Bot", NodeKind::Project, &[("startDate", "2024-03-01"), ("endDate", "2024-08-30")]);
    let rels = vec![rel(&acme, &ada, "EMPLOYS"), rel(&ada, &web, "LEADS"), rel(&bob, &bot, "WORKS_ON")];
    (vec![acme, ada, bob, web, bot], rels)
}

#[test]
fn advanced_node_type_and_property() {
    let (nodes, rels) = sample();
    let filter = AdvancedFilter {
        node_type: Some("Employee".into()),
        property_key: Some("department".into()),
        property_value: Some("Engineering".into()),
        ..Default::default()
    };
    let results = advanced_search(&nodes, &rels, &filter);
    assert_eq!(results.len(), 1, "relationships are skipped when only node criteria are set");
    assert_eq!(results[0].title(), "Ada");
    assert_eq!(results[0].relevance, ADVANCED_RELEVANCE);
    assert_eq!(results[0].matched_fields, vec!["advanced_filter"]);
}

#[test]
fn advanced_date_range_checks_any_date_property() {
    let (nodes, rels) = sample();
    let mut filter = AdvancedFilter::default();
    filter.date_range.start = Some(date!(2024 - 09 - 01));
    let titles: Vec<String> = advanced_search(&nodes, &rels, &filter).iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Web"], "Web ends in December; Bot ends in August");

    filter.date_range = DateRange { start: None, end: Some(date!(2019 - 01 - 01)) };
    let titles: Vec<String> = advanced_search(&nodes, &rels, &filter).iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Acme"], "a bare founding year counts as January 1st");
}

#[test]
fn advanced_relationship_type_only() {
    let (nodes, rels) = sample();
    let filter = AdvancedFilter { relationship_type: Some("LEADS".into()), ..Default::default() };
    let results = advanced_search(&nodes, &rels, &filter);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title(), "Ada -[LEADS]-> Web");
}

#[test]
fn advanced_without_criteria_returns_everything() {
    let (nodes, rels) = sample();
    let results = advanced_search(&nodes, &rels, &AdvancedFilter::default());
    assert_eq!(results.len(), nodes.len() + rels.len());
    assert_eq!(results.iter().filter(|r| r.kind == ResultKind::Node).count(), nodes.len());
}

#[test]
fn debouncer_fires_after_quiet_period() {
    let t0 = Instant::now();
    let delay = Duration::from_millis(300);
    let mut d = SearchDebouncer::new(delay);
    assert_eq!(d.poll(t0), DebounceEvent::Idle);
    assert_eq!(d.input("ac", t0), DebounceEvent::Pending);
    assert_eq!(d.input("acm", t0 + Duration::from_millis(200)), DebounceEvent::Pending);
    // The second keystroke restarted the clock
    assert_eq!(d.poll(t0 + Duration::from_millis(350)), DebounceEvent::Pending);
    assert_eq!(d.remaining(t0 + Duration::from_millis(350)), Some(Duration::from_millis(150)));
    assert_eq!(d.poll(t0 + Duration::from_millis(500)), DebounceEvent::Fire("acm".into()));
    assert_eq!(d.poll(t0 + Duration::from_millis(900)), DebounceEvent::Idle);
    assert_eq!(d.remaining(t0), None);
}

#[test]
fn debouncer_clears_on_blank_input() {
    let t0 = Instant::now();
    let mut d = SearchDebouncer::default();
    d.input("acme", t0);
    assert_eq!(d.input("  ", t0), DebounceEvent::Clear);
    assert!(!d.is_pending());
    assert_eq!(d.poll(t0 + Duration::from_secs(1)), DebounceEvent::Idle);
}

#[test]
fn live_search_runs_once_per_quiet_period() {
    let (nodes, rels) = sample();
    let t0 = Instant::now();
    let mut search = LiveSearch::new(Duration::from_millis(100));
    search.set_query("a", t0);
    assert!(search.is_searching());
    assert!(!search.tick(&nodes, &rels, t0 + Duration::from_millis(50)));
    assert!(search.results().is_empty());
    assert!(search.tick(&nodes, &rels, t0 + Duration::from_millis(150)));
    assert_eq!(search.results().len(), 2, "popover shows at most two hits");
    assert!(!search.is_searching());

    search.set_query("", t0 + Duration::from_millis(200));
    assert!(search.results().is_empty());
    assert!(!search.is_searching());
}
