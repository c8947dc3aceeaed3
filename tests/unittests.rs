use std::collections::HashMap;

use graph_atlas::gql::query_interface::{
    bind_params, execute_batch, execute_query, execute_with_params, parse_literal, split_statements, QueryResultRow,
};
use graph_atlas::graph_utils::error::GraphError;
use graph_atlas::graph_utils::graph::GraphDatabase;
use graph_atlas::graph_utils::model::{NodeKind, Properties, RelationshipPatch, Scalar};
use uuid::Uuid;

fn new_db() -> GraphDatabase {
    GraphDatabase::new()
}

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs.iter().map(|(k, v)| (k.to_string(), Scalar::text(*v))).collect()
}

fn ids_from_rows(rows: &[QueryResultRow]) -> Vec<Uuid> {
    let mut out = Vec::new();
    for r in rows {
        match r {
            QueryResultRow::Node(n) => out.push(n.id),
            QueryResultRow::Relationship(rel) => out.push(rel.id),
            QueryResultRow::Info { .. } => {}
        }
    }
    out
}

#[test]
fn graphdb_add_node_relationship_and_cascade_delete() {
    let mut db = new_db();
    let a = db.add_node("Ada".into(), NodeKind::Employee, Properties::new()).expect("node a");
    let b = db.add_node("Acme".into(), NodeKind::Company, Properties::new()).expect("node b");
    let c = db.add_node("Atlas".into(), NodeKind::Project, Properties::new()).expect("node c");
    let r1 = db.add_relationship(a, b, "WORKS_ON".into(), Properties::new()).expect("rel 1");
    let r2 = db.add_relationship(b, c, "OWNS".into(), Properties::new()).expect("rel 2");

    assert!(db.remove_node(a), "should remove node a");
    assert!(db.get_relationship(r1).is_none(), "relationship touching a must go");
    assert!(db.get_relationship(r2).is_some(), "unrelated relationship stays");
    assert!(!db.remove_node(a), "second delete is a no-op");
}

#[test]
fn graphdb_blank_name_becomes_unnamed() {
    let mut db = new_db();
    let id = db.add_node("   ".into(), NodeKind::Company, Properties::new()).unwrap();
    assert_eq!(db.get_node(id).unwrap().name, "Unnamed");
}

#[test]
fn graphdb_add_relationship_missing_endpoints_fails() {
    let mut db = new_db();
    let a = db.add_node("Ada".into(), NodeKind::Employee, Properties::new()).unwrap();
    let ghost = Uuid::now_v7();
    let err = db.add_relationship(a, ghost, "KNOWS".into(), Properties::new()).unwrap_err();
    assert_eq!(err, GraphError::InvalidEndpoint { from: a, to: ghost });
    assert_eq!(db.relationship_count(), 0);
}

#[test]
fn graphdb_rejects_invalid_tags() {
    let mut db = new_db();
    assert!(matches!(
        db.add_node("x".into(), NodeKind::parse("bad type"), Properties::new()),
        Err(GraphError::Validation(_))
    ));
    let a = db.add_node("a".into(), NodeKind::Employee, Properties::new()).unwrap();
    assert!(matches!(db.add_relationship(a, a, "HAS-DASH".into(), Properties::new()), Err(GraphError::Validation(_))));
}

#[test]
fn graphdb_merge_properties_keeps_name_and_type() {
    let mut db = new_db();
    let id = db.add_node("Ada".into(), NodeKind::Employee, props(&[("role", "Engineer")])).unwrap();
    let node = db.merge_node_properties(id, props(&[("role", "Lead"), ("department", "R&D")])).unwrap();
    assert_eq!(node.name, "Ada");
    assert_eq!(node.kind, NodeKind::Employee);
    assert_eq!(node.properties.get("role"), Some(&Scalar::text("Lead")));
    assert_eq!(node.properties.len(), 2);

    let ghost = Uuid::now_v7();
    assert_eq!(db.merge_node_properties(ghost, Properties::new()).unwrap_err(), GraphError::NodeNotFound(ghost));
}

#[test]
fn graphdb_update_relationship_validates_endpoints() {
    let mut db = new_db();
    let a = db.add_node("a".into(), NodeKind::Employee, Properties::new()).unwrap();
    let b = db.add_node("b".into(), NodeKind::Project, Properties::new()).unwrap();
    let c = db.add_node("c".into(), NodeKind::Project, Properties::new()).unwrap();
    let r = db.add_relationship(a, b, "WORKS_ON".into(), Properties::new()).unwrap();

    let patch = RelationshipPatch { target: Some(c), kind: Some("LEADS".into()), ..Default::default() };
    let rel = db.update_relationship(r, patch).unwrap();
    assert_eq!((rel.source, rel.target, rel.kind.as_str()), (a, c, "LEADS"));

    let bad = RelationshipPatch { source: Some(Uuid::now_v7()), ..Default::default() };
    assert!(matches!(db.update_relationship(r, bad), Err(GraphError::InvalidEndpoint { .. })));
    // Failed update leaves the relationship untouched
    assert_eq!(db.get_relationship(r).unwrap().source, a);
}

#[test]
fn graphdb_snapshot_roundtrip_rejects_duplicates() {
    let mut db = new_db();
    let a = db.add_node("a".into(), NodeKind::Company, Properties::new()).unwrap();
    let b = db.add_node("b".into(), NodeKind::Employee, Properties::new()).unwrap();
    db.add_relationship(b, a, "EMPLOYS".into(), Properties::new()).unwrap();

    let snap = db.snapshot();
    assert_eq!(snap.nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![a, b], "snapshot is in creation order");
    let restored = GraphDatabase::from_snapshot(snap.clone()).unwrap();
    assert_eq!(restored.snapshot(), snap);

    let mut dup = snap;
    let first = dup.nodes[0].clone();
    dup.nodes.push(first);
    assert_eq!(GraphDatabase::from_snapshot(dup).unwrap_err(), GraphError::DuplicateId(a));
}

#[test]
fn gql_create_match_where_delete_node_flow() {
    let mut db = new_db();
    let out = execute_query(&mut db, r#"CREATE NODE Employee {name:"Ada", department:"Engineering", experience:7}"#).unwrap();
    assert!(out.mutated);
    assert_eq!(out.affected_nodes, 1);
    let ada = ids_from_rows(&out.rows)[0];
    let node = db.get_node(ada).unwrap();
    assert_eq!(node.name, "Ada");
    assert!(!node.properties.contains_key("name"), "name lives outside properties");
    assert_eq!(node.properties.get("experience"), Some(&Scalar::Int(7)));

    execute_query(&mut db, r#"CREATE NODE Employee {name:"Bob", department:"Sales"}"#).unwrap();
    execute_query(&mut db, r#"CREATE NODE Company {name:"Acme"}"#).unwrap();

    let out = execute_query(&mut db, r#"MATCH NODE Employee WHERE department="Engineering""#).unwrap();
    assert_eq!(ids_from_rows(&out.rows), vec![ada]);
    assert!(!out.mutated);

    let out = execute_query(&mut db, r#"MATCH NODE * WHERE name="Acme""#).unwrap();
    assert_eq!(out.rows.len(), 1);

    let out = execute_query(&mut db, r#"MATCH NODE Employee WHERE department!="Engineering""#).unwrap();
    assert_eq!(out.rows.len(), 1);

    let out = execute_query(&mut db, "MATCH NODE Employee WHERE experience=\"7\"").unwrap();
    assert_eq!(ids_from_rows(&out.rows), vec![ada], "numbers compare by display form");

    let out = execute_query(&mut db, &format!("DELETE NODE {}", ada)).unwrap();
    assert_eq!(out.affected_nodes, 1);
    let out = execute_query(&mut db, &format!("DELETE NODE {}", ada)).unwrap();
    assert!(!out.mutated, "deleting a missing node changes nothing");
}

#[test]
fn gql_create_rel_match_where_delete_flow() {
    let mut db = new_db();
    let a = db.add_node("Ada".into(), NodeKind::Employee, Properties::new()).unwrap();
    let p = db.add_node("Atlas".into(), NodeKind::Project, Properties::new()).unwrap();
    let c = db.add_node("Acme".into(), NodeKind::Company, Properties::new()).unwrap();

    let out = execute_query(&mut db, &format!(r#"CREATE REL from={} to={} type=WORKS_ON {{role:"dev"}}"#, a, p)).unwrap();
    let r1 = ids_from_rows(&out.rows)[0];
    assert_eq!(out.affected_relationships, 1);
    execute_query(&mut db, &format!("CREATE REL from={} to={} label=OWNS", c, p)).unwrap();

    let out = execute_query(&mut db, &format!("MATCH REL * WHERE to={}", p)).unwrap();
    assert_eq!(out.rows.len(), 2);
    let out = execute_query(&mut db, &format!("MATCH REL WORKS_ON WHERE from={}", a)).unwrap();
    assert_eq!(ids_from_rows(&out.rows), vec![r1]);
    let out = execute_query(&mut db, "MATCH REL * WHERE has(role)").unwrap();
    assert_eq!(ids_from_rows(&out.rows), vec![r1]);

    let out = execute_query(&mut db, &format!("DELETE REL {}", r1)).unwrap();
    assert_eq!(out.affected_relationships, 1);
    assert_eq!(db.relationship_count(), 1);
}

#[test]
fn gql_set_node_merges_properties() {
    let mut db = new_db();
    let id = db.add_node("Ada".into(), NodeKind::Employee, props(&[("role", "Engineer")])).unwrap();
    execute_query(&mut db, &format!(r#"SET NODE {} {{role:"Lead", remote:true}}"#, id)).unwrap();
    let node = db.get_node(id).unwrap();
    assert_eq!(node.properties.get("role"), Some(&Scalar::text("Lead")));
    assert_eq!(node.properties.get("remote"), Some(&Scalar::Bool(true)));
}

#[test]
fn gql_errors_and_edge_cases() {
    let mut db = new_db();
    assert!(execute_query(&mut db, "   ").is_err());
    assert!(execute_query(&mut db, "DROP EVERYTHING").is_err());
    assert!(execute_query(&mut db, "CREATE NODE Employee {name:\"a\", name:\"b\"}").is_err(), "duplicate key");
    assert!(execute_query(&mut db, "CREATE NODE Employee {name:\"a\"").is_err(), "unclosed block");
    assert!(execute_query(&mut db, "CREATE REL from=nope to=nope type=X").is_err());
    assert!(execute_query(&mut db, "MATCH NODE * WHERE name!=\"x\"").is_err(), "!= only on property keys");
    assert!(execute_query(&mut db, &format!("SET NODE {} {{a:1}}", Uuid::now_v7())).is_err());
}

#[test]
fn gql_semicolons_inside_quotes_do_not_split() {
    let stmts = split_statements(r#"CREATE NODE Company {name:"A; B"}; ; MATCH NODE *"#);
    assert_eq!(stmts.len(), 2);
    let mut db = new_db();
    execute_query(&mut db, r#"CREATE NODE Company {name:"A; B"}"#).unwrap();
    assert_eq!(db.snapshot().nodes[0].name, "A; B");
}

#[test]
fn gql_multi_statement_execution_aggregates_counts() {
    let mut db = new_db();
    let out = execute_query(&mut db, r#"CREATE NODE Company {name:"A"}; CREATE NODE Company {name:"B"}; MATCH NODE Company"#).unwrap();
    assert_eq!(out.affected_nodes, 2);
    assert_eq!(out.rows.len(), 4);
    assert!(out.mutated);
}

#[test]
fn batch_continues_past_failures() {
    let mut db = new_db();
    let report = execute_batch(
        &mut db,
        r#"CREATE NODE Company {name:"Acme"}; CREATE NODE {oops; MATCH NODE Company"#,
    )
    .unwrap();
    assert!(!report.success);
    assert_eq!(report.total_queries, 3);
    assert_eq!(report.successful_queries, 2);
    assert_eq!(report.failed_queries, 1);
    assert_eq!(report.errors[0].query_index, 2);
    assert_eq!(report.message, "2 of 3 queries executed successfully");
    assert!(report.mutated);
    assert_eq!(report.results[0].affected_rows, 1);
    assert_eq!(report.results[1].affected_rows, 1, "read statements report their row count");
}

#[test]
fn batch_reports_reversed_braces_as_a_statement_error() {
    let mut db = new_db();
    let id = db.add_node("Ada".into(), NodeKind::Employee, Properties::new()).unwrap();
    let report = execute_batch(
        &mut db,
        &format!("MATCH NODE *; CREATE REL }} {{; CREATE NODE Company }} {{; SET NODE {} {{a:1; MATCH NODE *", id),
    )
    .unwrap();
    assert_eq!(report.total_queries, 5);
    assert_eq!(report.failed_queries, 3);
    assert_eq!(report.successful_queries, 2);
    assert_eq!(
        report.errors.iter().map(|e| e.query_index).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
    assert!(report.errors.iter().all(|e| e.error.contains("unclosed property block")));
    assert_eq!(report.results.last().unwrap().affected_rows, 1, "statement after the failures still runs");
    assert!(execute_query(&mut db, "CREATE REL from=a to=b type=X } {").is_err());
}

#[test]
fn batch_all_successful_and_empty_input() {
    let mut db = new_db();
    let report = execute_batch(&mut db, "MATCH NODE *; MATCH REL *").unwrap();
    assert!(report.success);
    assert!(!report.mutated);
    assert_eq!(report.message, "All 2 queries executed successfully");

    let err = execute_batch(&mut db, " ;  ; ").unwrap_err();
    assert_eq!(err.to_string(), "No valid queries found");
}

#[test]
fn batch_report_serializes_camel_case() {
    let mut db = new_db();
    let report = execute_batch(&mut db, "MATCH NODE *; BOGUS").unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["totalQueries"], 2);
    assert_eq!(json["failedQueries"], 1);
    assert_eq!(json["errors"][0]["queryIndex"], 2);
    assert_eq!(json["results"][0]["affectedRows"], 0);
}

#[test]
fn params_bind_outside_quotes_only() {
    let mut params = HashMap::new();
    params.insert("name".to_string(), serde_json::json!("O\"Neil"));
    params.insert("years".to_string(), serde_json::json!(4));
    let bound = bind_params(r#"CREATE NODE Employee {name:$name, experience:$years, note:"$name"}"#, &params).unwrap();
    assert_eq!(bound, r#"CREATE NODE Employee {name:"O\"Neil", experience:4, note:"$name"}"#);

    assert!(bind_params("MATCH NODE * WHERE name=$missing", &params).is_err());

    let mut db = new_db();
    let out = execute_with_params(&mut db, "CREATE NODE Employee {name:$name, experience:$years}", &params).unwrap();
    let id = ids_from_rows(&out.rows)[0];
    assert_eq!(db.get_node(id).unwrap().name, "O\"Neil");
}

#[test]
fn literals_parse_to_scalars() {
    assert_eq!(parse_literal("\"x\""), Scalar::text("x"));
    assert_eq!(parse_literal("'x'"), Scalar::text("x"));
    assert_eq!(parse_literal("TRUE"), Scalar::Bool(true));
    assert_eq!(parse_literal("null"), Scalar::Null);
    assert_eq!(parse_literal("42"), Scalar::Int(42));
    assert_eq!(parse_literal("2.5"), Scalar::Float(2.5));
    assert_eq!(parse_literal("bare"), Scalar::text("bare"));
}
