//! Built-in sample dataset: one company, its employees and projects.

use crate::graph_utils::error::GraphError;
use crate::graph_utils::graph::GraphDatabase;
use crate::graph_utils::model::{NodeId, NodeKind, Properties, Scalar};

type SampleNode = (&'static str, &'static str, &'static [(&'static str, &'static str)]);

const SAMPLE_NODES: &[SampleNode] = &[
    ("Blackcoffer ", "Company", &[
        ("industry", "Information Technology"),
        ("founded", "2018"),
        ("location", "Delhi, India"),
        ("employees", "50"),
        ("website", "https://Blackcoffer .com"),
        ("revenue", "$2M"),
        ("description", "Leading IT company specializing in data analytics and AI solutions"),
    ]),
    ("Rajesh Kumar", "Employee", &[
        ("role", "Senior Full Stack Developer"),
        ("department", "Engineering"),
        ("experience", "5"),
        ("email", "rajesh.kumar@Blackcoffer .com"),
        ("skills", "React, Node.js, Python, AWS"),
        ("salary", "$75000"),
        ("joinDate", "2022-01-15"),
    ]),
    ("Priya Sharma", "Employee", &[
        ("role", "Data Scientist"),
        ("department", "Analytics"),
        ("experience", "4"),
        ("email", "priya.sharma@Blackcoffer .com"),
        ("skills", "Python, Machine Learning, TensorFlow, SQL"),
        ("salary", "$80000"),
        ("joinDate", "2022-03-10"),
    ]),
    ("Amit Patel", "Employee", &[
        ("role", "DevOps Engineer"),
        ("department", "Infrastructure"),
        ("experience", "6"),
        ("email", "amit.patel@Blackcoffer .com"),
        ("skills", "Docker, Kubernetes, AWS, Jenkins"),
        ("salary", "$85000"),
        ("joinDate", "2021-11-20"),
    ]),
    ("Sneha Gupta", "Employee", &[
        ("role", "UI/UX Designer"),
        ("department", "Design"),
        ("experience", "3"),
        ("email", "sneha.gupta@Blackcoffer .com"),
        ("skills", "Figma, Adobe XD, Prototyping, User Research"),
        ("salary", "$60000"),
        ("joinDate", "2023-02-01"),
    ]),
    ("E-Commerce Analytics Platform", "Project", &[
        ("status", "Active"),
        ("startDate", "2024-01-15"),
        ("endDate", "2024-12-31"),
        ("budget", "$150000"),
        ("technology", "React, Node.js, MongoDB"),
        ("client", "RetailCorp"),
        ("priority", "High"),
        ("description", "Advanced analytics platform for e-commerce businesses"),
    ]),
    ("AI-Powered Chatbot", "Project", &[
        ("status", "Active"),
        ("startDate", "2024-03-01"),
        ("endDate", "2024-08-30"),
        ("budget", "$80000"),
        ("technology", "Python, TensorFlow, NLP"),
        ("client", "TechStart Inc"),
        ("priority", "Medium"),
        ("description", "Intelligent chatbot system using natural language processing"),
    ]),
    ("Cloud Infrastructure Migration", "Project", &[
        ("status", "In Progress"),
        ("startDate", "2024-02-10"),
        ("endDate", "2024-09-15"),
        ("budget", "$120000"),
        ("technology", "AWS, Docker, Kubernetes"),
        ("client", "Enterprise Solutions"),
        ("priority", "High"),
        ("description", "Migration of legacy systems to cloud infrastructure"),
    ]),
];

// (source index, target index, type) into SAMPLE_NODES
const SAMPLE_RELATIONSHIPS: &[(usize, usize, &str)] = &[
    (0, 1, "EMPLOYS"),
    (0, 2, "EMPLOYS"),
    (0, 3, "EMPLOYS"),
    (0, 4, "EMPLOYS"),
    (0, 5, "OWNS"),
    (0, 6, "OWNS"),
    (0, 7, "OWNS"),
    (1, 5, "LEADS"),
    (2, 6, "LEADS"),
    (3, 7, "LEADS"),
    (1, 6, "WORKS_ON"),
    (1, 7, "WORKS_ON"),
    (2, 5, "WORKS_ON"),
    (4, 5, "WORKS_ON"),
    (4, 6, "WORKS_ON"),
];

pub const SAMPLE_NODE_COUNT: usize = SAMPLE_NODES.len();
pub const SAMPLE_RELATIONSHIP_COUNT: usize = SAMPLE_RELATIONSHIPS.len();

/// Insert the sample dataset into `db`. Returns the ids of the created nodes in table order.
pub fn seed_sample_data(db: &mut GraphDatabase) -> Result<Vec<NodeId>, GraphError> {
    let mut ids = Vec::with_capacity(SAMPLE_NODES.len());
    for (name, kind, props) in SAMPLE_NODES {
        let properties: Properties = props.iter().map(|(k, v)| (k.to_string(), Scalar::text(*v))).collect();
        ids.push(db.add_node(name.to_string(), NodeKind::parse(kind), properties)?);
    }
    for &(from, to, kind) in SAMPLE_RELATIONSHIPS {
        db.add_relationship(ids[from], ids[to], kind.to_string(), Properties::new())?;
    }
    log::info!("seeded sample data: {} nodes, {} relationships", ids.len(), SAMPLE_RELATIONSHIPS.len());
    Ok(ids)
}
