//! Plan graph export for visualization and debugging.
//!
//! Turns a call-site plan into a flat node/edge graph annotated with each
//! node's base cost and cache lifetime, and renders it as JSON, YAML,
//! Graphviz DOT or Mermaid. Scoped nodes are highlighted, which makes it easy
//! to see which branch of a plan forces the scope lock.
//!
//! The graph is produced by [`PlanGraphBuilder`], a [`CallSiteVisitor`] of
//! its own: it shares the dispatch with the analyzer but nothing else.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_callsite::{CallSite, key_of_type};
//! use ferrous_callsite::graph_export::{ExportFormat, PlanGraph};
//!
//! struct Session;
//! struct Handler;
//!
//! let plan = CallSite::constructor(
//!     key_of_type::<Handler>(),
//!     "Handler",
//!     vec![CallSite::scoped(key_of_type::<Session>(), CallSite::create_instance(key_of_type::<Session>(), "Session"))],
//! );
//!
//! let graph = PlanGraph::from_call_site(&plan);
//! assert_eq!(graph.metadata.node_count, 3);
//! assert!(graph.metadata.requires_scope_lock);
//!
//! let dot = graph.export(ExportFormat::Dot).unwrap();
//! assert!(dot.starts_with("digraph CallSitePlan {"));
//! ```

use std::cell::RefCell;
use std::fmt;

#[cfg(feature = "graph-export")]
use serde::{Deserialize, Serialize};

use crate::analysis::{CallSiteAnalyzer, EmitCostTable};
use crate::call_site::{
    CallSite, CallSiteKind, ConstantCallSite, ConstructorCallSite, CreateInstanceCallSite,
    EnumerableCallSite, FactoryCallSite, ScopedCallSite, ServiceProviderCallSite,
    ServiceScopeFactoryCallSite, SingletonCallSite, TransientCallSite,
};
use crate::error::CallSiteResult;
#[cfg(feature = "graph-export")]
use crate::error::CallSiteError;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::visitor::CallSiteVisitor;

/// Export format version written into graph metadata.
pub const FORMAT_VERSION: &str = "1.0";

/// A call site in the exported graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct PlanNode {
    /// Pre-order index; the root is 0
    pub id: usize,
    /// Call-site variant
    pub kind: CallSiteKind,
    /// Full service type name
    pub service: String,
    /// Service name without module paths, plus the registration name if any
    pub label: String,
    /// Cache lifetime for caching wrappers
    pub lifetime: Option<Lifetime>,
    /// Base cost of this node alone
    pub base_cost: usize,
    /// Implementation type for constructor-like nodes
    pub implementation: Option<String>,
}

/// How a child hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub enum EdgeRelation {
    /// Inner plan of a caching wrapper
    Wraps,
    /// Constructor parameter at the given position
    Parameter(usize),
    /// Collection element at the given position
    Element(usize),
}

impl fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeRelation::Wraps => f.write_str("wraps"),
            EdgeRelation::Parameter(i) => write!(f, "param {}", i),
            EdgeRelation::Element(i) => write!(f, "item {}", i),
        }
    }
}

/// Parent to child link in the exported graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct PlanEdge {
    pub from: usize,
    pub to: usize,
    pub relation: EdgeRelation,
}

/// Graph-level summary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct PlanGraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    /// Longest root-to-leaf path, in nodes
    pub max_depth: usize,
    /// Analyzer estimate for the whole plan
    pub estimated_size: usize,
    /// Analyzer scope-lock decision for the whole plan
    pub requires_scope_lock: bool,
    /// Export timestamp (RFC 3339 with feature `graph-export`)
    pub exported_at: String,
    pub version: String,
}

/// A call-site plan flattened into nodes and edges.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct PlanGraph {
    pub nodes: Vec<PlanNode>,
    pub edges: Vec<PlanEdge>,
    pub metadata: PlanGraphMetadata,
}

/// Export formats supported for plan graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON for web UIs and tooling
    Json,
    /// YAML for human reading
    Yaml,
    /// DOT for Graphviz
    Dot,
    /// Mermaid for documentation
    Mermaid,
}

/// Visitor that flattens a plan into a [`PlanGraph`].
///
/// The argument is the parent link of the node being visited (`None` for the
/// root), the result is the id assigned to it. Node storage lives in
/// `RefCell`s owned by the builder, so a builder is meant for a single plan
/// and a single thread.
pub struct PlanGraphBuilder {
    costs: EmitCostTable,
    nodes: RefCell<Vec<PlanNode>>,
    edges: RefCell<Vec<PlanEdge>>,
}

impl PlanGraphBuilder {
    pub fn new() -> Self {
        Self::with_costs(EmitCostTable::DEFAULT)
    }

    /// Builder annotating nodes with `costs` instead of the stock table.
    pub fn with_costs(costs: EmitCostTable) -> Self {
        Self {
            costs,
            nodes: RefCell::new(Vec::new()),
            edges: RefCell::new(Vec::new()),
        }
    }

    /// Flattens `call_site` and attaches metadata computed by an analyzer
    /// using the same cost table.
    pub fn build(self, call_site: &CallSite) -> PlanGraph {
        self.visit_call_site(call_site, None);
        let analysis = CallSiteAnalyzer::with_costs(self.costs).analyze(call_site);
        let nodes = self.nodes.into_inner();
        let edges = self.edges.into_inner();

        let metadata = PlanGraphMetadata {
            node_count: nodes.len(),
            edge_count: edges.len(),
            max_depth: call_site.depth(),
            estimated_size: analysis.estimated_size,
            requires_scope_lock: analysis.requires_scope_lock,
            exported_at: export_timestamp(),
            version: FORMAT_VERSION.to_string(),
        };

        PlanGraph { nodes, edges, metadata }
    }

    fn add_node(
        &self,
        kind: CallSiteKind,
        service: &Key,
        implementation: Option<&'static str>,
        parent: Option<(usize, EdgeRelation)>,
    ) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len();
        let label = match service.service_name() {
            Some(name) => format!("{} ({})", service.short_name(), name),
            None => service.short_name(),
        };
        nodes.push(PlanNode {
            id,
            kind,
            service: service.display_name().to_string(),
            label,
            lifetime: lifetime_of(kind),
            base_cost: self.costs.base_cost(kind),
            implementation: implementation.map(str::to_string),
        });
        if let Some((from, relation)) = parent {
            self.edges.borrow_mut().push(PlanEdge { from, to: id, relation });
        }
        id
    }

    fn add_children<F>(&self, parent: usize, children: &[CallSite], relation: F)
    where
        F: Fn(usize) -> EdgeRelation,
    {
        for (index, child) in children.iter().enumerate() {
            self.visit_call_site(child, Some((parent, relation(index))));
        }
    }
}

impl Default for PlanGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn lifetime_of(kind: CallSiteKind) -> Option<Lifetime> {
    match kind {
        CallSiteKind::Singleton => Some(Lifetime::Singleton),
        CallSiteKind::Scoped => Some(Lifetime::Scoped),
        CallSiteKind::Transient => Some(Lifetime::Transient),
        _ => None,
    }
}

#[cfg(feature = "graph-export")]
fn export_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(not(feature = "graph-export"))]
fn export_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}", secs)
}

type Parent = Option<(usize, EdgeRelation)>;

impl CallSiteVisitor<Parent, usize> for PlanGraphBuilder {
    fn visit_transient(&self, site: &TransientCallSite, parent: Parent) -> usize {
        let id = self.add_node(CallSiteKind::Transient, site.service(), None, parent);
        self.visit_call_site(site.inner(), Some((id, EdgeRelation::Wraps)));
        id
    }

    fn visit_constructor(&self, site: &ConstructorCallSite, parent: Parent) -> usize {
        let id = self.add_node(CallSiteKind::Constructor, site.service(), Some(site.implementation()), parent);
        self.add_children(id, site.parameters(), EdgeRelation::Parameter);
        id
    }

    fn visit_singleton(&self, site: &SingletonCallSite, parent: Parent) -> usize {
        let id = self.add_node(CallSiteKind::Singleton, site.service(), None, parent);
        self.visit_call_site(site.inner(), Some((id, EdgeRelation::Wraps)));
        id
    }

    fn visit_scoped(&self, site: &ScopedCallSite, parent: Parent) -> usize {
        let id = self.add_node(CallSiteKind::Scoped, site.service(), None, parent);
        self.visit_call_site(site.inner(), Some((id, EdgeRelation::Wraps)));
        id
    }

    fn visit_constant(&self, site: &ConstantCallSite, parent: Parent) -> usize {
        self.add_node(CallSiteKind::Constant, site.service(), None, parent)
    }

    fn visit_create_instance(&self, site: &CreateInstanceCallSite, parent: Parent) -> usize {
        self.add_node(CallSiteKind::CreateInstance, site.service(), Some(site.implementation()), parent)
    }

    fn visit_service_provider(&self, site: &ServiceProviderCallSite, parent: Parent) -> usize {
        self.add_node(CallSiteKind::ServiceProvider, site.service(), None, parent)
    }

    fn visit_service_scope_factory(&self, site: &ServiceScopeFactoryCallSite, parent: Parent) -> usize {
        self.add_node(CallSiteKind::ServiceScopeFactory, site.service(), None, parent)
    }

    fn visit_enumerable(&self, site: &EnumerableCallSite, parent: Parent) -> usize {
        let id = self.add_node(CallSiteKind::Enumerable, site.service(), None, parent);
        self.add_children(id, site.elements(), EdgeRelation::Element);
        id
    }

    fn visit_factory(&self, site: &FactoryCallSite, parent: Parent) -> usize {
        self.add_node(CallSiteKind::Factory, site.service(), None, parent)
    }
}

impl PlanGraph {
    /// Flattens `call_site` using the stock cost table.
    pub fn from_call_site(call_site: &CallSite) -> Self {
        PlanGraphBuilder::new().build(call_site)
    }

    /// Ids of the scoped nodes, in pre-order.
    pub fn scoped_nodes(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|node| node.kind == CallSiteKind::Scoped)
            .map(|node| node.id)
            .collect()
    }

    /// Renders the graph in `format`.
    pub fn export(&self, format: ExportFormat) -> CallSiteResult<String> {
        match format {
            ExportFormat::Json => self.export_json(),
            ExportFormat::Yaml => self.export_yaml(),
            ExportFormat::Dot => Ok(self.export_dot()),
            ExportFormat::Mermaid => Ok(self.export_mermaid()),
        }
    }

    fn export_json(&self) -> CallSiteResult<String> {
        #[cfg(feature = "graph-export")]
        {
            serde_json::to_string_pretty(self).map_err(|e| CallSiteError::Export(e.to_string()))
        }
        #[cfg(not(feature = "graph-export"))]
        {
            // Minimal hand-rendered document
            let mut json = String::from("{\n");
            json.push_str("  \"metadata\": {\n");
            json.push_str(&format!("    \"node_count\": {},\n", self.metadata.node_count));
            json.push_str(&format!("    \"estimated_size\": {},\n", self.metadata.estimated_size));
            json.push_str(&format!("    \"requires_scope_lock\": {},\n", self.metadata.requires_scope_lock));
            json.push_str(&format!("    \"exported_at\": \"{}\"\n", self.metadata.exported_at));
            json.push_str("  },\n");
            json.push_str("  \"nodes\": [\n");
            for (i, node) in self.nodes.iter().enumerate() {
                if i > 0 {
                    json.push_str(",\n");
                }
                json.push_str(&format!(
                    "    {{ \"id\": {}, \"kind\": \"{}\", \"service\": \"{}\", \"base_cost\": {} }}",
                    node.id, node.kind, escape_quotes(&node.service), node.base_cost
                ));
            }
            json.push_str("\n  ],\n");
            json.push_str("  \"edges\": [\n");
            for (i, edge) in self.edges.iter().enumerate() {
                if i > 0 {
                    json.push_str(",\n");
                }
                json.push_str(&format!(
                    "    {{ \"from\": {}, \"to\": {}, \"relation\": \"{}\" }}",
                    edge.from, edge.to, edge.relation
                ));
            }
            json.push_str("\n  ]\n");
            json.push('}');
            Ok(json)
        }
    }

    fn export_yaml(&self) -> CallSiteResult<String> {
        #[cfg(feature = "graph-export")]
        {
            serde_yaml::to_string(self).map_err(|e| CallSiteError::Export(e.to_string()))
        }
        #[cfg(not(feature = "graph-export"))]
        {
            let mut yaml = String::new();
            yaml.push_str("metadata:\n");
            yaml.push_str(&format!("  node_count: {}\n", self.metadata.node_count));
            yaml.push_str(&format!("  estimated_size: {}\n", self.metadata.estimated_size));
            yaml.push_str(&format!("  requires_scope_lock: {}\n", self.metadata.requires_scope_lock));
            yaml.push_str(&format!("  exported_at: \"{}\"\n", self.metadata.exported_at));
            yaml.push_str("nodes:\n");
            for node in &self.nodes {
                yaml.push_str(&format!("  - id: {}\n", node.id));
                yaml.push_str(&format!("    kind: {}\n", node.kind));
                yaml.push_str(&format!("    service: \"{}\"\n", escape_quotes(&node.service)));
                yaml.push_str(&format!("    base_cost: {}\n", node.base_cost));
            }
            yaml.push_str("edges:\n");
            for edge in &self.edges {
                yaml.push_str(&format!("  - from: {}\n", edge.from));
                yaml.push_str(&format!("    to: {}\n", edge.to));
                yaml.push_str(&format!("    relation: \"{}\"\n", edge.relation));
            }
            Ok(yaml)
        }
    }

    fn export_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph CallSitePlan {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in &self.nodes {
            let shape = if node.kind.is_leaf() { "ellipse" } else { "box" };
            let color = match node.lifetime {
                Some(Lifetime::Singleton) => "lightblue",
                Some(Lifetime::Scoped) => "salmon",
                Some(Lifetime::Transient) => "lightyellow",
                None => "white",
            };
            output.push_str(&format!(
                "  n{} [label=\"{}\\n{} (+{})\", shape={}, fillcolor={}, style=filled];\n",
                node.id,
                escape_quotes(&node.label),
                node.kind,
                node.base_cost,
                shape,
                color
            ));
        }

        output.push('\n');

        for edge in &self.edges {
            let style = match edge.relation {
                EdgeRelation::Wraps => "dashed",
                EdgeRelation::Parameter(_) => "solid",
                EdgeRelation::Element(_) => "bold",
            };
            output.push_str(&format!(
                "  n{} -> n{} [label=\"{}\", style={}];\n",
                edge.from, edge.to, edge.relation, style
            ));
        }

        output.push_str("}\n");
        output
    }

    fn export_mermaid(&self) -> String {
        let mut output = String::new();
        output.push_str("graph TD\n");

        for node in &self.nodes {
            let text = format!("{}: {}", node.kind, escape_mermaid(&node.label));
            if node.kind.is_leaf() {
                output.push_str(&format!("  n{}([\"{}\"])\n", node.id, text));
            } else {
                output.push_str(&format!("  n{}[\"{}\"]\n", node.id, text));
            }
        }

        for edge in &self.edges {
            let arrow = match edge.relation {
                EdgeRelation::Wraps => "-.->",
                EdgeRelation::Element(_) => "==>",
                EdgeRelation::Parameter(_) => "-->",
            };
            output.push_str(&format!("  n{} {}|{}| n{}\n", edge.from, arrow, edge.relation, edge.to));
        }

        output.push_str("\n  classDef singleton fill:#e1f5fe\n");
        output.push_str("  classDef scoped fill:#ffcdd2\n");
        output.push_str("  classDef transient fill:#fff3e0\n");

        for node in &self.nodes {
            let class = match node.lifetime {
                Some(Lifetime::Singleton) => "singleton",
                Some(Lifetime::Scoped) => "scoped",
                Some(Lifetime::Transient) => "transient",
                None => continue,
            };
            output.push_str(&format!("  class n{} {}\n", node.id, class));
        }

        output
    }
}

fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn escape_mermaid(text: &str) -> String {
    text.replace('"', "#quot;").replace('<', "#lt;").replace('>', "#gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;
    use std::sync::Arc;

    struct Handler;
    struct Session;
    struct Plugin;

    fn sample() -> CallSite {
        CallSite::singleton(
            key_of_type::<Handler>(),
            CallSite::constructor(
                key_of_type::<Handler>(),
                "Handler",
                vec![
                    CallSite::scoped(key_of_type::<Session>(), CallSite::create_instance(key_of_type::<Session>(), "Session")),
                    CallSite::enumerable(
                        key_of_type::<Vec<Plugin>>(),
                        key_of_type::<Plugin>(),
                        vec![
                            CallSite::factory(key_of_type::<Plugin>(), || Arc::new(Plugin)),
                            CallSite::constant_value(Plugin),
                        ],
                    ),
                ],
            ),
        )
    }

    #[test]
    fn test_nodes_are_preorder() {
        let graph = PlanGraph::from_call_site(&sample());
        let kinds: Vec<_> = graph.nodes.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CallSiteKind::Singleton,
                CallSiteKind::Constructor,
                CallSiteKind::Scoped,
                CallSiteKind::CreateInstance,
                CallSiteKind::Enumerable,
                CallSiteKind::Factory,
                CallSiteKind::Constant,
            ]
        );
        assert!(graph.nodes.iter().enumerate().all(|(i, n)| n.id == i));
    }

    #[test]
    fn test_edges_and_relations() {
        let graph = PlanGraph::from_call_site(&sample());
        assert_eq!(
            graph.edges,
            vec![
                PlanEdge { from: 0, to: 1, relation: EdgeRelation::Wraps },
                PlanEdge { from: 1, to: 2, relation: EdgeRelation::Parameter(0) },
                PlanEdge { from: 2, to: 3, relation: EdgeRelation::Wraps },
                PlanEdge { from: 1, to: 4, relation: EdgeRelation::Parameter(1) },
                PlanEdge { from: 4, to: 5, relation: EdgeRelation::Element(0) },
                PlanEdge { from: 4, to: 6, relation: EdgeRelation::Element(1) },
            ]
        );
    }

    #[test]
    fn test_metadata_matches_analyzer() {
        let plan = sample();
        let graph = PlanGraph::from_call_site(&plan);
        let analysis = crate::analysis::analyze(&plan);

        assert_eq!(graph.metadata.node_count, plan.node_count());
        assert_eq!(graph.metadata.edge_count, plan.node_count() - 1);
        assert_eq!(graph.metadata.max_depth, 4);
        assert_eq!(graph.metadata.estimated_size, analysis.estimated_size);
        assert_eq!(graph.metadata.requires_scope_lock, analysis.requires_scope_lock);
        assert_eq!(graph.nodes.iter().map(|n| n.base_cost).sum::<usize>(), analysis.estimated_size);
        assert_eq!(graph.scoped_nodes(), vec![2]);
    }

    #[test]
    fn test_node_annotations() {
        let graph = PlanGraph::from_call_site(&sample());
        let ctor = &graph.nodes[1];
        assert_eq!(ctor.implementation.as_deref(), Some("Handler"));
        assert_eq!(ctor.label, "Handler");
        assert_eq!(ctor.base_cost, 6);
        assert_eq!(graph.nodes[0].lifetime, Some(Lifetime::Singleton));
        assert_eq!(graph.nodes[2].lifetime, Some(Lifetime::Scoped));
        assert_eq!(graph.nodes[2].base_cost, 64);
    }

    #[test]
    fn test_named_label() {
        let plan = CallSite::service_provider(Key::TypeNamed(std::any::TypeId::of::<u16>(), "u16", "port"));
        let graph = PlanGraph::from_call_site(&plan);
        assert_eq!(graph.nodes[0].label, "u16 (port)");
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_custom_costs() {
        let graph = PlanGraphBuilder::with_costs(EmitCostTable::DEFAULT.with_scoped(10)).build(&sample());
        assert_eq!(graph.nodes[2].base_cost, 10);
        assert_eq!(graph.metadata.estimated_size, 6 + 10 + 6 + 6 + 16 + 4);
    }

    #[test]
    fn test_dot_export() {
        let dot = PlanGraph::from_call_site(&sample()).export(ExportFormat::Dot).unwrap();
        assert!(dot.starts_with("digraph CallSitePlan {\n"));
        assert!(dot.contains("n2 [label=\"Session\\nScoped (+64)\", shape=box, fillcolor=salmon"));
        assert!(dot.contains("n1 -> n2 [label=\"param 0\", style=solid];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_mermaid_export() {
        let mermaid = PlanGraph::from_call_site(&sample()).export(ExportFormat::Mermaid).unwrap();
        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("n4[\"Enumerable: Vec#lt;Plugin#gt;\"]"));
        assert!(mermaid.contains("n4 ==>|item 0| n5"));
        assert!(mermaid.contains("class n2 scoped"));
    }

    #[test]
    fn test_json_and_yaml_export() {
        let graph = PlanGraph::from_call_site(&sample());
        let json = graph.export(ExportFormat::Json).unwrap();
        assert!(json.contains("\"requires_scope_lock\": true"));
        let yaml = graph.export(ExportFormat::Yaml).unwrap();
        assert!(yaml.contains("node_count: 7"));
    }

    #[cfg(feature = "graph-export")]
    #[test]
    fn test_json_round_trip() {
        let graph = PlanGraph::from_call_site(&sample());
        let json = graph.export(ExportFormat::Json).unwrap();
        let parsed: PlanGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, graph);
    }
}
