use std::collections::{BTreeMap, HashMap};

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::model::{CallEdge, FlowGraph, FlowKind, FlowRecord, StepRecord};
use super::registry::StepRegistry;

/// Group resolved steps and edges by declaring flow
///
/// Explicit flows come from `@flow` classes. Standalone module-level steps
/// are grouped into implicit flows keyed by module; implicit flows connected
/// by resolved edges are merged (keyed by the lexicographically smallest
/// member module) so a cross-file chain of standalone steps lands in one
/// graph. Methods of plain (non-flow) classes stay resolvable call targets
/// but belong to no flow.
///
/// Edges whose source and target disagree on flow membership are dropped
/// with one informational diagnostic each, never an error.
pub fn assemble(
    registry: &StepRegistry,
    flows: &[FlowRecord],
    edges: Vec<CallEdge>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<String, FlowGraph> {
    // Initial membership: explicit flow id, or the step's own module for
    // standalone functions
    let mut membership: HashMap<String, String> = HashMap::new();
    for step in registry.iter() {
        if let Some(flow_id) = &step.declaring_flow_id {
            membership.insert(step.qualified_id.clone(), flow_id.clone());
        } else if step.class_name.is_none() {
            membership.insert(step.qualified_id.clone(), step.module_path.clone());
        }
    }

    let implicit_modules: Vec<String> = {
        let mut modules: Vec<String> = registry
            .iter()
            .filter(|s| s.declaring_flow_id.is_none() && s.class_name.is_none())
            .map(|s| s.module_path.clone())
            .collect();
        modules.sort();
        modules.dedup();
        modules
    };

    // Merge implicit module flows connected by resolved edges
    let mut merge = Merge::new(&implicit_modules);
    for edge in &edges {
        let source_standalone = standalone_module(registry, &edge.source_step_id);
        let target_standalone = standalone_module(registry, &edge.target_step_id);
        if let (Some(a), Some(b)) = (source_standalone, target_standalone) {
            merge.union(a, b);
        }
    }

    // Final membership after merging
    let final_flow = |qualified_id: &str| -> Option<String> {
        let flow_id = membership.get(qualified_id)?;
        match standalone_module(registry, qualified_id) {
            Some(module) => Some(merge.root(module)),
            None => Some(flow_id.clone()),
        }
    };

    let mut graphs: BTreeMap<String, FlowGraph> = BTreeMap::new();

    for flow in flows {
        graphs.entry(flow.flow_id.clone()).or_insert_with(|| FlowGraph {
            flow: flow.clone(),
            steps: Vec::new(),
            edges: Vec::new(),
            entry_candidates: Vec::new(),
        });
    }
    for module in &implicit_modules {
        let key = merge.root(module);
        graphs.entry(key.clone()).or_insert_with(|| FlowGraph {
            flow: FlowRecord {
                flow_id: key.clone(),
                display_name: key.clone(),
                description: None,
                kind: FlowKind::Module,
            },
            steps: Vec::new(),
            edges: Vec::new(),
            entry_candidates: Vec::new(),
        });
    }

    // Steps in registration (discovery) order
    for step in registry.iter() {
        if let Some(flow_id) = final_flow(&step.qualified_id) {
            if let Some(graph) = graphs.get_mut(&flow_id) {
                graph.steps.push(step.clone());
            }
        }
    }

    for edge in edges {
        let source_flow = final_flow(&edge.source_step_id);
        let target_flow = final_flow(&edge.target_step_id);
        match (source_flow, target_flow) {
            (Some(source), Some(target)) if source == target => {
                if let Some(graph) = graphs.get_mut(&source) {
                    graph.edges.push(edge);
                }
            }
            _ => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::CrossFlowEdge,
                        format!(
                            "Dropping call from '{}' to '{}': the steps belong to different flows",
                            edge.source_step_id, edge.target_step_id
                        ),
                    )
                    .with_line(edge.call_site_line),
                );
            }
        }
    }

    for graph in graphs.values_mut() {
        graph.entry_candidates = graph
            .steps
            .iter()
            .filter(|step| graph.in_degree(&step.qualified_id) == 0)
            .map(|step| step.qualified_id.clone())
            .collect();
    }

    graphs
}

fn standalone_module<'r>(registry: &'r StepRegistry, qualified_id: &str) -> Option<&'r str> {
    registry.get(qualified_id).and_then(|step| {
        if step.declaring_flow_id.is_none() && step.class_name.is_none() {
            Some(step.module_path.as_str())
        } else {
            None
        }
    })
}

/// Union-find over implicit module flows; the representative is always the
/// lexicographically smallest member so merged keys are input-order
/// independent.
struct Merge {
    parent: HashMap<String, String>,
}

impl Merge {
    fn new(modules: &[String]) -> Self {
        let parent = modules
            .iter()
            .map(|m| (m.clone(), m.clone()))
            .collect();
        Self { parent }
    }

    fn root(&self, module: &str) -> String {
        let mut current = module.to_string();
        while let Some(parent) = self.parent.get(&current) {
            if *parent == current {
                break;
            }
            current = parent.clone();
        }
        current
    }

    fn union(&mut self, a: &str, b: &str) {
        let root_a = self.root(a);
        let root_b = self.root(b);
        if root_a == root_b {
            return;
        }
        if root_a < root_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_a, root_b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{BranchArm, EdgeKind};
    use std::path::PathBuf;

    fn step(module: &str, class: Option<&str>, func: &str, flow: Option<&str>) -> StepRecord {
        let qualified_id = match class {
            Some(class) => format!("{}.{}.{}", module, class, func),
            None => format!("{}.{}", module, func),
        };
        StepRecord {
            qualified_id,
            display_name: func.to_string(),
            description: None,
            docstring: None,
            declaring_flow_id: flow.map(String::from),
            module_path: module.to_string(),
            class_name: class.map(String::from),
            function_name: func.to_string(),
            file: PathBuf::from(format!("{}.py", module)),
            line: 1,
        }
    }

    fn edge(src: &str, tgt: &str) -> CallEdge {
        CallEdge {
            source_step_id: src.to_string(),
            target_step_id: tgt.to_string(),
            edge_kind: EdgeKind::Sequential,
            call_site_line: 1,
        }
    }

    fn class_flow(id: &str) -> FlowRecord {
        FlowRecord {
            flow_id: id.to_string(),
            display_name: id.to_string(),
            description: None,
            kind: FlowKind::Class,
        }
    }

    #[test]
    fn groups_class_flow_members() {
        let mut registry = StepRegistry::new();
        registry
            .register(step("orders", Some("P"), "a", Some("orders.P")))
            .unwrap();
        registry
            .register(step("orders", Some("P"), "b", Some("orders.P")))
            .unwrap();

        let mut diagnostics = Vec::new();
        let graphs = assemble(
            &registry,
            &[class_flow("orders.P")],
            vec![edge("orders.P.a", "orders.P.b")],
            &mut diagnostics,
        );

        assert_eq!(graphs.len(), 1);
        let graph = &graphs["orders.P"];
        assert_eq!(graph.steps.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.entry_candidates, vec!["orders.P.a".to_string()]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn implicit_flows_merge_across_connected_modules() {
        let mut registry = StepRegistry::new();
        registry.register(step("billing", None, "charge", None)).unwrap();
        registry
            .register(step("orders", None, "receive_order", None))
            .unwrap();

        let mut diagnostics = Vec::new();
        let graphs = assemble(
            &registry,
            &[],
            vec![edge("orders.receive_order", "billing.charge")],
            &mut diagnostics,
        );

        // One merged graph keyed by the smallest member module
        assert_eq!(graphs.len(), 1);
        let graph = &graphs["billing"];
        assert_eq!(graph.steps.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unconnected_modules_stay_separate() {
        let mut registry = StepRegistry::new();
        registry.register(step("billing", None, "charge", None)).unwrap();
        registry.register(step("orders", None, "receive", None)).unwrap();

        let mut diagnostics = Vec::new();
        let graphs = assemble(&registry, &[], vec![], &mut diagnostics);

        assert_eq!(graphs.len(), 2);
        assert!(graphs.contains_key("billing"));
        assert!(graphs.contains_key("orders"));
    }

    #[test]
    fn cross_flow_edge_is_dropped_with_diagnostic() {
        let mut registry = StepRegistry::new();
        registry
            .register(step("orders", Some("P"), "a", Some("orders.P")))
            .unwrap();
        registry.register(step("billing", None, "charge", None)).unwrap();

        let mut diagnostics = Vec::new();
        let graphs = assemble(
            &registry,
            &[class_flow("orders.P")],
            vec![edge("orders.P.a", "billing.charge")],
            &mut diagnostics,
        );

        assert!(graphs["orders.P"].edges.is_empty());
        assert!(graphs["billing"].edges.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::CrossFlowEdge);
    }

    #[test]
    fn edge_to_plain_class_method_is_dropped() {
        let mut registry = StepRegistry::new();
        registry.register(step("m", None, "a", None)).unwrap();
        registry.register(step("m", Some("Helpers"), "audit", None)).unwrap();

        let mut diagnostics = Vec::new();
        let graphs = assemble(
            &registry,
            &[],
            vec![edge("m.a", "m.Helpers.audit")],
            &mut diagnostics,
        );

        // The helper method belongs to no flow, so the edge is foreign
        assert!(graphs["m"].edges.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn terminal_step_with_incoming_edge_is_not_entry_candidate() {
        let mut registry = StepRegistry::new();
        registry.register(step("m", None, "a", None)).unwrap();
        registry.register(step("m", None, "b", None)).unwrap();

        let mut diagnostics = Vec::new();
        let graphs = assemble(&registry, &[], vec![edge("m.a", "m.b")], &mut diagnostics);

        let graph = &graphs["m"];
        assert_eq!(graph.entry_candidates, vec!["m.a".to_string()]);
        assert_eq!(
            graph.node_shape("m.b"),
            crate::core::model::NodeShape::Terminal
        );
    }

    #[test]
    fn conditional_edges_survive_assembly() {
        let mut registry = StepRegistry::new();
        registry.register(step("m", None, "a", None)).unwrap();
        registry.register(step("m", None, "b", None)).unwrap();

        let mut diagnostics = Vec::new();
        let mut conditional = edge("m.a", "m.b");
        conditional.edge_kind = EdgeKind::ConditionalBranch(BranchArm::Then);
        let graphs = assemble(&registry, &[], vec![conditional], &mut diagnostics);

        assert_eq!(
            graphs["m"].edges[0].edge_kind,
            EdgeKind::ConditionalBranch(BranchArm::Then)
        );
    }
}
