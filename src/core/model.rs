use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One annotated callable representing a business-process action
///
/// Immutable once created: the extractor builds these during pass 1 and the
/// registry owns them for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Globally unique identifier: module path + optional class + function name
    pub qualified_id: String,

    /// Human-readable name from the decorator, falling back to the function name
    pub display_name: String,

    /// Description from the decorator, if one was given as a literal
    pub description: Option<String>,

    /// Docstring text, quote delimiters stripped
    pub docstring: Option<String>,

    /// Qualified class id of the `@flow` container, if the step is a method of one
    pub declaring_flow_id: Option<String>,

    /// Dotted module path derived from the file path
    pub module_path: String,

    /// Enclosing class name, if the step is a method
    pub class_name: Option<String>,

    /// Bare function name
    pub function_name: String,

    /// Source file the step was extracted from
    pub file: PathBuf,

    /// 1-based line of the function definition
    pub line: usize,
}

impl StepRecord {
    /// Qualified id of the enclosing class, if any
    pub fn class_scope(&self) -> Option<String> {
        self.class_name
            .as_ref()
            .map(|class| format!("{}.{}", self.module_path, class))
    }
}

/// How a flow container was declared in source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// A `@flow`-decorated class
    Class,
    /// Synthesized container for standalone module-level steps
    Module,
}

/// A named collection of steps representing one end-to-end process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Qualified class id for class flows, module path for implicit flows
    pub flow_id: String,

    pub display_name: String,

    pub description: Option<String>,

    pub kind: FlowKind,
}

/// Which arm of a conditional a call site sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchArm {
    Then,
    Else,
}

/// Classification of a call edge
///
/// Advisory metadata for renderers and validators. Shape classification uses
/// plain out-degree and ignores this tag entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Sequential,
    ConditionalBranch(BranchArm),
}

impl EdgeKind {
    /// Label for rendered branch edges ("yes" / "no"), if any
    pub fn branch_label(&self) -> Option<&'static str> {
        match self {
            EdgeKind::Sequential => None,
            EdgeKind::ConditionalBranch(BranchArm::Then) => Some("yes"),
            EdgeKind::ConditionalBranch(BranchArm::Else) => Some("no"),
        }
    }
}

/// A resolved call between two steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    /// Qualified id of the calling step
    pub source_step_id: String,

    /// Qualified id of the called step
    pub target_step_id: String,

    pub edge_kind: EdgeKind,

    /// 1-based line of the call site
    pub call_site_line: usize,
}

impl CallEdge {
    pub fn is_self_edge(&self) -> bool {
        self.source_step_id == self.target_step_id
    }
}

/// Node shape derived from a step's out-degree within its flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    /// No resolved outgoing calls
    Terminal,
    /// Exactly one outgoing call
    Regular,
    /// Two or more outgoing calls
    Decision,
}

impl NodeShape {
    /// Classify from out-degree. Self-edges and duplicate targets must already
    /// be excluded from the count.
    pub fn classify(out_degree: usize) -> Self {
        match out_degree {
            0 => NodeShape::Terminal,
            1 => NodeShape::Regular,
            _ => NodeShape::Decision,
        }
    }
}

/// One assembled flow, ready for validation and rendering
///
/// Invariant: every edge's source and target are members of `steps`. The
/// assembler drops edges that would violate this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    pub flow: FlowRecord,

    /// Member steps in discovery order
    pub steps: Vec<StepRecord>,

    /// Resolved edges in call-site order within a step, steps in discovery order
    pub edges: Vec<CallEdge>,

    /// Qualified ids of steps with zero incoming edges within this flow.
    /// May be empty (a validation concern) or hold several entries.
    pub entry_candidates: Vec<String>,
}

impl FlowGraph {
    pub fn step(&self, qualified_id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.qualified_id == qualified_id)
    }

    /// Out-degree of a step, excluding self-edges. Edges are already
    /// deduplicated by (source, target) when the graph is built.
    pub fn out_degree(&self, qualified_id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source_step_id == qualified_id && !e.is_self_edge())
            .count()
    }

    pub fn in_degree(&self, qualified_id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.target_step_id == qualified_id)
            .count()
    }

    /// Shape of a step node, a pure function of its out-degree
    pub fn node_shape(&self, qualified_id: &str) -> NodeShape {
        NodeShape::classify(self.out_degree(qualified_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(qid: &str) -> StepRecord {
        StepRecord {
            qualified_id: qid.to_string(),
            display_name: qid.to_string(),
            description: None,
            docstring: None,
            declaring_flow_id: None,
            module_path: "m".to_string(),
            class_name: None,
            function_name: qid.rsplit('.').next().unwrap().to_string(),
            file: PathBuf::from("m.py"),
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

    #[test]
    fn shape_is_pure_function_of_out_degree() {
        assert_eq!(NodeShape::classify(0), NodeShape::Terminal);
        assert_eq!(NodeShape::classify(1), NodeShape::Regular);
        assert_eq!(NodeShape::classify(2), NodeShape::Decision);
        assert_eq!(NodeShape::classify(7), NodeShape::Decision);
    }

    #[test]
    fn self_edges_do_not_affect_shape() {
        let graph = FlowGraph {
            flow: FlowRecord {
                flow_id: "m".to_string(),
                display_name: "m".to_string(),
                description: None,
                kind: FlowKind::Module,
            },
            steps: vec![step("m.a"), step("m.b")],
            edges: vec![edge("m.a", "m.a"), edge("m.a", "m.b")],
            entry_candidates: vec![],
        };

        assert_eq!(graph.node_shape("m.a"), NodeShape::Regular);
        assert_eq!(graph.node_shape("m.b"), NodeShape::Terminal);
    }

    #[test]
    fn branch_labels() {
        assert_eq!(EdgeKind::Sequential.branch_label(), None);
        assert_eq!(
            EdgeKind::ConditionalBranch(BranchArm::Then).branch_label(),
            Some("yes")
        );
        assert_eq!(
            EdgeKind::ConditionalBranch(BranchArm::Else).branch_label(),
            Some("no")
        );
    }
}
