use regex::Regex;

use crate::core::model::{FlowGraph, NodeShape};
use crate::error::Result;

use super::{DiagramRenderer, RenderOptions};

/// Mermaid keywords that conflict with node ids
const RESERVED_WORDS: &[&str] = &[
    "end", "graph", "subgraph", "direction", "click", "style", "class",
];

/// Renders Mermaid flowchart markup, suitable for GitHub/GitLab READMEs
pub struct MermaidRenderer {
    options: RenderOptions,
    id_sanitizer: Regex,
}

impl MermaidRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            // unwrap: pattern is a compile-time constant
            id_sanitizer: Regex::new(r"[^a-zA-Z0-9_]").unwrap(),
        }
    }

    pub(crate) fn render_text(&self, graph: &FlowGraph) -> String {
        let mut lines = vec![format!("flowchart {}", self.options.direction.mermaid())];

        for step in &graph.steps {
            let node_id = self.sanitize_id(&step.qualified_id);
            let label = escape_label(&step.display_name);
            let shape = graph.node_shape(&step.qualified_id);
            lines.push(format!("    {}", node_definition(&node_id, &label, shape)));
            if self.options.include_docstrings {
                if let Some(docstring) = &step.docstring {
                    for doc_line in docstring.lines() {
                        lines.push(format!("    %% {}", doc_line));
                    }
                }
            }
        }

        if !graph.edges.is_empty() {
            lines.push(String::new());
        }

        for edge in &graph.edges {
            let from = self.sanitize_id(&edge.source_step_id);
            let to = self.sanitize_id(&edge.target_step_id);
            match edge.edge_kind.branch_label() {
                Some(label) => lines.push(format!("    {} -->|{}| {}", from, label, to)),
                None => lines.push(format!("    {} --> {}", from, to)),
            }
        }

        lines.join("\n") + "\n"
    }

    fn sanitize_id(&self, name: &str) -> String {
        let sanitized = self.id_sanitizer.replace_all(name, "_").to_string();
        if RESERVED_WORDS.contains(&sanitized.to_lowercase().as_str()) {
            format!("step_{}", sanitized)
        } else {
            sanitized
        }
    }
}

impl DiagramRenderer for MermaidRenderer {
    fn render(&self, graph: &FlowGraph) -> Result<Vec<u8>> {
        Ok(self.render_text(graph).into_bytes())
    }

    fn file_extension(&self) -> &'static str {
        "mmd"
    }
}

/// Format a node definition with the shape matching its classification
fn node_definition(node_id: &str, label: &str, shape: NodeShape) -> String {
    match shape {
        NodeShape::Decision => format!("{}{{{}}}", node_id, label),
        NodeShape::Terminal => format!("{}([{}])", node_id, label),
        NodeShape::Regular => format!("{}[{}]", node_id, label),
    }
}

/// Quote labels containing characters Mermaid treats specially
fn escape_label(label: &str) -> String {
    if label.chars().any(|c| "[]{}()|\"".contains(c)) {
        format!("\"{}\"", label.replace('"', "#quot;"))
    } else {
        label.to_string()
    }
}
