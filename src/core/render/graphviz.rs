use std::io::Write;
use std::process::{Command, Stdio};

use crate::core::model::{FlowGraph, NodeShape};
use crate::error::{FlowdocError, Result};

use super::{DiagramRenderer, RenderOptions};

/// Renders Graphviz DOT source, optionally piped through the external `dot`
/// binary for png/svg/pdf output
pub struct GraphvizRenderer {
    output_format: String,
    options: RenderOptions,
}

impl GraphvizRenderer {
    pub fn new(output_format: &str, options: RenderOptions) -> Self {
        Self {
            output_format: output_format.to_string(),
            options,
        }
    }

    fn node_style(shape: NodeShape) -> &'static str {
        match shape {
            NodeShape::Regular => "shape=box, style=filled, fillcolor=lightblue",
            NodeShape::Decision => "shape=diamond, style=filled, fillcolor=lightyellow",
            NodeShape::Terminal => "shape=ellipse, style=filled, fillcolor=lightgreen",
        }
    }

    fn dot_source(&self, graph: &FlowGraph) -> String {
        let mut lines = vec![
            format!("digraph {} {{", quote(&graph.flow.display_name)),
            format!("    rankdir={};", self.options.direction.graphviz()),
            format!(
                "    label={}; labelloc=t; fontsize=16;",
                quote(&graph.flow.display_name)
            ),
        ];

        for step in &graph.steps {
            let style = Self::node_style(graph.node_shape(&step.qualified_id));
            let mut attrs = format!("label={}, {}", quote(&step.display_name), style);
            if self.options.include_docstrings {
                if let Some(docstring) = &step.docstring {
                    attrs.push_str(&format!(", tooltip={}", quote(docstring)));
                }
            }
            lines.push(format!("    {} [{}];", quote(&step.qualified_id), attrs));
        }

        for edge in &graph.edges {
            let mut line = format!(
                "    {} -> {}",
                quote(&edge.source_step_id),
                quote(&edge.target_step_id)
            );
            if let Some(label) = edge.edge_kind.branch_label() {
                line.push_str(&format!(" [label={}]", quote(label)));
            }
            line.push(';');
            lines.push(line);
        }

        lines.push("}".to_string());
        lines.join("\n") + "\n"
    }

    /// Pipe DOT source through the external `dot` binary
    fn render_with_dot(&self, source: &str) -> Result<Vec<u8>> {
        let mut child = Command::new("dot")
            .arg(format!("-T{}", self.output_format))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FlowdocError::Render(format!(
                    "{} output requires the Graphviz 'dot' binary on PATH ({}). \
                     Use --format mermaid or --format dot instead.",
                    self.output_format.to_uppercase(),
                    e
                ))
            })?;

        child
            .stdin
            .take()
            .ok_or_else(|| FlowdocError::Render("Failed to open dot stdin".to_string()))?
            .write_all(source.as_bytes())?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(FlowdocError::Render(format!(
                "dot exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl DiagramRenderer for GraphvizRenderer {
    fn render(&self, graph: &FlowGraph) -> Result<Vec<u8>> {
        let source = self.dot_source(graph);
        if self.output_format == "dot" {
            return Ok(source.into_bytes());
        }
        self.render_with_dot(&source)
    }

    fn file_extension(&self) -> &'static str {
        match self.output_format.as_str() {
            "png" => "png",
            "svg" => "svg",
            "pdf" => "pdf",
            _ => "dot",
        }
    }
}

/// Quote a DOT identifier or label, escaping embedded quotes
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
