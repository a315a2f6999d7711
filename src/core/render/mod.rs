//! Pluggable diagram backends
//!
//! Each output format implements [`DiagramRenderer`] as a pure function from
//! a finished [`FlowGraph`] to bytes. The graph model carries no dependency
//! on any specific renderer; formats needing an external tool (png/svg/pdf)
//! invoke it only when selected.

mod graphviz;
mod html;
mod json;
mod mermaid;

pub use graphviz::GraphvizRenderer;
pub use html::HtmlRenderer;
pub use json::JsonRenderer;
pub use mermaid::MermaidRenderer;

use crate::error::{FlowdocError, Result};

use super::model::FlowGraph;

/// Layout direction for rendered diagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Top to bottom
    #[default]
    Tb,
    /// Left to right
    Lr,
}

impl Direction {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "TB" => Ok(Direction::Tb),
            "LR" => Ok(Direction::Lr),
            other => Err(FlowdocError::Config(format!(
                "Unknown direction '{}': expected TB or LR",
                other
            ))),
        }
    }

    /// Mermaid spells top-bottom as TD
    pub fn mermaid(self) -> &'static str {
        match self {
            Direction::Tb => "TD",
            Direction::Lr => "LR",
        }
    }

    pub fn graphviz(self) -> &'static str {
        match self {
            Direction::Tb => "TB",
            Direction::Lr => "LR",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub direction: Direction,
    /// Include docstrings as tooltips/comments where the format supports them
    pub include_docstrings: bool,
}

/// A diagram backend: a pure function from flow graph to output bytes
pub trait DiagramRenderer {
    fn render(&self, graph: &FlowGraph) -> Result<Vec<u8>>;

    /// Extension for generated files, without the dot
    fn file_extension(&self) -> &'static str;
}

/// Create the renderer for an output format name
pub fn create_renderer(format: &str, options: RenderOptions) -> Result<Box<dyn DiagramRenderer>> {
    match format {
        "mermaid" => Ok(Box::new(MermaidRenderer::new(options))),
        "dot" | "png" | "svg" | "pdf" => Ok(Box::new(GraphvizRenderer::new(format, options))),
        "html" => Ok(Box::new(HtmlRenderer::new(options)?)),
        "json" => Ok(Box::new(JsonRenderer::new())),
        other => Err(FlowdocError::Render(format!(
            "Unsupported format: {}. Supported: mermaid, dot, png, svg, pdf, html, json",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_spellings() {
        assert_eq!(Direction::parse("TB").unwrap().mermaid(), "TD");
        assert_eq!(Direction::parse("LR").unwrap().mermaid(), "LR");
        assert_eq!(Direction::parse("TB").unwrap().graphviz(), "TB");
        assert!(Direction::parse("sideways").is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(create_renderer("ascii-art", RenderOptions::default()).is_err());
    }

    #[test]
    fn known_formats_have_extensions() {
        for (format, ext) in [
            ("mermaid", "mmd"),
            ("dot", "dot"),
            ("html", "html"),
            ("json", "json"),
        ] {
            let renderer = create_renderer(format, RenderOptions::default()).unwrap();
            assert_eq!(renderer.file_extension(), ext);
        }
    }
}
