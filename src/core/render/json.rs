use crate::core::model::FlowGraph;
use crate::error::Result;

use super::DiagramRenderer;

/// Serializes the assembled graph for downstream tooling
pub struct JsonRenderer;

impl JsonRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramRenderer for JsonRenderer {
    fn render(&self, graph: &FlowGraph) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(graph)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}
