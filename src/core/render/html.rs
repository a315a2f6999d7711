use tera::{Context, Tera};

use crate::core::model::FlowGraph;
use crate::error::Result;

use super::{DiagramRenderer, MermaidRenderer, RenderOptions};

/// Standalone HTML page embedding the Mermaid diagram
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<script type="module">
import mermaid from "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs";
mermaid.initialize({ startOnLoad: true });
</script>
<style>
body { font-family: sans-serif; margin: 2rem auto; max-width: 60rem; }
h1 { font-size: 1.4rem; }
.description { color: #555; }
dl.steps dt { font-weight: bold; margin-top: 0.6rem; }
dl.steps dd { margin-left: 1rem; color: #333; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
{% if description %}<p class="description">{{ description }}</p>{% endif %}
<pre class="mermaid">
{{ mermaid }}
</pre>
{% if steps %}
<h2>Steps</h2>
<dl class="steps">
{% for step in steps %}
<dt>{{ step.name }}</dt>
<dd>{{ step.doc }}</dd>
{% endfor %}
</dl>
{% endif %}
</body>
</html>
"#;

/// Renders a self-contained HTML page with the diagram and step docs
pub struct HtmlRenderer {
    tera: Tera,
    options: RenderOptions,
}

impl HtmlRenderer {
    pub fn new(options: RenderOptions) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("flow.html", PAGE_TEMPLATE)?;
        Ok(Self { tera, options })
    }
}

impl DiagramRenderer for HtmlRenderer {
    fn render(&self, graph: &FlowGraph) -> Result<Vec<u8>> {
        let mermaid = MermaidRenderer::new(RenderOptions {
            direction: self.options.direction,
            // Mermaid comments would leak into the rendered diagram block;
            // docstrings go into the step list instead
            include_docstrings: false,
        });
        let diagram = mermaid.render_text(graph);

        let steps: Vec<tera::Value> = if self.options.include_docstrings {
            graph
                .steps
                .iter()
                .filter_map(|step| {
                    step.docstring.as_ref().map(|doc| {
                        tera::Value::Object(
                            [
                                ("name".to_string(), step.display_name.clone().into()),
                                ("doc".to_string(), doc.clone().into()),
                            ]
                            .into_iter()
                            .collect(),
                        )
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut context = Context::new();
        context.insert("title", &graph.flow.display_name);
        context.insert("description", &graph.flow.description);
        context.insert("mermaid", diagram.trim_end());
        context.insert("steps", &steps);

        let page = self.tera.render("flow.html", &context)?;
        Ok(page.into_bytes())
    }

    fn file_extension(&self) -> &'static str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FlowKind, FlowRecord, StepRecord};
    use std::path::PathBuf;

    fn sample_graph() -> FlowGraph {
        FlowGraph {
            flow: FlowRecord {
                flow_id: "m".to_string(),
                display_name: "Order Flow".to_string(),
                description: Some("Handles orders".to_string()),
                kind: FlowKind::Module,
            },
            steps: vec![StepRecord {
                qualified_id: "m.a".to_string(),
                display_name: "Receive".to_string(),
                description: None,
                docstring: Some("Accept an order.".to_string()),
                declaring_flow_id: None,
                module_path: "m".to_string(),
                class_name: None,
                function_name: "a".to_string(),
                file: PathBuf::from("m.py"),
                line: 1,
            }],
            edges: vec![],
            entry_candidates: vec!["m.a".to_string()],
        }
    }

    #[test]
    fn renders_page_with_embedded_diagram() {
        let renderer = HtmlRenderer::new(RenderOptions::default()).unwrap();
        let page = String::from_utf8(renderer.render(&sample_graph()).unwrap()).unwrap();

        assert!(page.contains("<title>Order Flow</title>"));
        assert!(page.contains("Handles orders"));
        assert!(page.contains("flowchart TD"));
        assert!(page.contains("m_a([Receive])"));
    }

    #[test]
    fn step_docs_included_when_requested() {
        let renderer = HtmlRenderer::new(RenderOptions {
            include_docstrings: true,
            ..Default::default()
        })
        .unwrap();
        let page = String::from_utf8(renderer.render(&sample_graph()).unwrap()).unwrap();
        assert!(page.contains("Accept an order."));
    }
}
