use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::model::FlowGraph;

/// Severity of a validation finding. Validation is advisory: there is no
/// error level, and validating never fails the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl ValidationMessage {
    fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }

    fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }
}

/// Advisory consistency checks over one assembled flow graph
pub struct FlowValidator;

impl FlowValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, graph: &FlowGraph) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();

        if graph.steps.is_empty() {
            messages.push(ValidationMessage::info(format!(
                "Flow '{}' declares no steps",
                graph.flow.display_name
            )));
            return messages;
        }

        if graph.entry_candidates.is_empty() {
            messages.push(ValidationMessage::warning(format!(
                "Flow '{}' has no entry point: every step has an incoming call",
                graph.flow.display_name
            )));
        } else {
            for step_id in self.unreachable_steps(graph) {
                let name = graph
                    .step(&step_id)
                    .map(|s| s.display_name.clone())
                    .unwrap_or(step_id);
                messages.push(ValidationMessage::warning(format!(
                    "Step '{}' is unreachable from any entry point",
                    name
                )));
            }
        }

        for step in &graph.steps {
            if step.description.is_none() {
                messages.push(ValidationMessage::info(format!(
                    "Step '{}' has no description",
                    step.display_name
                )));
            }
        }

        messages
    }

    /// Steps not reachable from any entry candidate, in graph order
    fn unreachable_steps(&self, graph: &FlowGraph) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = graph
            .entry_candidates
            .iter()
            .map(String::as_str)
            .collect();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for edge in &graph.edges {
                if edge.source_step_id == current {
                    queue.push_back(&edge.target_step_id);
                }
            }
        }

        graph
            .steps
            .iter()
            .filter(|step| !visited.contains(step.qualified_id.as_str()))
            .map(|step| step.qualified_id.clone())
            .collect()
    }
}

impl Default for FlowValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CallEdge, EdgeKind, FlowKind, FlowRecord, StepRecord};
    use std::path::PathBuf;

    fn graph(steps: &[&str], edges: &[(&str, &str)]) -> FlowGraph {
        let steps: Vec<StepRecord> = steps
            .iter()
            .map(|name| StepRecord {
                qualified_id: format!("m.{}", name),
                display_name: name.to_string(),
                description: Some("described".to_string()),
                docstring: None,
                declaring_flow_id: None,
                module_path: "m".to_string(),
                class_name: None,
                function_name: name.to_string(),
                file: PathBuf::from("m.py"),
                line: 1,
            })
            .collect();
        let edges: Vec<CallEdge> = edges
            .iter()
            .map(|(src, tgt)| CallEdge {
                source_step_id: format!("m.{}", src),
                target_step_id: format!("m.{}", tgt),
                edge_kind: EdgeKind::Sequential,
                call_site_line: 1,
            })
            .collect();
        let mut graph = FlowGraph {
            flow: FlowRecord {
                flow_id: "m".to_string(),
                display_name: "m".to_string(),
                description: None,
                kind: FlowKind::Module,
            },
            entry_candidates: Vec::new(),
            steps,
            edges,
        };
        graph.entry_candidates = graph
            .steps
            .iter()
            .filter(|s| graph.in_degree(&s.qualified_id) == 0)
            .map(|s| s.qualified_id.clone())
            .collect();
        graph
    }

    #[test]
    fn clean_flow_produces_no_messages() {
        let validator = FlowValidator::new();
        let messages = validator.validate(&graph(&["a", "b"], &[("a", "b")]));
        assert!(messages.is_empty());
    }

    #[test]
    fn cycle_without_entry_is_a_warning() {
        let validator = FlowValidator::new();
        let messages = validator.validate(&graph(&["a", "b"], &[("a", "b"), ("b", "a")]));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, MessageLevel::Warning);
        assert!(messages[0].text.contains("no entry point"));
    }

    #[test]
    fn unreachable_step_is_a_warning() {
        // a -> b, plus c -> c: c has an incoming edge so it is not an entry
        // candidate, and nothing reaches it
        let validator = FlowValidator::new();
        let messages =
            validator.validate(&graph(&["a", "b", "c"], &[("a", "b"), ("c", "c")]));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("unreachable"));
    }

    #[test]
    fn empty_flow_is_informational() {
        let validator = FlowValidator::new();
        let messages = validator.validate(&graph(&[], &[]));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, MessageLevel::Info);
    }

    #[test]
    fn missing_description_is_informational() {
        let validator = FlowValidator::new();
        let mut g = graph(&["a"], &[]);
        g.steps[0].description = None;
        let messages = validator.validate(&g);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, MessageLevel::Info);
        assert!(messages[0].text.contains("no description"));
    }
}
