use tree_sitter::Node;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::model::{BranchArm, CallEdge, EdgeKind, StepRecord};
use super::registry::{CallingContext, Resolution, StepRegistry};

/// A call site matching one of the recognized syntactic shapes
struct CallSite {
    /// Textual callee name passed to the registry
    name_hint: String,
    /// Conditional arm the call sits in, if any
    branch: Option<BranchArm>,
    /// 1-based line of the call expression
    line: usize,
}

/// Walk a step's body once and emit resolved call edges
///
/// Only two call shapes are candidates: `self.name(...)` and bare
/// `name(...)`. Calls on arbitrary objects, through subscripts, or on
/// computed expressions are deliberate non-matches; the engine omits an edge
/// rather than guess (awaited calls of either shape still count).
///
/// Branch structure of `if`/`elif`/`else` statements only tags edges as
/// conditional alternatives. It never changes shape classification, which is
/// plain out-degree regardless of nesting depth.
pub fn build_edges(
    step: &StepRecord,
    body: Node,
    source: &str,
    registry: &StepRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<CallEdge> {
    let mut sites = Vec::new();
    collect_calls(body, source, None, &mut sites);

    let context = CallingContext::of(step);
    let mut edges: Vec<CallEdge> = Vec::new();

    for site in sites {
        let target = match registry.resolve(&site.name_hint, &context) {
            Resolution::Resolved(target) => target,
            Resolution::NotFound => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnresolvedCall,
                        format!(
                            "Call to '{}' in step '{}' matches no registered step",
                            site.name_hint, step.qualified_id
                        ),
                    )
                    .with_file(&step.file)
                    .with_line(site.line),
                );
                continue;
            }
            Resolution::Ambiguous(candidates) => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::AmbiguousCall,
                        format!(
                            "Call to '{}' in step '{}' is ambiguous ({}); no edge emitted",
                            site.name_hint,
                            step.qualified_id,
                            candidates.join(", ")
                        ),
                    )
                    .with_file(&step.file)
                    .with_line(site.line),
                );
                continue;
            }
        };

        // Deduplicate by (source, target), keeping the earliest call site
        if edges
            .iter()
            .any(|edge| edge.target_step_id == target.qualified_id)
        {
            continue;
        }

        edges.push(CallEdge {
            source_step_id: step.qualified_id.clone(),
            target_step_id: target.qualified_id.clone(),
            edge_kind: match site.branch {
                Some(arm) => EdgeKind::ConditionalBranch(arm),
                None => EdgeKind::Sequential,
            },
            call_site_line: site.line,
        });
    }

    edges
}

/// Recursive walk collecting candidate call expressions in source order
fn collect_calls(node: Node, source: &str, branch: Option<BranchArm>, out: &mut Vec<CallSite>) {
    match node.kind() {
        "call" => {
            if let Some(name_hint) = callee_name(node, source) {
                out.push(CallSite {
                    name_hint,
                    branch,
                    line: node.start_position().row + 1,
                });
            }
            // Nested calls in the function position or in arguments are
            // still candidates: b(order).save() records the call to b
            if let Some(function) = node.child_by_field_name("function") {
                collect_calls(function, source, branch, out);
            }
            if let Some(arguments) = node.child_by_field_name("arguments") {
                collect_calls(arguments, source, branch, out);
            }
        }
        "if_statement" => {
            if let Some(condition) = node.child_by_field_name("condition") {
                collect_calls(condition, source, branch, out);
            }
            if let Some(consequence) = node.child_by_field_name("consequence") {
                collect_calls(consequence, source, Some(BranchArm::Then), out);
            }
            let mut cursor = node.walk();
            for alternative in node.children_by_field_name("alternative", &mut cursor) {
                match alternative.kind() {
                    "elif_clause" => {
                        if let Some(condition) = alternative.child_by_field_name("condition") {
                            collect_calls(condition, source, branch, out);
                        }
                        if let Some(consequence) =
                            alternative.child_by_field_name("consequence")
                        {
                            collect_calls(consequence, source, Some(BranchArm::Then), out);
                        }
                    }
                    "else_clause" => {
                        if let Some(body) = alternative.child_by_field_name("body") {
                            collect_calls(body, source, Some(BranchArm::Else), out);
                        }
                    }
                    _ => {}
                }
            }
        }
        // Nested defs have their own step identity; never attribute their
        // calls to the enclosing step
        "function_definition" | "class_definition" => {}
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_calls(child, source, branch, out);
            }
        }
    }
}

/// Callee name for recognized shapes, None for everything else
fn callee_name(call: Node, source: &str) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        // Bare call: other_function()
        "identifier" => Some(node_text(function, source)),
        // Method call on self: self.other_method()
        "attribute" => {
            let object = function.child_by_field_name("object")?;
            if object.kind() == "identifier" && node_text(object, source) == "self" {
                function
                    .child_by_field_name("attribute")
                    .map(|attr| node_text(attr, source))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
