use std::path::Path;

use tree_sitter::{Node, Tree};

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::model::{FlowKind, FlowRecord, StepRecord};

/// Recognized `@flow` decorator spellings
const FLOW_DECORATOR_NAMES: &[&str] = &["flow", "business_flow"];

/// Recognized `@step` decorator spellings
const STEP_DECORATOR_NAMES: &[&str] = &["step", "business_step", "flow_step"];

/// A `@flow`-decorated class found in one file
pub(crate) struct FlowDecl<'t> {
    pub class_name: String,
    /// The decorator expression node (identifier, attribute, or call)
    pub decorator: Node<'t>,
}

/// A `@step`-decorated callable found in one file
pub(crate) struct StepDecl<'t> {
    pub function_name: String,
    pub class_name: Option<String>,
    /// Whether the enclosing class carries a `@flow` decorator
    pub in_flow_class: bool,
    pub decorator: Node<'t>,
    pub definition: Node<'t>,
}

impl<'t> StepDecl<'t> {
    pub fn qualified_id(&self, module_path: &str) -> String {
        match &self.class_name {
            Some(class) => format!("{}.{}.{}", module_path, class, self.function_name),
            None => format!("{}.{}", module_path, self.function_name),
        }
    }

    /// The function body block, if the definition has one
    pub fn body(&self) -> Option<Node<'t>> {
        self.definition.child_by_field_name("body")
    }

    /// 1-based line of the function definition
    pub fn line(&self) -> usize {
        self.definition.start_position().row + 1
    }
}

/// Result of extracting one file
pub struct Extraction {
    pub steps: Vec<StepRecord>,
    pub flows: Vec<FlowRecord>,
}

/// Walk one file's tree and yield step/flow metadata records
///
/// Operates on a single file only; cross-file knowledge lives in the
/// registry. Qualified ids are built deterministically from module path +
/// enclosing class + function name, which is what makes cross-file
/// resolution possible without a shared symbol table built ahead of time.
pub fn extract(
    tree: &Tree,
    source: &str,
    module_path: &str,
    file: &Path,
    include_docstrings: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Extraction {
    let (flow_decls, step_decls) = scan(tree.root_node(), source);

    let flows = flow_decls
        .iter()
        .map(|decl| {
            let args = decorator_args(decl.decorator, source, file, diagnostics);
            FlowRecord {
                flow_id: format!("{}.{}", module_path, decl.class_name),
                display_name: args.name.unwrap_or_else(|| decl.class_name.clone()),
                description: args.description,
                kind: FlowKind::Class,
            }
        })
        .collect();

    let extracted: Vec<StepRecord> = step_decls
        .iter()
        .map(|decl| {
            let args = decorator_args(decl.decorator, source, file, diagnostics);
            let docstring = if include_docstrings {
                decl.body().and_then(|body| docstring_of(body, source))
            } else {
                None
            };
            let declaring_flow_id = match (&decl.class_name, decl.in_flow_class) {
                (Some(class), true) => Some(format!("{}.{}", module_path, class)),
                _ => None,
            };

            StepRecord {
                qualified_id: decl.qualified_id(module_path),
                display_name: args.name.unwrap_or_else(|| decl.function_name.clone()),
                description: args.description,
                docstring,
                declaring_flow_id,
                module_path: module_path.to_string(),
                class_name: decl.class_name.clone(),
                function_name: decl.function_name.clone(),
                file: file.to_path_buf(),
                line: decl.line(),
            }
        })
        .collect();

    // Python rebinding: a repeated definition in one file shadows the
    // earlier one, so the later record wins
    let mut steps: Vec<StepRecord> = Vec::new();
    for step in extracted {
        if let Some(existing) = steps
            .iter()
            .position(|s| s.qualified_id == step.qualified_id)
        {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::RedefinedStep,
                    format!(
                        "Step '{}' is defined more than once; keeping the definition at line {}",
                        step.qualified_id, step.line
                    ),
                )
                .with_file(file)
                .with_line(steps[existing].line),
            );
            steps[existing] = step;
        } else {
            steps.push(step);
        }
    }

    Extraction { steps, flows }
}

/// Find every annotated callable in a module tree
///
/// Covers top-level decorated functions and methods of top-level classes.
/// Function-local definitions are out of scope: a qualified id only encodes
/// module + class + function.
pub(crate) fn scan<'t>(root: Node<'t>, source: &str) -> (Vec<FlowDecl<'t>>, Vec<StepDecl<'t>>) {
    let mut flows = Vec::new();
    let mut steps = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "decorated_definition" => {
                let definition = match child.child_by_field_name("definition") {
                    Some(definition) => definition,
                    None => continue,
                };
                match definition.kind() {
                    "class_definition" => {
                        let flow_decorator =
                            find_decorator(child, source, FLOW_DECORATOR_NAMES);
                        scan_class(definition, source, flow_decorator, &mut flows, &mut steps);
                    }
                    "function_definition" => {
                        if let Some(decorator) =
                            find_decorator(child, source, STEP_DECORATOR_NAMES)
                        {
                            if let Some(name) = node_name(definition, source) {
                                steps.push(StepDecl {
                                    function_name: name,
                                    class_name: None,
                                    in_flow_class: false,
                                    decorator,
                                    definition,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
            "class_definition" => {
                scan_class(child, source, None, &mut flows, &mut steps);
            }
            _ => {}
        }
    }

    (flows, steps)
}

fn scan_class<'t>(
    class_node: Node<'t>,
    source: &str,
    flow_decorator: Option<Node<'t>>,
    flows: &mut Vec<FlowDecl<'t>>,
    steps: &mut Vec<StepDecl<'t>>,
) {
    let class_name = match node_name(class_node, source) {
        Some(name) => name,
        None => return,
    };

    if let Some(decorator) = flow_decorator {
        flows.push(FlowDecl {
            class_name: class_name.clone(),
            decorator,
        });
    }

    let body = match class_node.child_by_field_name("body") {
        Some(body) => body,
        None => return,
    };

    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        if member.kind() != "decorated_definition" {
            continue;
        }
        let definition = match member.child_by_field_name("definition") {
            Some(definition) if definition.kind() == "function_definition" => definition,
            _ => continue,
        };
        if let Some(decorator) = find_decorator(member, source, STEP_DECORATOR_NAMES) {
            if let Some(name) = node_name(definition, source) {
                steps.push(StepDecl {
                    function_name: name,
                    class_name: Some(class_name.clone()),
                    in_flow_class: flow_decorator.is_some(),
                    decorator,
                    definition,
                });
            }
        }
    }
}

/// Find the first decorator on a decorated_definition whose name is in `names`
///
/// Supports `@step`, `@step(...)`, and `@flowdoc.step(...)`.
fn find_decorator<'t>(
    decorated: Node<'t>,
    source: &str,
    names: &[&str],
) -> Option<Node<'t>> {
    let mut cursor = decorated.walk();
    for child in decorated.named_children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }
        let expr = child.named_child(0)?;
        if let Some(name) = decorator_name(expr, source) {
            if names.contains(&name.as_str()) {
                return Some(expr);
            }
        }
    }
    None
}

/// The trailing name of a decorator expression
fn decorator_name(expr: Node, source: &str) -> Option<String> {
    match expr.kind() {
        "identifier" => Some(node_text(expr, source)),
        "attribute" => expr
            .child_by_field_name("attribute")
            .map(|attr| node_text(attr, source)),
        "call" => expr
            .child_by_field_name("function")
            .and_then(|func| decorator_name(func, source)),
        _ => None,
    }
}

/// Keyword arguments read from a decorator call
#[derive(Default)]
struct DecoratorArgs {
    name: Option<String>,
    description: Option<String>,
}

/// Read `name=` and `description=` from a decorator call expression
///
/// Only literal argument values are supported. A non-literal value drops
/// that single attribute with a diagnostic; the step still registers.
fn decorator_args(
    expr: Node,
    source: &str,
    file: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) -> DecoratorArgs {
    let mut args = DecoratorArgs::default();

    if expr.kind() != "call" {
        return args;
    }
    let arguments = match expr.child_by_field_name("arguments") {
        Some(arguments) => arguments,
        None => return args,
    };

    let mut cursor = arguments.walk();
    for argument in arguments.named_children(&mut cursor) {
        if argument.kind() != "keyword_argument" {
            continue;
        }
        let key = match argument.child_by_field_name("name") {
            Some(key) => node_text(key, source),
            None => continue,
        };
        let value_node = match argument.child_by_field_name("value") {
            Some(value) => value,
            None => continue,
        };

        match literal_value(value_node, source) {
            Some(value) => match key.as_str() {
                "name" => args.name = Some(value),
                "description" => args.description = Some(value),
                _ => {}
            },
            None => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::NonLiteralArgument,
                        format!(
                            "Skipping dynamic decorator argument '{}': only literal values are supported",
                            key
                        ),
                    )
                    .with_file(file)
                    .with_line(value_node.start_position().row + 1),
                );
            }
        }
    }

    args
}

/// Evaluate a literal expression node, or None for anything dynamic
fn literal_value(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => string_literal_value(node, source),
        "integer" | "float" | "true" | "false" => Some(node_text(node, source)),
        _ => None,
    }
}

/// Inner text of a plain string literal
///
/// F-strings with interpolations are dynamic, not literals.
fn string_literal_value(node: Node, source: &str) -> Option<String> {
    if has_descendant_of_kind(node, "interpolation") {
        return None;
    }

    let raw = node_text(node, source);
    // Strip any prefix letters (r, b, u, f) before the opening quote
    let stripped = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for delimiter in ["\"\"\"", "'''", "\"", "'"] {
        if stripped.len() >= delimiter.len() * 2
            && stripped.starts_with(delimiter)
            && stripped.ends_with(delimiter)
        {
            return Some(stripped[delimiter.len()..stripped.len() - delimiter.len()].to_string());
        }
    }
    None
}

fn has_descendant_of_kind(node: Node, kind: &str) -> bool {
    if node.kind() == kind {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_descendant_of_kind(child, kind) {
            return true;
        }
    }
    false
}

/// Docstring of a function body: a string expression as the first statement
///
/// Captured verbatim apart from the quote delimiters; formatting for output
/// is deferred to rendering.
pub(crate) fn docstring_of(body: Node, source: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    string_literal_value(expr, source)
}

fn node_name(definition: Node, source: &str) -> Option<String> {
    definition
        .child_by_field_name("name")
        .map(|name| node_text(name, source))
}

fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
