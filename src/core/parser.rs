use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::{FlowdocError, Result};

/// Python source reader backed by Tree-sitter
///
/// Produces one syntax tree per file. The analyzed code is never executed,
/// only its tree is read.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let python_language = tree_sitter_python::language();
        parser
            .set_language(&python_language)
            .map_err(|e| FlowdocError::Parser(format!("Failed to set Python language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Parse one file's content into a syntax tree
    ///
    /// A tree is returned even for malformed input; callers check
    /// [`first_error`] to decide whether to skip the file.
    pub fn parse(&mut self, content: &str) -> Result<Tree> {
        self.parser
            .parse(content, None)
            .ok_or_else(|| FlowdocError::Parser("Failed to parse Python source".to_string()))
    }
}

/// A parsed source file carried between pass 1 and pass 2
pub struct SourceFile {
    pub file: PathBuf,
    pub module_path: String,
    pub source: String,
    pub tree: Tree,
}

/// Locate the first ERROR or MISSING node, if the tree is malformed
///
/// Returns the 1-based line of the offending node.
pub fn first_error(root: Node) -> Option<usize> {
    if !root.has_error() {
        return None;
    }
    find_error_node(root).map(|node| node.start_position().row + 1)
}

fn find_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = find_error_node(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Convert a file path to a dotted module path relative to the source root
///
/// `src/orders/processor.py` under `src/` becomes `orders.processor`;
/// `__init__.py` maps to its package.
pub fn path_to_module(file: &Path, src_root: &Path) -> String {
    let relative = file.strip_prefix(src_root).unwrap_or(file);

    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }
    if parts.last().map(String::as_str) == Some("__init__") {
        parts.pop();
    }

    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_python() {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse("def f():\n    pass\n").unwrap();
        assert!(!tree.root_node().has_error());
        assert!(first_error(tree.root_node()).is_none());
    }

    #[test]
    fn reports_syntax_error_location() {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse("def f(:\n    pass\n").unwrap();
        assert!(tree.root_node().has_error());
        assert!(first_error(tree.root_node()).is_some());
    }

    #[test]
    fn module_path_from_nested_file() {
        let module = path_to_module(
            Path::new("/src/orders/processor.py"),
            Path::new("/src"),
        );
        assert_eq!(module, "orders.processor");
    }

    #[test]
    fn module_path_drops_init() {
        let module = path_to_module(Path::new("/src/orders/__init__.py"), Path::new("/src"));
        assert_eq!(module, "orders");
    }

    #[test]
    fn module_path_outside_root_falls_back_to_full_path() {
        let module = path_to_module(Path::new("elsewhere/billing.py"), Path::new("/src"));
        assert_eq!(module, "elsewhere.billing");
    }
}
