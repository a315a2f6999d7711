use std::collections::HashMap;

use crate::error::{FlowdocError, Result};

use super::model::StepRecord;

/// Scope of the step a call site sits in, used for name resolution
#[derive(Debug, Clone)]
pub struct CallingContext {
    /// Dotted module path of the calling step's file
    pub module_scope: String,
    /// Qualified class id, when the calling step is a method
    pub class_scope: Option<String>,
}

impl CallingContext {
    pub fn of(step: &StepRecord) -> Self {
        Self {
            module_scope: step.module_path.clone(),
            class_scope: step.class_scope(),
        }
    }
}

/// Outcome of resolving a call-site name against the registry
///
/// `NotFound` and `Ambiguous` are not errors: the call site simply produces
/// no edge and the caller records an informational diagnostic.
#[derive(Debug)]
pub enum Resolution<'r> {
    Resolved(&'r StepRecord),
    NotFound,
    /// More than one module defines a step with this trailing name
    Ambiguous(Vec<String>),
}

/// Mapping from qualified identifier to step record
///
/// Populated incrementally during pass 1; read-only during pass 2.
/// Insertion order is preserved so every downstream listing is stable.
#[derive(Default)]
pub struct StepRegistry {
    steps: HashMap<String, StepRecord>,
    order: Vec<String>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step from pass 1 extraction
    ///
    /// A duplicate qualified id means discovery fed the same file twice.
    /// That is a caller error, fatal to the run.
    pub fn register(&mut self, step: StepRecord) -> Result<()> {
        if self.steps.contains_key(&step.qualified_id) {
            return Err(FlowdocError::DuplicateStep {
                qualified_id: step.qualified_id,
                file: step.file,
            });
        }
        self.order.push(step.qualified_id.clone());
        self.steps.insert(step.qualified_id.clone(), step);
        Ok(())
    }

    pub fn get(&self, qualified_id: &str) -> Option<&StepRecord> {
        self.steps.get(qualified_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered steps in registration order
    pub fn iter(&self) -> impl Iterator<Item = &StepRecord> {
        self.order.iter().filter_map(|id| self.steps.get(id))
    }

    /// Resolve a call-site name against the registry
    ///
    /// Resolution order, each a deterministic non-backtracking lookup:
    /// 1. class scope (method call through self)
    /// 2. module scope (bare call, same module)
    /// 3. any registered id whose trailing component matches, only if unique
    ///    across the whole registry
    ///
    /// Precision over recall: an ambiguous bare name resolves to nothing
    /// rather than guessing.
    pub fn resolve(&self, name_hint: &str, context: &CallingContext) -> Resolution<'_> {
        if let Some(class_scope) = &context.class_scope {
            if let Some(step) = self.steps.get(&format!("{}.{}", class_scope, name_hint)) {
                return Resolution::Resolved(step);
            }
        }

        if let Some(step) = self
            .steps
            .get(&format!("{}.{}", context.module_scope, name_hint))
        {
            return Resolution::Resolved(step);
        }

        let suffix = format!(".{}", name_hint);
        let mut matches: Vec<&String> = self
            .order
            .iter()
            .filter(|id| id.ends_with(&suffix))
            .collect();

        match matches.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Resolved(&self.steps[matches.remove(0)]),
            _ => {
                // Sorted so the diagnostic text is registration-order
                // independent
                let mut candidates: Vec<String> = matches.into_iter().cloned().collect();
                candidates.sort();
                Resolution::Ambiguous(candidates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn step(module: &str, class: Option<&str>, func: &str) -> StepRecord {
        let qualified_id = match class {
            Some(class) => format!("{}.{}.{}", module, class, func),
            None => format!("{}.{}", module, func),
        };
        StepRecord {
            qualified_id,
            display_name: func.to_string(),
            description: None,
            docstring: None,
            declaring_flow_id: None,
            module_path: module.to_string(),
            class_name: class.map(String::from),
            function_name: func.to_string(),
            file: PathBuf::from(format!("{}.py", module)),
            line: 1,
        }
    }

    fn context(module: &str, class: Option<&str>) -> CallingContext {
        CallingContext {
            module_scope: module.to_string(),
            class_scope: class.map(|c| format!("{}.{}", module, c)),
        }
    }

    #[test]
    fn duplicate_registration_is_fatal() {
        let mut registry = StepRegistry::new();
        registry.register(step("orders", None, "charge")).unwrap();
        let err = registry.register(step("orders", None, "charge"));
        assert!(matches!(err, Err(FlowdocError::DuplicateStep { .. })));
    }

    #[test]
    fn class_scope_wins_over_module_scope() {
        let mut registry = StepRegistry::new();
        registry.register(step("orders", None, "validate")).unwrap();
        registry
            .register(step("orders", Some("Processor"), "validate"))
            .unwrap();

        let resolution = registry.resolve("validate", &context("orders", Some("Processor")));
        match resolution {
            Resolution::Resolved(found) => {
                assert_eq!(found.qualified_id, "orders.Processor.validate")
            }
            other => panic!("expected class-local resolution, got {:?}", other),
        }
    }

    #[test]
    fn module_scope_before_global() {
        let mut registry = StepRegistry::new();
        registry.register(step("billing", None, "charge")).unwrap();
        registry.register(step("orders", None, "charge")).unwrap();

        let resolution = registry.resolve("charge", &context("orders", None));
        match resolution {
            Resolution::Resolved(found) => assert_eq!(found.qualified_id, "orders.charge"),
            other => panic!("expected module-local resolution, got {:?}", other),
        }
    }

    #[test]
    fn unique_trailing_name_resolves_across_files() {
        let mut registry = StepRegistry::new();
        registry.register(step("orders", None, "receive_order")).unwrap();
        registry.register(step("billing", None, "charge")).unwrap();

        let resolution = registry.resolve("charge", &context("orders", None));
        match resolution {
            Resolution::Resolved(found) => assert_eq!(found.qualified_id, "billing.charge"),
            other => panic!("expected cross-module resolution, got {:?}", other),
        }
    }

    #[test]
    fn ambiguous_bare_name_resolves_to_nothing() {
        let mut registry = StepRegistry::new();
        registry.register(step("billing", None, "charge")).unwrap();
        registry.register(step("legacy", None, "charge")).unwrap();

        let resolution = registry.resolve("charge", &context("orders", None));
        match resolution {
            Resolution::Ambiguous(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn ambiguous_candidates_are_sorted() {
        let mut registry = StepRegistry::new();
        registry.register(step("legacy", None, "charge")).unwrap();
        registry.register(step("billing", None, "charge")).unwrap();

        match registry.resolve("charge", &context("orders", None)) {
            Resolution::Ambiguous(candidates) => {
                assert_eq!(candidates, vec!["billing.charge", "legacy.charge"])
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = StepRegistry::new();
        assert!(matches!(
            registry.resolve("nothing", &context("orders", None)),
            Resolution::NotFound
        ));
    }
}
