//! Flow graph inference engine
//!
//! Discovers annotated callables across Python source files, resolves calls
//! between them (including across file boundaries), classifies each step's
//! role in the flow, and produces validated, renderable graph models. The
//! analyzed code is never executed; only its syntax tree is read.

mod assembler;
mod builder;
mod diagnostics;
mod discovery;
mod engine;
mod extractor;
mod model;
mod parser;
mod registry;
mod render;
mod validator;

pub use assembler::assemble;
pub use builder::build_edges;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use discovery::{discover_python_files, is_test_file};
pub use engine::{Engine, FlowAnalysis, GenerateOptions, ValidateOptions};
pub use extractor::{extract, Extraction};
pub use model::{
    BranchArm, CallEdge, EdgeKind, FlowGraph, FlowKind, FlowRecord, NodeShape, StepRecord,
};
pub use parser::{path_to_module, PythonParser, SourceFile};
pub use registry::{CallingContext, Resolution, StepRegistry};
pub use render::{
    create_renderer, DiagramRenderer, Direction, GraphvizRenderer, HtmlRenderer, JsonRenderer,
    MermaidRenderer, RenderOptions,
};
pub use validator::{FlowValidator, MessageLevel, ValidationMessage};
