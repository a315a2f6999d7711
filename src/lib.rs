//! FlowDoc: business flow diagrams inferred from annotated Python code
//!
//! The engine statically analyzes `@flow` / `@step` decorated Python source,
//! resolves calls between steps across file boundaries with a two-pass
//! registry, and renders per-flow graphs as Mermaid, Graphviz, HTML, or JSON.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
