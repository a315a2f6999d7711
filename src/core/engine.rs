use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result as FlowdocResult;

use super::assembler;
use super::builder;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::discovery;
use super::extractor;
use super::model::{FlowGraph, FlowRecord};
use super::parser::{first_error, path_to_module, PythonParser, SourceFile};
use super::registry::StepRegistry;
use super::render::{create_renderer, Direction, RenderOptions};
use super::validator::{FlowValidator, MessageLevel};

/// Result of one two-pass engine run
///
/// A run with zero fatal errors always yields a renderable mapping, even when
/// diagnostics are non-empty. Whether non-empty diagnostics should fail a
/// build is the caller's policy.
pub struct FlowAnalysis {
    pub graphs: BTreeMap<String, FlowGraph>,
    pub diagnostics: Vec<Diagnostic>,
    pub files_analyzed: usize,
    pub files_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub format: Option<String>,
    pub output: Option<PathBuf>,
    pub direction: Option<String>,
    pub src_root: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub docstrings: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub strict: bool,
    pub src_root: Option<PathBuf>,
    pub exclude: Vec<String>,
}

/// Main orchestration engine for FlowDoc
///
/// Drives the two-pass run: pass 1 parses and registers every file before
/// pass 2 resolves a single edge, so cross-file resolution never depends on
/// discovery order.
pub struct Engine {
    config: Config,
    parser: PythonParser,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);

        let parser = PythonParser::new()?;
        Ok(Self { config, parser })
    }

    /// Run the inference engine over a source path
    pub fn analyze(
        &mut self,
        source: &Path,
        src_root: Option<&Path>,
        extra_exclude: &[String],
    ) -> FlowdocResult<FlowAnalysis> {
        let mut exclude = self.config.discovery.exclude.clone();
        exclude.extend_from_slice(extra_exclude);

        let files = discovery::discover_python_files(source, &exclude)?;
        debug!("Discovered {} Python file(s)", files.len());

        let src_root = self.resolve_src_root(source, src_root);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut registry = StepRegistry::new();
        let mut flows: Vec<FlowRecord> = Vec::new();
        let mut sources: Vec<SourceFile> = Vec::new();

        // Pass 1: parse and register every file before resolving anything
        for file in &files {
            let content = match std::fs::read_to_string(file) {
                Ok(content) => content,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::UnreadableFile,
                            format!("Cannot read file: {}", e),
                        )
                        .with_file(file),
                    );
                    continue;
                }
            };

            let tree = self.parser.parse(&content)?;
            if let Some(line) = first_error(tree.root_node()) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        format!("Cannot parse {}: invalid syntax", file.display()),
                    )
                    .with_file(file)
                    .with_line(line),
                );
                continue;
            }

            let module_path = path_to_module(file, &src_root);
            let extraction = extractor::extract(
                &tree,
                &content,
                &module_path,
                file,
                self.config.discovery.include_docstrings,
                &mut diagnostics,
            );
            for step in extraction.steps {
                registry.register(step)?;
            }
            flows.extend(extraction.flows);
            sources.push(SourceFile {
                file: file.clone(),
                module_path,
                source: content,
                tree,
            });
        }

        // Pass 2: resolve call edges against the now-complete registry
        let mut edges = Vec::new();
        for parsed in &sources {
            let (_, step_decls) = extractor::scan(parsed.tree.root_node(), &parsed.source);
            for decl in step_decls {
                let qualified_id = decl.qualified_id(&parsed.module_path);
                if let (Some(step), Some(body)) = (registry.get(&qualified_id), decl.body()) {
                    // A shadowed redefinition registers only its surviving
                    // definition; skip the bodies that lost the rebinding
                    if step.line != decl.line() {
                        continue;
                    }
                    edges.extend(builder::build_edges(
                        step,
                        body,
                        &parsed.source,
                        &registry,
                        &mut diagnostics,
                    ));
                }
            }
        }

        let graphs = assembler::assemble(&registry, &flows, edges, &mut diagnostics);

        Ok(FlowAnalysis {
            graphs,
            diagnostics,
            files_analyzed: sources.len(),
            files_skipped: files.len() - sources.len(),
        })
    }

    /// Generate flow diagrams from Python source files
    pub async fn generate(&mut self, source: PathBuf, options: GenerateOptions) -> Result<()> {
        let format = options
            .format
            .unwrap_or_else(|| self.config.output.format.clone());
        let direction = options
            .direction
            .unwrap_or_else(|| self.config.output.direction.clone());

        if options.docstrings && matches!(format.as_str(), "png" | "pdf") {
            anyhow::bail!(
                "--docstrings is not supported with {} output (no tooltip support). \
                 Use --format svg, --format html, or --format dot instead.",
                format.to_uppercase()
            );
        }

        let renderer = create_renderer(
            &format,
            RenderOptions {
                direction: Direction::parse(&direction)?,
                include_docstrings: options.docstrings,
            },
        )?;

        info!("Analyzing flows in {}", source.display());
        let analysis = self.analyze(&source, options.src_root.as_deref(), &options.exclude)?;
        self.log_diagnostics(&analysis);

        if analysis.graphs.is_empty() {
            anyhow::bail!("No flows found in the specified source.");
        }

        if options.output.is_some() && analysis.graphs.len() > 1 {
            warn!(
                "--output given but {} flows were found; each write overwrites the last",
                analysis.graphs.len()
            );
        }

        for graph in analysis.graphs.values() {
            let output_path = match &options.output {
                Some(path) => path.clone(),
                None => PathBuf::from(format!(
                    "{}.{}",
                    slugify(&graph.flow.display_name),
                    renderer.file_extension()
                )),
            };

            let bytes = renderer.render(graph)?;
            std::fs::write(&output_path, bytes)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output_path.display(), e))?;
            info!("Generated: {}", output_path.display());
        }

        Ok(())
    }

    /// Validate flow consistency in Python source files
    pub async fn validate(&mut self, source: PathBuf, options: ValidateOptions) -> Result<()> {
        let analysis = self.analyze(&source, options.src_root.as_deref(), &options.exclude)?;
        self.log_diagnostics(&analysis);

        if analysis.graphs.is_empty() {
            anyhow::bail!("No flows found in the specified source.");
        }

        let validator = FlowValidator::new();
        let mut has_warnings = false;

        for graph in analysis.graphs.values() {
            let messages = validator.validate(graph);
            if messages.is_empty() {
                continue;
            }
            println!("\n{}:", graph.flow.display_name);
            for message in messages {
                let prefix = match message.level {
                    MessageLevel::Warning => {
                        has_warnings = true;
                        "WARNING"
                    }
                    MessageLevel::Info => "INFO",
                };
                println!("  [{}] {}", prefix, message.text);
            }
        }

        if !has_warnings {
            println!("Validated {} flow(s) successfully.", analysis.graphs.len());
        }

        if options.strict && has_warnings {
            anyhow::bail!("Validation produced warnings (strict mode)");
        }

        Ok(())
    }

    fn resolve_src_root(&self, source: &Path, cli_src_root: Option<&Path>) -> PathBuf {
        if let Some(root) = cli_src_root {
            return root.to_path_buf();
        }
        if let Some(root) = &self.config.discovery.src_root {
            return root.clone();
        }
        if source.is_file() {
            source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source.to_path_buf())
        } else {
            source.to_path_buf()
        }
    }

    fn log_diagnostics(&self, analysis: &FlowAnalysis) {
        if analysis.files_skipped > 0 {
            warn!(
                "Skipped {} of {} file(s)",
                analysis.files_skipped,
                analysis.files_analyzed + analysis.files_skipped
            );
        }
        for diagnostic in &analysis.diagnostics {
            if diagnostic.is_warning() {
                warn!("{}", diagnostic);
            } else {
                info!("{}", diagnostic);
            }
        }
    }
}

/// Convert a flow name to a filesystem-safe slug
fn slugify(name: &str) -> String {
    // unwrap: patterns are compile-time constants
    let strip = Regex::new(r"[^\w\s-]").unwrap();
    let spaces = Regex::new(r"[\s-]+").unwrap();

    let slug = name.to_lowercase();
    let slug = strip.replace_all(&slug, "");
    let slug = spaces.replace_all(&slug, "_");
    slug.trim_matches('_').to_string()
}
