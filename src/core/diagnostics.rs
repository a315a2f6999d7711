use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Category of a soft failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A file failed to parse and was skipped
    SyntaxError,
    /// A file could not be read and was skipped
    UnreadableFile,
    /// A call site matched no registered step
    UnresolvedCall,
    /// A bare name matched steps in more than one module
    AmbiguousCall,
    /// A decorator argument was not a literal and the attribute was dropped
    NonLiteralArgument,
    /// The same qualified id was defined more than once in one file; the
    /// later definition wins, as Python rebinding does
    RedefinedStep,
    /// An edge crossed flow boundaries and was dropped at assembly
    CrossFlowEdge,
}

/// Structured record of a recoverable problem
///
/// Collected and returned alongside the graph mapping rather than thrown, so
/// callers decide whether to log, display, or ignore them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: Option<PathBuf>,
    /// 1-based line, when a specific location is known
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            kind,
            message: message.into(),
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Whether the diagnostic warrants a warning-level log line
    pub fn is_warning(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::SyntaxError | DiagnosticKind::UnreadableFile
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}:{}: {}", file.display(), line, self.message)
            }
            (Some(file), None) => write!(f, "{}: {}", file.display(), self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}
