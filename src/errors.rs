//! Carinata Error Handling
//!
//! One error type for every phase. Parse and codegen errors carry the spec source and a span
//! on the offending line so `miette` can render the snippet; I/O and configuration errors carry
//! only the path they concern.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::BlockKind;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// A named spec source, kept alongside the parser so errors can point into it.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Source context for text that did not come from a file (tests, stdin)
    pub fn anonymous(content: impl Into<String>) -> Self {
        Self::from_file("<spec>", content)
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// Span covering the given 1-based line, without its line terminator.
    pub fn line_span(&self, line: usize) -> SourceSpan {
        let mut offset = 0;
        for (index, text) in self.content.split('\n').enumerate() {
            if index + 1 == line {
                let len = text.trim_end_matches('\r').len();
                return SourceSpan::from(offset..offset + len);
            }
            offset += text.len() + 1;
        }
        unspanned()
    }
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// The single error type
#[derive(Debug)]
pub struct CarinataError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it happened; absent for errors not tied to spec text
    pub source_info: Option<SourceInfo>,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

/// All error kinds
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Parse errors
    #[error("cannot nest `{child}` inside `{parent}` (line {line}, indent {indent})")]
    InvalidNesting {
        parent: BlockKind,
        child: BlockKind,
        line: usize,
        indent: usize,
    },
    #[error("`let` on line {line} needs a name usable as an attribute, found {label:?}")]
    InvalidLabel { label: String, line: usize },

    // Codegen errors
    #[error("setup blocks must be `before` or `let`, found `{found}` (line {line})")]
    InvalidSetup { found: BlockKind, line: usize },

    // Environment errors
    #[error("{path}: {message}")]
    Io { path: String, message: String },
    #[error("invalid configuration in {path}: {message}")]
    Config { path: String, message: String },
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Generate,
    Io,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Parse => "Parse",
            ErrorCategory::Generate => "Codegen",
            ErrorCategory::Io => "IO",
            ErrorCategory::Config => "Config",
        };
        f.write_str(name)
    }
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidNesting { .. } | Self::InvalidLabel { .. } => ErrorCategory::Parse,
            Self::InvalidSetup { .. } => ErrorCategory::Generate,
            Self::Io { .. } => ErrorCategory::Io,
            Self::Config { .. } => ErrorCategory::Config,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::InvalidNesting { .. } => "invalid_nesting",
            Self::InvalidLabel { .. } => "invalid_label",
            Self::InvalidSetup { .. } => "invalid_setup",
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
        }
    }

    /// Source line the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::InvalidNesting { line, .. }
            | Self::InvalidLabel { line, .. }
            | Self::InvalidSetup { line, .. } => Some(*line),
            Self::Io { .. } | Self::Config { .. } => None,
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            Self::InvalidNesting { .. } => "block cannot be nested here",
            Self::InvalidLabel { .. } => "unusable name",
            Self::InvalidSetup { .. } => "not a setup block",
            Self::Io { .. } => "i/o failure",
            Self::Config { .. } => "bad configuration",
        }
    }
}

impl CarinataError {
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// An I/O failure concerning `path`.
    pub fn io(path: &Path, err: impl fmt::Display) -> Self {
        Self::unsourced(
            ErrorKind::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            },
            "io",
        )
    }

    /// A configuration file that could not be read or understood.
    pub fn config(path: &Path, err: impl fmt::Display) -> Self {
        let mut error = Self::unsourced(
            ErrorKind::Config {
                path: path.display().to_string(),
                message: err.to_string(),
            },
            "config",
        );
        error.diagnostic_info.help =
            Some("accepted keys: extension, output_dir, base_class, interpreter, line_markers, colors".into());
        error
    }

    fn unsourced(kind: ErrorKind, phase: &str) -> Self {
        let error_code = format!("carinata::{}::{}", phase, kind.code_suffix());
        Self {
            kind,
            source_info: None,
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

impl std::error::Error for CarinataError {}

impl fmt::Display for CarinataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.category(), self.kind)
    }
}

impl Diagnostic for CarinataError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let info = self.source_info.as_ref()?;
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.kind.primary_label().to_string()),
            info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_info
            .as_ref()
            .map(|info| &*info.source as &dyn miette::SourceCode)
    }
}

// ============================================================================
// CONTEXT-AWARE CONSTRUCTION
// ============================================================================

/// Context-aware error creation: each phase knows its source and how to label errors
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> CarinataError;

    /// Span of a 1-based source line
    fn span_for_line(&self, line: usize) -> SourceSpan;

    fn invalid_nesting(
        &self,
        parent: BlockKind,
        child: BlockKind,
        line: usize,
        indent: usize,
    ) -> CarinataError {
        let mut error = self.report(
            ErrorKind::InvalidNesting {
                parent,
                child,
                line,
                indent,
            },
            self.span_for_line(line),
        );
        error.diagnostic_info.help = Some(nesting_help(parent));
        error
    }

    fn invalid_label(&self, label: &str, line: usize) -> CarinataError {
        let mut error = self.report(
            ErrorKind::InvalidLabel {
                label: label.into(),
                line,
            },
            self.span_for_line(line),
        );
        error.diagnostic_info.help =
            Some("name the binding with a non-keyword identifier, e.g. `let \"client\": Client()`".into());
        error
    }

    /// Indicates a generator bug, never a user error.
    fn invalid_setup(&self, found: BlockKind, line: usize) -> CarinataError {
        let mut error = self.report(
            ErrorKind::InvalidSetup { found, line },
            self.span_for_line(line),
        );
        error.diagnostic_info.help =
            Some("This is an internal carinata error. Please report this as a bug.".into());
        error
    }
}

fn nesting_help(parent: BlockKind) -> String {
    let accepted = parent.valid_children();
    if accepted.is_empty() {
        return format!(
            "`{}` holds code only; dedent the block to close it first",
            parent
        );
    }
    let names: Vec<String> = accepted.iter().map(|k| format!("`{}`", k)).collect();
    format!("`{}` accepts only {}", parent, names.join(", "))
}

/// Error creation context bound to one spec source and one phase
pub struct SpecContext {
    pub source: SourceContext,
    pub phase: String,
}

impl SpecContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for SpecContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> CarinataError {
        let error_code = format!("carinata::{}::{}", self.phase, kind.code_suffix());

        CarinataError {
            kind,
            source_info: Some(SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            }),
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }

    fn span_for_line(&self, line: usize) -> SourceSpan {
        self.source.line_span(line)
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Prints a CarinataError with full miette diagnostics
pub fn print_error(error: CarinataError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_span_points_at_requested_line() {
        let source = SourceContext::anonymous("describe \"A\":\n    it \"b\": pass\n");
        let span = source.line_span(2);
        assert_eq!(span.offset(), 14);
        assert_eq!(span.len(), "    it \"b\": pass".len());
    }

    #[test]
    fn line_span_past_end_is_empty() {
        let source = SourceContext::anonymous("one line");
        assert_eq!(source.line_span(9).len(), 0);
    }

    #[test]
    fn nesting_error_renders_code_and_help() {
        let ctx = SpecContext::new(
            SourceContext::from_file("calc.carinata", "describe \"A\":\n    it \"x\":\n        it \"y\":\n"),
            "parse",
        );
        let err = ctx.invalid_nesting(BlockKind::It, BlockKind::It, 3, 8);
        assert_eq!(err.category(), ErrorCategory::Parse);
        assert_eq!(err.diagnostic_info.error_code, "carinata::parse::invalid_nesting");

        let output = format!("{:?}", miette::Report::new(err));
        assert!(output.contains("calc.carinata"));
        assert!(output.contains("holds code only"));
    }

    #[test]
    fn io_errors_have_no_source() {
        let err = CarinataError::io(Path::new("missing.carinata"), "not found");
        assert!(err.source_code().is_none());
        assert_eq!(err.to_string(), "IO error: missing.carinata: not found");
    }
}
