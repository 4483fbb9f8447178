//! Diagnostic collection and rendering for elaboration passes
//!
//! Passes never print or abort on their own. They hand every finding to a
//! [`DiagnosticSink`]; whether a reported diagnostic is fatal is decided by
//! whoever owns the sink.

use derive_more::Display;
use hdl_span::{FileId, FileSpan, SourceMap};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use codespan_reporting;

/// Diagnostic category, printed in front of the message
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Construct is legal but not handled by the elaborator
    Unsupported,
    /// Hard error in the design
    Error,
    /// Suspicious but accepted construct
    Warning,
}

/// A single reported diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Location of the offending node
    pub span: FileSpan,
    /// Category of the finding
    pub category: Category,
    /// Human-readable message, without the category prefix
    pub message: String,
    /// Stable machine-readable code, e.g. `assert_pre::unclocked`
    pub code: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic without a code
    #[must_use]
    pub fn new(span: FileSpan, category: Category, message: impl Into<String>) -> Self {
        Self {
            span,
            category,
            message: message.into(),
            code: None,
        }
    }

    /// Attach a stable code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Message with its category prefix, e.g. `Unsupported: Unclocked assertion`
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}: {}", self.category, self.message)
    }

    /// Convert to a codespan diagnostic pointing into `file_id`
    #[must_use]
    pub fn to_codespan(&self, file_id: usize) -> codespan_reporting::diagnostic::Diagnostic<usize> {
        use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label};

        let base = match self.category {
            Category::Unsupported | Category::Error => CsDiagnostic::error(),
            Category::Warning => CsDiagnostic::warning(),
        };
        let mut diag = base
            .with_message(self.text())
            .with_labels(vec![Label::primary(file_id, self.span.range())]);
        if let Some(code) = &self.code {
            diag = diag.with_code(code.clone());
        }
        diag
    }
}

/// Receiver for diagnostics produced by a pass
pub trait DiagnosticSink {
    /// Record a fully built diagnostic
    fn emit(&mut self, diagnostic: Diagnostic);

    /// Record a diagnostic from its parts
    fn report(&mut self, span: FileSpan, category: Category, message: &str) {
        self.emit(Diagnostic::new(span, category, message));
    }
}

/// Ordered collection of reported diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Create an empty bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics in report order
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all diagnostics
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Number of diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether nothing was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics carrying `code`
    #[must_use]
    pub fn count_code(&self, code: &str) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.code.as_deref() == Some(code))
            .count()
    }

    /// Whether any diagnostic is a hard error
    ///
    /// `Unsupported` and `Warning` findings do not count; whether they fail a
    /// run is the caller's policy.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.category == Category::Error)
    }

    /// Render every diagnostic as text
    ///
    /// Files with known source text get rustc-style snippets through
    /// codespan; the rest fall back to a single `name:offsets: message` line.
    #[must_use]
    pub fn render(&self, sources: &SourceMap) -> String {
        use codespan_reporting::files::SimpleFiles;
        use codespan_reporting::term;

        let mut files = SimpleFiles::new();
        let mut file_ids: FxHashMap<FileId, usize> = FxHashMap::default();
        for (id, source) in sources.iter() {
            if let Some(text) = &source.text {
                file_ids.insert(id, files.add(source.name.clone(), text.clone()));
            }
        }

        let config = term::Config::default();
        let mut out = String::new();
        for diag in &self.diagnostics {
            if let Some(&file_id) = file_ids.get(&diag.span.file) {
                let mut buffer = Vec::new();
                #[allow(deprecated)]
                let rendered = term::emit(&mut buffer, &config, &files, &diag.to_codespan(file_id));
                if rendered.is_ok() {
                    out.push_str(&String::from_utf8_lossy(&buffer));
                    continue;
                }
            }
            out.push_str(&format!(
                "{}:{}: {}\n",
                sources.name(diag.span.file),
                diag.span.span,
                diag.text()
            ));
        }
        out
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
