//! Clocking diagnostics reported while binding assertion clocks

use hdl_diagnostics::{Category, Diagnostic};
use hdl_span::FileSpan;
use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Recoverable clocking problems found on a single assertion
///
/// Both are reported and the pass carries on with a structurally valid tree.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ClockingError {
    /// Neither an explicit clock nor a scope default clock applies
    #[error("Unclocked assertion")]
    #[diagnostic(
        code(assert_pre::unclocked),
        help("declare a default clocking block in the enclosing module or clock the property")
    )]
    UnclockedAssertion {
        /// Location of the assertion
        span: FileSpan,
    },

    /// Several explicit clocks resolved within one assertion
    #[error("Only one explicit clock allowed per assertion")]
    #[diagnostic(code(assert_pre::multiple_clocks))]
    MultipleClocksPerAssertion {
        /// Location of the later explicit-clock wrapper
        span: FileSpan,
    },
}

impl ClockingError {
    /// Location of the offending node
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::UnclockedAssertion { span } | Self::MultipleClocksPerAssertion { span } => *span,
        }
    }

    /// Convert into a sink diagnostic in the `Unsupported` category
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.span(), Category::Unsupported, self.to_string());
        match MietteDiagnostic::code(self) {
            Some(code) => diagnostic.with_code(code.to_string()),
            None => diagnostic,
        }
    }
}
