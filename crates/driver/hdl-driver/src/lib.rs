//! Compilation driver
//!
//! Loads a serialized design tree, runs the pass pipeline over it and keeps
//! the diagnostics the passes report. Tree dumps and consistency checks after
//! each pass are governed by [`DriverOptions`].

mod config;
mod error;
mod pipeline;

use anyhow::{Context, Result};
use hdl_ast::{SerialDesign, Tree};
use hdl_diagnostics::DiagnosticBag;
use hdl_span::SourceMap;
use std::path::Path;
use tracing::instrument;

pub use config::DriverOptions;
pub use error::{DriverError, DriverResult};
pub use pipeline::{AssertPrePass, Pass, Pipeline, PipelineReport};

/// A design being compiled
pub struct Compilation {
    /// Design tree
    pub tree: Tree,
    /// Files the tree's locations refer to
    pub files: SourceMap,
    /// Diagnostics reported so far
    pub diagnostics: DiagnosticBag,
}

impl Compilation {
    /// Start from an already parsed design
    #[must_use]
    pub fn from_design(design: &SerialDesign) -> Self {
        let (tree, files) = Tree::from_design(design);
        Self {
            tree,
            files,
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Parse a design from JSON text
    ///
    /// # Errors
    ///
    /// Fails if the text is not a valid serialized design.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let design: SerialDesign = serde_json::from_str(text)?;
        Ok(Self::from_design(&design))
    }

    /// Load a design from a JSON file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read design {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("failed to parse design {}", path.display()))
    }

    /// Whether the run should be reported as failed under `options`
    ///
    /// Errors always fail the run; other diagnostics only with
    /// `fatal_diagnostics`.
    #[must_use]
    pub fn failed(&self, options: &DriverOptions) -> bool {
        self.diagnostics.has_errors()
            || (options.fatal_diagnostics && !self.diagnostics.is_empty())
    }

    /// Diagnostics rendered against the design's files
    #[must_use]
    pub fn render_diagnostics(&self) -> String {
        self.diagnostics.render(&self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_diagnostics::{Category, DiagnosticSink};
    use hdl_span::FileSpan;
    use std::io::Write;

    const UNCLOCKED: &str = r#"{
        "files": [{ "name": "top.sv" }],
        "root": {
            "kind": "netlist",
            "modules": [{
                "kind": "module",
                "name": "top",
                "items": [{ "kind": "assert", "at": [12, 30], "prop": { "kind": "var_ref", "name": "ok" } }]
            }]
        }
    }"#;

    #[test]
    fn test_load_and_run() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(UNCLOCKED.as_bytes()).unwrap();
        let mut compilation = Compilation::load(file.path()).unwrap();
        let options = DriverOptions {
            check_tree: true,
            ..DriverOptions::default()
        };

        Pipeline::with_default_passes(options.clone())
            .run(&mut compilation)
            .unwrap();

        assert_eq!(compilation.diagnostics.len(), 1);
        assert!(compilation.failed(&options));
        assert_eq!(
            compilation.render_diagnostics(),
            "top.sv:12..30: Unsupported: Unclocked assertion\n"
        );
    }

    #[test]
    fn test_unsupported_diagnostics_need_fatal_option() {
        let mut compilation = Compilation::from_json(UNCLOCKED).unwrap();
        let options = DriverOptions {
            fatal_diagnostics: false,
            ..DriverOptions::default()
        };

        Pipeline::with_default_passes(options.clone())
            .run(&mut compilation)
            .unwrap();

        assert!(!compilation.failed(&options));
    }

    #[test]
    fn test_error_diagnostics_always_fail() {
        let mut compilation = Compilation::from_json(UNCLOCKED).unwrap();
        let options = DriverOptions {
            fatal_diagnostics: false,
            ..DriverOptions::default()
        };
        compilation
            .diagnostics
            .report(FileSpan::default(), Category::Error, "broken netlist");

        assert!(compilation.failed(&options));
    }

    #[test]
    fn test_malformed_design_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ \"root\": { \"kind\": \"bogus\" } }").unwrap();

        let error = Compilation::load(file.path()).err().unwrap();
        assert!(error.to_string().starts_with("failed to parse design"));
    }
}
