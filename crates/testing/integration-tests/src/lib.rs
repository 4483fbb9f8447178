//! Integration test utilities for the HDL passes

use anyhow::Result;
use hdl_driver::{Compilation, DriverOptions, Pipeline, PipelineReport};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory holding the JSON design fixtures
#[must_use]
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// A fixture design run through the default pipeline
pub struct TestRun {
    /// Compilation after the pipeline
    pub compilation: Compilation,
    /// Passes run and dumps written
    pub report: PipelineReport,
    /// Options the pipeline ran with
    pub options: DriverOptions,
    /// Dump directory, removed on drop
    pub dump_dir: TempDir,
}

impl TestRun {
    /// Load `<name>.json` from the fixtures and run the default pipeline
    ///
    /// Dumps go to a fresh temporary directory at `dump_tree` level.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture cannot be loaded or the pipeline fails.
    pub fn fixture(name: &str, dump_tree: u32) -> Result<Self> {
        let dump_dir = tempfile::tempdir()?;
        let options = DriverOptions {
            dump_tree,
            dump_dir: dump_dir.path().to_path_buf(),
            ..DriverOptions::default()
        };
        let mut compilation = Compilation::load(fixtures_dir().join(format!("{name}.json")))?;
        let report = Pipeline::with_default_passes(options.clone()).run(&mut compilation)?;
        Ok(Self {
            compilation,
            report,
            options,
            dump_dir,
        })
    }

    /// Dump of the whole rewritten tree
    #[must_use]
    pub fn dump(&self) -> String {
        let tree = &self.compilation.tree;
        tree.root()
            .map(|root| tree.dump(root).to_string())
            .unwrap_or_default()
    }

    /// Rendered diagnostic texts in report order
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.compilation
            .diagnostics
            .diagnostics()
            .iter()
            .map(|diag| diag.text())
            .collect()
    }
}
