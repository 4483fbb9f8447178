//! Ordered pass execution with post-pass dumps and checks

use hdl_ast::Tree;
use hdl_diagnostics::DiagnosticSink;
use std::path::PathBuf;
use tracing::{debug, info, info_span};

use crate::{Compilation, DriverError, DriverOptions, DriverResult};

/// A rewrite over the whole design tree
pub trait Pass {
    /// Name used for dump files and per-pass dump levels
    fn name(&self) -> &'static str;

    /// Dump level at which the tree is written after this pass
    fn dump_level(&self) -> u32 {
        3
    }

    /// Rewrite `tree`, reporting design problems to `sink`
    ///
    /// # Errors
    ///
    /// Returns an error only when the tree itself is unusable.
    fn run(&self, tree: &mut Tree, sink: &mut dyn DiagnosticSink) -> DriverResult<()>;
}

/// Binds clocks to assertions
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertPrePass;

impl Pass for AssertPrePass {
    fn name(&self) -> &'static str {
        hdl_assert_pre::PASS_NAME
    }

    fn dump_level(&self) -> u32 {
        hdl_assert_pre::DUMP_LEVEL
    }

    fn run(&self, tree: &mut Tree, sink: &mut dyn DiagnosticSink) -> DriverResult<()> {
        let stats = hdl_assert_pre::bind_assertion_clocks(tree, sink).map_err(|source| {
            DriverError::Pass {
                pass: self.name(),
                source,
            }
        })?;
        debug!(?stats, "assertpre finished");
        Ok(())
    }
}

/// What a pipeline run produced besides the rewritten tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Names of the passes run, in order
    pub passes: Vec<&'static str>,
    /// Dump files written
    pub dumps: Vec<PathBuf>,
}

/// Passes to run in order, plus the options governing dumps and checks
pub struct Pipeline {
    options: DriverOptions,
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    /// Empty pipeline
    #[must_use]
    pub fn new(options: DriverOptions) -> Self {
        Self {
            options,
            passes: Vec::new(),
        }
    }

    /// Pipeline holding the standard pass list
    #[must_use]
    pub fn with_default_passes(options: DriverOptions) -> Self {
        let mut pipeline = Self::new(options);
        pipeline.add_pass(AssertPrePass);
        pipeline
    }

    /// Append a pass
    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Run every pass over `compilation`, dumping and checking after each
    ///
    /// # Errors
    ///
    /// Stops at the first pass failure, failed check, or unwritable dump.
    pub fn run(&self, compilation: &mut Compilation) -> DriverResult<PipelineReport> {
        let mut report = PipelineReport::default();
        for (index, pass) in self.passes.iter().enumerate() {
            let _span = info_span!("pass", name = pass.name()).entered();
            pass.run(&mut compilation.tree, &mut compilation.diagnostics)?;
            report.passes.push(pass.name());
            if let Some(path) = self.dump_check_tree(&compilation.tree, index + 1, pass.as_ref())? {
                report.dumps.push(path);
            }
        }
        info!(
            passes = report.passes.len(),
            diagnostics = compilation.diagnostics.len(),
            "pipeline finished"
        );
        Ok(report)
    }

    /// Check the tree and write a dump when the pass's level is reached
    ///
    /// Returns the dump path if one was written.
    ///
    /// # Errors
    ///
    /// Fails if the check finds an inconsistency or the dump cannot be written.
    pub fn dump_check_tree(
        &self,
        tree: &Tree,
        index: usize,
        pass: &dyn Pass,
    ) -> DriverResult<Option<PathBuf>> {
        if self.options.check_tree {
            tree.check().map_err(|source| DriverError::Check {
                pass: pass.name(),
                source,
            })?;
        }

        if self.options.level_for(pass.name()) < pass.dump_level() {
            return Ok(None);
        }
        let Some(root) = tree.root() else {
            return Ok(None);
        };

        let path = self
            .options
            .dump_dir
            .join(format!("{index:03}_{}.tree", pass.name()));
        std::fs::create_dir_all(&self.options.dump_dir)
            .and_then(|()| std::fs::write(&path, tree.dump(root).to_string()))
            .map_err(|source| DriverError::Dump {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "tree dumped");
        Ok(Some(path))
    }
}
