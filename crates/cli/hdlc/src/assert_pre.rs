//! `assert-pre` command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use hdl_ast::SerialDesign;
use hdl_driver::{Compilation, DriverOptions, Pipeline};
use std::path::PathBuf;
use tracing::info;

use crate::Emit;

pub struct Args {
    pub tree: PathBuf,
    pub config: Option<PathBuf>,
    pub dump_tree: Option<u32>,
    pub dump_dir: Option<PathBuf>,
    pub emit: Option<Emit>,
}

/// Run the default pipeline; returns whether the run passed
pub fn assert_pre(args: &Args) -> Result<bool> {
    let mut options = match &args.config {
        Some(path) => DriverOptions::load(path)?,
        None => DriverOptions::default(),
    };
    if let Some(level) = args.dump_tree {
        options.dump_tree = level;
    }
    if let Some(dir) = &args.dump_dir {
        options.dump_dir.clone_from(dir);
    }

    eprintln!("{} {}", "Binding".green().bold(), args.tree.display());
    let mut compilation = Compilation::load(&args.tree)?;
    let pipeline = Pipeline::with_default_passes(options);
    let report = pipeline
        .run(&mut compilation)
        .with_context(|| format!("pipeline failed on {}", args.tree.display()))?;

    info!(
        passes = ?report.passes,
        dumps = report.dumps.len(),
        diagnostics = compilation.diagnostics.len(),
        "pipeline report"
    );
    for path in &report.dumps {
        eprintln!("  {} {}", "Dumped:".bold(), path.display());
    }
    eprint!("{}", compilation.render_diagnostics());

    if let Some(emit) = args.emit {
        let root = compilation
            .tree
            .root()
            .context("design tree has no root")?;
        match emit {
            Emit::Dump => print!("{}", compilation.tree.dump(root)),
            Emit::Json => {
                let design = SerialDesign {
                    files: compilation.files.clone(),
                    root: compilation.tree.to_serial(root),
                };
                println!("{}", serde_json::to_string_pretty(&design)?);
            }
        }
    }

    let count = compilation.diagnostics.len();
    let failed = compilation.failed(pipeline.options());
    if count == 0 {
        eprintln!("{} all assertions clocked", "Success:".green().bold());
    } else if failed {
        eprintln!("{} {count} diagnostics reported", "Failed:".red().bold());
    } else {
        eprintln!("{} {count} diagnostics reported", "Warning:".yellow().bold());
    }
    Ok(!failed)
}
