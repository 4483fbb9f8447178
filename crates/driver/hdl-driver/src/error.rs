//! Pipeline failures

use hdl_ast::TreeError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for pipeline operations
pub type DriverResult<T> = Result<T, DriverError>;

/// A pipeline step that could not complete
#[derive(Debug, Error)]
pub enum DriverError {
    /// A pass hit a tree contract violation while rewriting
    #[error("pass `{pass}` failed: {source}")]
    Pass {
        /// Name of the failing pass
        pass: &'static str,
        /// Underlying tree error
        #[source]
        source: TreeError,
    },

    /// The consistency check after a pass found a broken tree
    #[error("tree check after `{pass}` failed: {source}")]
    Check {
        /// Name of the pass that ran last
        pass: &'static str,
        /// First inconsistency found
        #[source]
        source: TreeError,
    },

    /// A tree dump could not be written
    #[error("failed to write tree dump {}", .path.display())]
    Dump {
        /// Target file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
