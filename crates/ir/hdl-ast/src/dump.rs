//! Indented textual tree dumps for debugging and snapshots

use std::fmt;

use crate::{NodeId, NodeKind, Tree};

/// Display adapter printing one node per line, children indented
pub struct TreeDump<'a> {
    tree: &'a Tree,
    root: NodeId,
}

impl<'a> TreeDump<'a> {
    pub(crate) fn new(tree: &'a Tree, root: NodeId) -> Self {
        Self { tree, root }
    }

    fn write_node(&self, formatter: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let kind = self.tree.kind(id);
        write!(formatter, "{:indent$}{}", "", kind.tag(), indent = depth * 2)?;
        match kind {
            NodeKind::Module { flavor, name, .. } => {
                write!(formatter, " {flavor} {}", self.tree.name(*name))?;
            }
            NodeKind::Assert { flavor, .. } => write!(formatter, " {flavor}")?,
            NodeKind::SenItem { edge, .. } => write!(formatter, " {edge}")?,
            NodeKind::Begin { name: Some(name), .. } | NodeKind::VarRef { name } => {
                write!(formatter, " {}", self.tree.name(*name))?;
            }
            NodeKind::Const { value, width } => write!(formatter, " {width}'h{value:x}")?,
            _ => {}
        }
        writeln!(formatter)?;
        for child in self.tree.children(id) {
            self.write_node(formatter, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeDump<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(formatter, self.root, 0)
    }
}
