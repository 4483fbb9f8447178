//! Traversal binding clocks to assertions

use hdl_ast::{NodeClass, NodeId, NodeKind, Tree, TreeResult};
use hdl_diagnostics::DiagnosticSink;
use tracing::{debug, trace};

use crate::{ClockingError, PassStats};

/// Single-use visitor performing one clock-binding traversal
pub struct AssertPre<'a> {
    tree: &'a mut Tree,
    sink: &'a mut dyn DiagnosticSink,
    /// Default sensitivity item from a clocking block; reset per scope
    default_clock: Option<NodeId>,
    /// Last explicit sensitivity item seen inside the current assertion
    pending_clock: Option<NodeId>,
    /// Removed nodes, reclaimed once the traversal is over
    deferred: Vec<NodeId>,
    stats: PassStats,
}

impl<'a> AssertPre<'a> {
    /// Create a visitor over `tree` reporting into `sink`
    pub fn new(tree: &'a mut Tree, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            tree,
            sink,
            default_clock: None,
            pending_clock: None,
            deferred: Vec::new(),
            stats: PassStats::default(),
        }
    }

    /// Traverse from `root`, then reclaim every removed node
    ///
    /// # Errors
    ///
    /// Fails if the tree violates its ownership contract during a rewrite.
    pub fn run(mut self, root: NodeId) -> TreeResult<PassStats> {
        self.visit(root)?;
        self.stats.reclaimed = self.tree.reclaim(std::mem::take(&mut self.deferred))?;
        Ok(self.stats)
    }

    fn visit(&mut self, id: NodeId) -> TreeResult<()> {
        match self.tree.kind(id).class() {
            NodeClass::Scope => self.visit_scope(id),
            NodeClass::ClockingDecl => self.visit_clocking(id),
            NodeClass::ClockedWrapper => self.visit_clocked(id),
            NodeClass::Assertion => self.visit_assertion(id),
            NodeClass::Other => self.iterate_children(id),
        }
    }

    /// Visit a snapshot of the children, so spliced-in replacements are not revisited
    fn iterate_children(&mut self, id: NodeId) -> TreeResult<()> {
        for child in self.tree.children(id) {
            self.visit(child)?;
        }
        Ok(())
    }

    fn visit_scope(&mut self, id: NodeId) -> TreeResult<()> {
        if self.default_clock.take().is_some() {
            debug!(scope = ?id, "nested scope starts without the enclosing default clock");
        }
        self.iterate_children(id)?;
        self.default_clock = None;
        Ok(())
    }

    fn visit_clocking(&mut self, id: NodeId) -> TreeResult<()> {
        let NodeKind::Clocking { senses, body } = self.tree.kind(id) else {
            return Ok(());
        };
        let (senses, body) = (*senses, body.clone());
        trace!(clocking = ?id, "new default clock");
        self.default_clock = Some(senses);

        for stmt in body {
            self.visit(stmt)?;
        }

        let body = match self.tree.kind_mut(id) {
            NodeKind::Clocking { body, .. } => std::mem::take(body),
            _ => Vec::new(),
        };
        self.tree.replace_with(id, &body)?;
        self.deferred.push(id);
        self.stats.clocking_blocks += 1;
        Ok(())
    }

    fn visit_assertion(&mut self, id: NodeId) -> TreeResult<()> {
        if matches!(self.tree.kind(id), NodeKind::Assert { sentree: Some(_), .. }) {
            self.stats.already_bound += 1;
            return Ok(());
        }

        self.pending_clock = None;
        self.iterate_children(id)?;

        let sentree = self.new_sentree(id);
        if let NodeKind::Assert { sentree: slot, .. } = self.tree.kind_mut(id) {
            *slot = Some(sentree);
        }
        self.tree.adopt(id, sentree);
        self.pending_clock = None;
        self.stats.assertions_bound += 1;
        Ok(())
    }

    fn visit_clocked(&mut self, id: NodeId) -> TreeResult<()> {
        self.iterate_children(id)?;

        // Nested wrappers have already replaced themselves in `prop`.
        let NodeKind::Clocked {
            senses,
            disable,
            prop,
        } = *self.tree.kind(id)
        else {
            return Ok(());
        };

        if self.pending_clock.is_some() {
            self.report(ClockingError::MultipleClocksPerAssertion {
                span: self.tree.span(id),
            });
        }

        let checked = match disable {
            Some(disable) => {
                let span = self.tree.span(disable);
                let not = self.tree.alloc(NodeKind::Not { operand: disable }, span);
                self.tree.alloc(NodeKind::And { lhs: not, rhs: prop }, span)
            }
            None => prop,
        };

        self.pending_clock = Some(senses);
        self.tree.replace_with(id, &[checked])?;
        self.deferred.push(id);
        self.stats.clocked_wrappers += 1;
        Ok(())
    }

    /// Sensitivity for an assertion: explicit clock, else scope default, else empty
    fn new_sentree(&mut self, assertion: NodeId) -> NodeId {
        let span = self.tree.span(assertion);
        let items = match self.pending_clock.or(self.default_clock) {
            Some(senses) => vec![self.tree.deep_clone(senses)],
            None => {
                self.report(ClockingError::UnclockedAssertion { span });
                Vec::new()
            }
        };
        self.tree.alloc(NodeKind::SenTree { items }, span)
    }

    fn report(&mut self, error: ClockingError) {
        match error {
            ClockingError::UnclockedAssertion { .. } => self.stats.unclocked += 1,
            ClockingError::MultipleClocksPerAssertion { .. } => self.stats.multiple_clocks += 1,
        }
        debug!(span = %error.span(), "{error}");
        self.sink.emit(error.to_diagnostic());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_diagnostics::DiagnosticBag;
    use hdl_span::FileSpan;

    #[test]
    fn test_handlers_ignore_mismatched_nodes() {
        let mut tree = Tree::new();
        let name = tree.intern("x");
        let leaf = tree.alloc(NodeKind::VarRef { name }, FileSpan::default());
        let root = tree.alloc(NodeKind::Not { operand: leaf }, FileSpan::default());
        tree.set_root(root);
        let before = tree.dump(root).to_string();
        let mut bag = DiagnosticBag::new();

        let mut visitor = AssertPre::new(&mut tree, &mut bag);
        assert_eq!(visitor.visit_clocking(leaf), Ok(()));
        assert_eq!(visitor.visit_clocked(leaf), Ok(()));
        assert!(visitor.deferred.is_empty());
        assert_eq!(visitor.stats, PassStats::default());

        assert!(bag.is_empty());
        assert_eq!(tree.dump(root).to_string(), before);
        assert!(tree.check().is_ok());
    }
}
