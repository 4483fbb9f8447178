//! Elaborated design tree
//!
//! The design tree is an arena of [`Node`]s addressed by stable [`NodeId`]
//! handles. Each node records its parent; children live in the slots of its
//! [`NodeKind`] payload.
//!
//! Passes edit the tree in place with [`Tree::replace_with`] and
//! [`Tree::unlink`]. An unlinked node stays resolvable by its handle until it
//! is handed to [`Tree::reclaim`], which is only called once a traversal has
//! finished, so handles captured mid-traversal never dangle.

mod dump;
mod error;
mod kind;
mod serial;

use hdl_intern::{Interner, Symbol};
use hdl_span::FileSpan;
use la_arena::{Arena, Idx};
use rustc_hash::FxHashSet;

pub use dump::TreeDump;
pub use error::{TreeError, TreeResult};
pub use kind::{AssertFlavor, Edge, ModuleFlavor, NodeClass, NodeKind, Slot, SlotMut};
pub use serial::{SerialDesign, SerialKind, SerialNode};

/// Handle of a node in a [`Tree`]
pub type NodeId = Idx<Node>;

/// One node of the design tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Kind tag and payload
    pub kind: NodeKind,
    /// Source location
    pub span: FileSpan,
    parent: Option<NodeId>,
}

impl Node {
    /// Owning node, `None` for the root and for unlinked nodes
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether deferred deletion has released this node
    #[must_use]
    pub fn is_freed(&self) -> bool {
        matches!(self.kind, NodeKind::Freed)
    }
}

/// Arena-backed design tree
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Arena<Node>,
    root: Option<NodeId>,
    interner: Interner,
}

impl Tree {
    /// Create an empty tree with its own interner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name
    pub fn intern(&self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    /// Resolve a name
    #[must_use]
    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(&sym)
    }

    /// Allocate a node and adopt every child its payload refers to
    pub fn alloc(&mut self, kind: NodeKind, span: FileSpan) -> NodeId {
        let children = kind.child_ids();
        let id = self.nodes.alloc(Node {
            kind,
            span,
            parent: None,
        });
        for child in children {
            self.nodes[child].parent = Some(id);
        }
        id
    }

    /// Root node
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the root
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Look up a live node
    ///
    /// # Panics
    ///
    /// Panics if the node has been reclaimed.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &Node {
        let node = &self.nodes[id];
        assert!(!node.is_freed(), "internal error: use of reclaimed node {id:?}");
        node
    }

    /// Look up a live node mutably
    ///
    /// # Panics
    ///
    /// Panics if the node has been reclaimed.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let node = &mut self.nodes[id];
        assert!(!node.is_freed(), "internal error: use of reclaimed node {id:?}");
        node
    }

    /// Kind of a live node
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    /// Mutable payload of a live node
    ///
    /// Slots edited through this reference do not update parent links; use
    /// [`Tree::replace_with`] or [`Tree::adopt`] to keep them consistent.
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.get_mut(id).kind
    }

    /// Source location of a live node
    #[must_use]
    pub fn span(&self, id: NodeId) -> FileSpan {
        self.get(id).span
    }

    /// Parent of a live node
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    /// Children of a node in traversal order
    ///
    /// Only ids whose parent link points back at `id` are returned; a slot
    /// whose former child has been moved elsewhere counts as vacated.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id)
            .child_ids()
            .into_iter()
            .filter(|child| self.nodes[*child].parent == Some(id))
            .collect()
    }

    /// Record `parent` as the owner of `child`
    ///
    /// Used after storing `child` into one of `parent`'s slots by hand.
    pub fn adopt(&mut self, parent: NodeId, child: NodeId) {
        self.get_mut(child).parent = Some(parent);
    }

    /// Replace `old` in its parent's slot with `replacements`
    ///
    /// In a list slot the replacements are spliced in order; an empty list
    /// removes `old`. `old` is left unlinked but still resolvable.
    ///
    /// # Errors
    ///
    /// Fails when `old` has no parent, when the parent does not hold it, or
    /// when a single-child slot would end up with other than one node.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> TreeResult<()> {
        let parent = self.parent(old).ok_or(TreeError::Detached { node: old })?;
        let found = self
            .kind_mut(parent)
            .replace_child(parent, old, replacements)?;
        if !found {
            return Err(TreeError::NotAChild { parent, child: old });
        }
        self.nodes[old].parent = None;
        for &replacement in replacements {
            self.adopt(parent, replacement);
        }
        Ok(())
    }

    /// Remove `old` from its parent, leaving it resolvable
    ///
    /// # Errors
    ///
    /// Same as [`Tree::replace_with`] with no replacements; unlinking from a
    /// single-child slot is an arity error.
    pub fn unlink(&mut self, old: NodeId) -> TreeResult<()> {
        self.replace_with(old, &[])
    }

    /// Deep-copy the subtree rooted at `id`
    ///
    /// The copy is unlinked and shares no node with the original.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let span = self.span(id);
        let mut kind = self.kind(id).clone();
        for slot in kind.slots_mut() {
            match slot {
                SlotMut::One(child) => *child = self.deep_clone(*child),
                SlotMut::Maybe(child) => {
                    if let Some(inner) = child {
                        *inner = self.deep_clone(*inner);
                    }
                }
                SlotMut::List(list) => {
                    for child in list.iter_mut() {
                        *child = self.deep_clone(*child);
                    }
                }
            }
        }
        self.alloc(kind, span)
    }

    /// Whether two subtrees have the same kinds, payloads and shape
    ///
    /// Locations and node ids are ignored.
    #[must_use]
    pub fn same_structure(&self, lhs: NodeId, rhs: NodeId) -> bool {
        let (lhs_kind, rhs_kind) = (self.kind(lhs), self.kind(rhs));
        if !lhs_kind.same_shape(rhs_kind) {
            return false;
        }
        let (lhs_slots, rhs_slots) = (lhs_kind.slots(), rhs_kind.slots());
        lhs_slots.len() == rhs_slots.len()
            && lhs_slots
                .iter()
                .zip(&rhs_slots)
                .all(|pair| match pair {
                    (Slot::One(a), Slot::One(b)) => self.same_structure(*a, *b),
                    (Slot::Maybe(None), Slot::Maybe(None)) => true,
                    (Slot::Maybe(Some(a)), Slot::Maybe(Some(b))) => self.same_structure(*a, *b),
                    (Slot::List(a), Slot::List(b)) => {
                        a.len() == b.len()
                            && a.iter().zip(b.iter()).all(|(x, y)| self.same_structure(*x, *y))
                    }
                    _ => false,
                })
    }

    /// Release queued subtrees, returning how many nodes were freed
    ///
    /// A subtree includes only children that still record the queued node as
    /// their parent; anything moved out before deletion survives. Ids already
    /// freed are skipped.
    ///
    /// # Errors
    ///
    /// Fails if a queued node is still linked into the tree.
    pub fn reclaim(&mut self, queued: impl IntoIterator<Item = NodeId>) -> TreeResult<usize> {
        let mut freed = 0;
        for id in queued {
            if self.nodes[id].is_freed() {
                continue;
            }
            if self.nodes[id].parent.is_some() || self.root == Some(id) {
                return Err(TreeError::StillLinked { node: id });
            }
            let mut stack = vec![id];
            while let Some(current) = stack.pop() {
                stack.extend(self.children(current));
                let node = &mut self.nodes[current];
                node.kind = NodeKind::Freed;
                node.parent = None;
                freed += 1;
            }
        }
        Ok(freed)
    }

    /// Verify parent links and reachability from the root
    ///
    /// # Errors
    ///
    /// Reports the first broken link, reachable reclaimed node, or node
    /// reachable along two paths.
    pub fn check(&self) -> TreeResult<()> {
        let root = self.root.ok_or(TreeError::NoRoot)?;
        if let Some(recorded) = self.nodes[root].parent {
            return Err(TreeError::BrokenParentLink {
                parent: root,
                child: root,
                recorded: Some(recorded),
            });
        }
        let mut seen = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                return Err(TreeError::SharedNode { node: current });
            }
            for child in self.nodes[current].kind.child_ids() {
                let node = &self.nodes[child];
                if node.is_freed() {
                    return Err(TreeError::Reclaimed {
                        parent: current,
                        node: child,
                    });
                }
                if node.parent != Some(current) {
                    return Err(TreeError::BrokenParentLink {
                        parent: current,
                        child,
                        recorded: node.parent,
                    });
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Nodes reachable from `id` in pre-order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        order
    }

    /// Reachable nodes of the given class, in pre-order from the root
    #[must_use]
    pub fn find_class(&self, class: NodeClass) -> Vec<NodeId> {
        self.root.map_or_else(Vec::new, |root| {
            self.descendants(root)
                .into_iter()
                .filter(|id| self.kind(*id).class() == class)
                .collect()
        })
    }

    /// Number of nodes not yet reclaimed, linked or not
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|(_, node)| !node.is_freed()).count()
    }

    /// Indented textual dump of the subtree at `id`
    #[must_use]
    pub fn dump(&self, id: NodeId) -> TreeDump<'_> {
        TreeDump::new(self, id)
    }
}
