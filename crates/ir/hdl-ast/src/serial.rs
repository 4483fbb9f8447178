//! Nested serde representation of a design tree
//!
//! Earlier elaboration stages hand the tree over as JSON; this module turns
//! that nested form into arena nodes and back.

use hdl_intern::Symbol;
use hdl_span::{FileId, FileSpan, SourceMap, Span};
use serde::{Deserialize, Serialize};

use crate::{AssertFlavor, Edge, ModuleFlavor, NodeId, NodeKind, Tree};

/// A whole design: the files it came from plus its root node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialDesign {
    /// Source files referenced by `file` fields
    #[serde(default)]
    pub files: SourceMap,
    /// Root node, normally a netlist
    pub root: SerialNode,
}

/// One node with its location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialNode {
    /// Index into [`SerialDesign::files`]
    #[serde(default)]
    pub file: u32,
    /// Byte offsets `[start, end]`
    #[serde(default)]
    pub at: [u32; 2],
    /// Kind and children
    #[serde(flatten)]
    pub kind: SerialKind,
}

/// Kind-tagged payload of a [`SerialNode`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum SerialKind {
    Netlist {
        #[serde(default)]
        modules: Vec<SerialNode>,
    },
    Module {
        #[serde(default)]
        flavor: ModuleFlavor,
        name: String,
        #[serde(default)]
        items: Vec<SerialNode>,
    },
    Clocking {
        senses: Box<SerialNode>,
        #[serde(default)]
        body: Vec<SerialNode>,
    },
    Clocked {
        senses: Box<SerialNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        disable: Option<Box<SerialNode>>,
        prop: Box<SerialNode>,
    },
    Assert {
        #[serde(default)]
        flavor: AssertFlavor,
        prop: Box<SerialNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sentree: Option<Box<SerialNode>>,
    },
    SenTree {
        #[serde(default)]
        items: Vec<SerialNode>,
    },
    SenItem {
        edge: Edge,
        term: Box<SerialNode>,
    },
    Always {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sentree: Option<Box<SerialNode>>,
        #[serde(default)]
        stmts: Vec<SerialNode>,
    },
    Initial {
        #[serde(default)]
        stmts: Vec<SerialNode>,
    },
    Begin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        stmts: Vec<SerialNode>,
    },
    Assign {
        lhs: Box<SerialNode>,
        rhs: Box<SerialNode>,
    },
    VarRef {
        name: String,
    },
    Const {
        value: u64,
        #[serde(default = "default_width")]
        width: u32,
    },
    Not {
        operand: Box<SerialNode>,
    },
    And {
        lhs: Box<SerialNode>,
        rhs: Box<SerialNode>,
    },
    Or {
        lhs: Box<SerialNode>,
        rhs: Box<SerialNode>,
    },
}

fn default_width() -> u32 {
    32
}

impl SerialNode {
    /// Location of the node; reversed offsets collapse to an empty span at `start`
    fn span(&self) -> FileSpan {
        let [start, end] = self.at;
        FileSpan::new(FileId(self.file), Span::new(start, end.max(start)))
    }
}

impl Tree {
    /// Build a tree from a serialized design, returning it with its files
    ///
    /// The root of the design becomes the tree root.
    #[must_use]
    pub fn from_design(design: &SerialDesign) -> (Self, SourceMap) {
        let mut tree = Self::new();
        let root = tree.add_serial(&design.root);
        tree.set_root(root);
        (tree, design.files.clone())
    }

    /// Allocate a serialized subtree, returning its unlinked root
    pub fn add_serial(&mut self, node: &SerialNode) -> NodeId {
        let kind = match &node.kind {
            SerialKind::Netlist { modules } => NodeKind::Netlist {
                modules: self.add_all(modules),
            },
            SerialKind::Module {
                flavor,
                name,
                items,
            } => NodeKind::Module {
                flavor: *flavor,
                name: self.intern(name),
                items: self.add_all(items),
            },
            SerialKind::Clocking { senses, body } => NodeKind::Clocking {
                senses: self.add_serial(senses),
                body: self.add_all(body),
            },
            SerialKind::Clocked {
                senses,
                disable,
                prop,
            } => NodeKind::Clocked {
                senses: self.add_serial(senses),
                disable: disable.as_deref().map(|d| self.add_serial(d)),
                prop: self.add_serial(prop),
            },
            SerialKind::Assert {
                flavor,
                prop,
                sentree,
            } => NodeKind::Assert {
                flavor: *flavor,
                prop: self.add_serial(prop),
                sentree: sentree.as_deref().map(|s| self.add_serial(s)),
            },
            SerialKind::SenTree { items } => NodeKind::SenTree {
                items: self.add_all(items),
            },
            SerialKind::SenItem { edge, term } => NodeKind::SenItem {
                edge: *edge,
                term: self.add_serial(term),
            },
            SerialKind::Always { sentree, stmts } => NodeKind::Always {
                sentree: sentree.as_deref().map(|s| self.add_serial(s)),
                stmts: self.add_all(stmts),
            },
            SerialKind::Initial { stmts } => NodeKind::Initial {
                stmts: self.add_all(stmts),
            },
            SerialKind::Begin { name, stmts } => NodeKind::Begin {
                name: name.as_deref().map(|n| self.intern(n)),
                stmts: self.add_all(stmts),
            },
            SerialKind::Assign { lhs, rhs } => NodeKind::Assign {
                lhs: self.add_serial(lhs),
                rhs: self.add_serial(rhs),
            },
            SerialKind::VarRef { name } => NodeKind::VarRef {
                name: self.intern(name),
            },
            SerialKind::Const { value, width } => NodeKind::Const {
                value: *value,
                width: *width,
            },
            SerialKind::Not { operand } => NodeKind::Not {
                operand: self.add_serial(operand),
            },
            SerialKind::And { lhs, rhs } => NodeKind::And {
                lhs: self.add_serial(lhs),
                rhs: self.add_serial(rhs),
            },
            SerialKind::Or { lhs, rhs } => NodeKind::Or {
                lhs: self.add_serial(lhs),
                rhs: self.add_serial(rhs),
            },
        };
        self.alloc(kind, node.span())
    }

    fn add_all(&mut self, nodes: &[SerialNode]) -> Vec<NodeId> {
        nodes.iter().map(|node| self.add_serial(node)).collect()
    }

    fn serial_all(&self, ids: &[NodeId]) -> Vec<SerialNode> {
        ids.iter().map(|id| self.to_serial(*id)).collect()
    }

    /// Serialize the subtree at `id`
    ///
    /// # Panics
    ///
    /// Panics if the subtree contains a reclaimed node.
    #[must_use]
    pub fn to_serial(&self, id: NodeId) -> SerialNode {
        let boxed = |child: NodeId| Box::new(self.to_serial(child));
        let name = |sym: Symbol| self.name(sym).to_string();

        let kind = match self.kind(id) {
            NodeKind::Netlist { modules } => SerialKind::Netlist {
                modules: self.serial_all(modules),
            },
            NodeKind::Module {
                flavor,
                name: sym,
                items,
            } => SerialKind::Module {
                flavor: *flavor,
                name: name(*sym),
                items: self.serial_all(items),
            },
            NodeKind::Clocking { senses, body } => SerialKind::Clocking {
                senses: boxed(*senses),
                body: self.serial_all(body),
            },
            NodeKind::Clocked {
                senses,
                disable,
                prop,
            } => SerialKind::Clocked {
                senses: boxed(*senses),
                disable: disable.map(boxed),
                prop: boxed(*prop),
            },
            NodeKind::Assert {
                flavor,
                prop,
                sentree,
            } => SerialKind::Assert {
                flavor: *flavor,
                prop: boxed(*prop),
                sentree: sentree.map(boxed),
            },
            NodeKind::SenTree { items } => SerialKind::SenTree { items: self.serial_all(items) },
            NodeKind::SenItem { edge, term } => SerialKind::SenItem {
                edge: *edge,
                term: boxed(*term),
            },
            NodeKind::Always { sentree, stmts } => SerialKind::Always {
                sentree: sentree.map(boxed),
                stmts: self.serial_all(stmts),
            },
            NodeKind::Initial { stmts } => SerialKind::Initial { stmts: self.serial_all(stmts) },
            NodeKind::Begin { name: sym, stmts } => SerialKind::Begin {
                name: sym.map(name),
                stmts: self.serial_all(stmts),
            },
            NodeKind::Assign { lhs, rhs } => SerialKind::Assign {
                lhs: boxed(*lhs),
                rhs: boxed(*rhs),
            },
            NodeKind::VarRef { name: sym } => SerialKind::VarRef { name: name(*sym) },
            NodeKind::Const { value, width } => SerialKind::Const {
                value: *value,
                width: *width,
            },
            NodeKind::Not { operand } => SerialKind::Not {
                operand: boxed(*operand),
            },
            NodeKind::And { lhs, rhs } => SerialKind::And {
                lhs: boxed(*lhs),
                rhs: boxed(*rhs),
            },
            NodeKind::Or { lhs, rhs } => SerialKind::Or {
                lhs: boxed(*lhs),
                rhs: boxed(*rhs),
            },
            NodeKind::Freed => panic!("internal error: serializing reclaimed node {id:?}"),
        };
        let span = self.span(id);
        SerialNode {
            file: span.file.0,
            at: [span.span.start, span.span.end],
            kind,
        }
    }
}
