//! Node kinds and their child slots

use derive_more::Display;
use hdl_intern::Symbol;
use serde::{Deserialize, Serialize};

use crate::{NodeId, TreeError};

/// Flavor of a module-like scope
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFlavor {
    /// `module`
    #[default]
    #[display("module")]
    Module,
    /// `interface`
    #[display("interface")]
    Interface,
    /// `package`
    #[display("package")]
    Package,
    /// `program`
    #[display("program")]
    Program,
}

/// Flavor of an assertion-like statement
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertFlavor {
    /// `assert property`
    #[default]
    #[display("assert")]
    Assert,
    /// `cover property`
    #[display("cover")]
    Cover,
}

/// Triggering edge of a sensitivity item
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Rising edge
    #[display("posedge")]
    Posedge,
    /// Falling edge
    #[display("negedge")]
    Negedge,
    /// Either edge
    #[display("bothedge")]
    Bothedge,
    /// Any value change
    #[display("changed")]
    Changed,
}

/// Coarse classification used by passes to pick a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// Module-like scope bounding a default clock
    Scope,
    /// Clocking block declaring a default clock
    ClockingDecl,
    /// Property carrying its own clock and disable condition
    ClockedWrapper,
    /// Assertion or cover statement
    Assertion,
    /// Everything else
    Other,
}

/// Kind tag plus kind-specific payload of a design tree node
///
/// Children are held by id in named slots. Slot order is the traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Whole-program root
    Netlist {
        /// Top-level scopes
        modules: Vec<NodeId>,
    },
    /// Module-like scope
    Module {
        /// Which keyword introduced the scope
        flavor: ModuleFlavor,
        /// Scope name
        name: Symbol,
        /// Items declared in the scope
        items: Vec<NodeId>,
    },
    /// `default clocking` block
    Clocking {
        /// Sensitivity item that becomes the scope default
        senses: NodeId,
        /// Statements declared inside the block
        body: Vec<NodeId>,
    },
    /// Property with an inline clock and optional `disable iff`
    Clocked {
        /// Sensitivity item of the inline clock
        senses: NodeId,
        /// Condition suppressing the check while true
        disable: Option<NodeId>,
        /// Property expression being clocked
        prop: NodeId,
    },
    /// Assertion-like statement
    Assert {
        /// Assert or cover
        flavor: AssertFlavor,
        /// Checked property expression
        prop: NodeId,
        /// Bound sensitivity, set once by clock binding
        sentree: Option<NodeId>,
    },
    /// Sensitivity list; empty means the check never triggers
    SenTree {
        /// Sensitivity items
        items: Vec<NodeId>,
    },
    /// One edge-triggered term
    SenItem {
        /// Triggering edge
        edge: Edge,
        /// Signal expression being watched
        term: NodeId,
    },
    /// `always` block
    Always {
        /// Explicit sensitivity, if any
        sentree: Option<NodeId>,
        /// Body statements
        stmts: Vec<NodeId>,
    },
    /// `initial` block
    Initial {
        /// Body statements
        stmts: Vec<NodeId>,
    },
    /// `begin ... end`
    Begin {
        /// Optional block label
        name: Option<Symbol>,
        /// Body statements
        stmts: Vec<NodeId>,
    },
    /// Continuous or procedural assignment
    Assign {
        /// Target
        lhs: NodeId,
        /// Value
        rhs: NodeId,
    },
    /// Reference to a signal
    VarRef {
        /// Signal name
        name: Symbol,
    },
    /// Sized constant
    Const {
        /// Value bits
        value: u64,
        /// Width in bits
        width: u32,
    },
    /// Logical negation
    Not {
        /// Negated expression
        operand: NodeId,
    },
    /// Logical conjunction
    And {
        /// Left operand
        lhs: NodeId,
        /// Right operand
        rhs: NodeId,
    },
    /// Logical disjunction
    Or {
        /// Left operand
        lhs: NodeId,
        /// Right operand
        rhs: NodeId,
    },
    /// Payload released by deferred deletion
    Freed,
}

/// Shared view of one child slot
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    /// Exactly one child
    One(NodeId),
    /// Zero or one child
    Maybe(Option<NodeId>),
    /// Ordered children
    List(&'a [NodeId]),
}

/// Mutable view of one child slot
#[derive(Debug)]
pub enum SlotMut<'a> {
    /// Exactly one child
    One(&'a mut NodeId),
    /// Zero or one child
    Maybe(&'a mut Option<NodeId>),
    /// Ordered children
    List(&'a mut Vec<NodeId>),
}

impl NodeKind {
    /// Handler class of this kind
    #[must_use]
    pub fn class(&self) -> NodeClass {
        match self {
            Self::Module { .. } => NodeClass::Scope,
            Self::Clocking { .. } => NodeClass::ClockingDecl,
            Self::Clocked { .. } => NodeClass::ClockedWrapper,
            Self::Assert { .. } => NodeClass::Assertion,
            _ => NodeClass::Other,
        }
    }

    /// Upper-case tag used in tree dumps
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Netlist { .. } => "NETLIST",
            Self::Module { .. } => "MODULE",
            Self::Clocking { .. } => "CLOCKING",
            Self::Clocked { .. } => "CLOCKED",
            Self::Assert { .. } => "ASSERT",
            Self::SenTree { .. } => "SENTREE",
            Self::SenItem { .. } => "SENITEM",
            Self::Always { .. } => "ALWAYS",
            Self::Initial { .. } => "INITIAL",
            Self::Begin { .. } => "BEGIN",
            Self::Assign { .. } => "ASSIGN",
            Self::VarRef { .. } => "VARREF",
            Self::Const { .. } => "CONST",
            Self::Not { .. } => "NOT",
            Self::And { .. } => "AND",
            Self::Or { .. } => "OR",
            Self::Freed => "FREED",
        }
    }

    /// Child slots in traversal order
    #[must_use]
    pub fn slots(&self) -> Vec<Slot<'_>> {
        match self {
            Self::Netlist { modules } => vec![Slot::List(modules)],
            Self::Module { items, .. } => vec![Slot::List(items)],
            Self::Clocking { senses, body } => vec![Slot::One(*senses), Slot::List(body)],
            Self::Clocked {
                senses,
                disable,
                prop,
            } => vec![Slot::One(*senses), Slot::Maybe(*disable), Slot::One(*prop)],
            Self::Assert { prop, sentree, .. } => vec![Slot::One(*prop), Slot::Maybe(*sentree)],
            Self::SenTree { items } => vec![Slot::List(items)],
            Self::SenItem { term, .. } => vec![Slot::One(*term)],
            Self::Always { sentree, stmts } => vec![Slot::Maybe(*sentree), Slot::List(stmts)],
            Self::Initial { stmts } | Self::Begin { stmts, .. } => vec![Slot::List(stmts)],
            Self::Assign { lhs, rhs } | Self::And { lhs, rhs } | Self::Or { lhs, rhs } => {
                vec![Slot::One(*lhs), Slot::One(*rhs)]
            }
            Self::Not { operand } => vec![Slot::One(*operand)],
            Self::VarRef { .. } | Self::Const { .. } | Self::Freed => Vec::new(),
        }
    }

    /// Mutable child slots in traversal order
    pub fn slots_mut(&mut self) -> Vec<SlotMut<'_>> {
        match self {
            Self::Netlist { modules } => vec![SlotMut::List(modules)],
            Self::Module { items, .. } => vec![SlotMut::List(items)],
            Self::Clocking { senses, body } => vec![SlotMut::One(senses), SlotMut::List(body)],
            Self::Clocked {
                senses,
                disable,
                prop,
            } => vec![
                SlotMut::One(senses),
                SlotMut::Maybe(disable),
                SlotMut::One(prop),
            ],
            Self::Assert { prop, sentree, .. } => {
                vec![SlotMut::One(prop), SlotMut::Maybe(sentree)]
            }
            Self::SenTree { items } => vec![SlotMut::List(items)],
            Self::SenItem { term, .. } => vec![SlotMut::One(term)],
            Self::Always { sentree, stmts } => {
                vec![SlotMut::Maybe(sentree), SlotMut::List(stmts)]
            }
            Self::Initial { stmts } | Self::Begin { stmts, .. } => vec![SlotMut::List(stmts)],
            Self::Assign { lhs, rhs } | Self::And { lhs, rhs } | Self::Or { lhs, rhs } => {
                vec![SlotMut::One(lhs), SlotMut::One(rhs)]
            }
            Self::Not { operand } => vec![SlotMut::One(operand)],
            Self::VarRef { .. } | Self::Const { .. } | Self::Freed => Vec::new(),
        }
    }

    /// Every child id held in a slot, in traversal order
    #[must_use]
    pub fn child_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for slot in self.slots() {
            match slot {
                Slot::One(id) => ids.push(id),
                Slot::Maybe(id) => ids.extend(id),
                Slot::List(list) => ids.extend_from_slice(list),
            }
        }
        ids
    }

    /// Replace `old` with `new` in whichever slot holds it
    ///
    /// List slots splice `new` in place; an optional slot accepts zero or one
    /// node; a single slot needs exactly one. Returns `Ok(false)` when no slot
    /// holds `old`.
    pub(crate) fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: &[NodeId],
    ) -> Result<bool, TreeError> {
        for slot in self.slots_mut() {
            match slot {
                SlotMut::One(id) if *id == old => {
                    let [single] = new else {
                        return Err(TreeError::SlotArity {
                            parent,
                            count: new.len(),
                        });
                    };
                    *id = *single;
                    return Ok(true);
                }
                SlotMut::Maybe(id) if *id == Some(old) => {
                    *id = match new {
                        [] => None,
                        [single] => Some(*single),
                        _ => {
                            return Err(TreeError::SlotArity {
                                parent,
                                count: new.len(),
                            });
                        }
                    };
                    return Ok(true);
                }
                SlotMut::List(list) => {
                    if let Some(pos) = list.iter().position(|id| *id == old) {
                        list.remove(pos);
                        for (offset, id) in new.iter().enumerate() {
                            list.insert(pos + offset, *id);
                        }
                        return Ok(true);
                    }
                }
                _ => {}
            }
        }
        Ok(false)
    }

    /// Compare tag and scalar payload, ignoring children and locations
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Module { flavor, name, .. }, Self::Module {
                flavor: other_flavor,
                name: other_name,
                ..
            }) => flavor == other_flavor && name == other_name,
            (Self::Assert { flavor, .. }, Self::Assert {
                flavor: other_flavor,
                ..
            }) => flavor == other_flavor,
            (Self::SenItem { edge, .. }, Self::SenItem {
                edge: other_edge, ..
            }) => edge == other_edge,
            (Self::Begin { name, .. }, Self::Begin {
                name: other_name, ..
            }) => name == other_name,
            (Self::VarRef { name }, Self::VarRef { name: other_name }) => name == other_name,
            (Self::Const { value, width }, Self::Const {
                value: other_value,
                width: other_width,
            }) => value == other_value && width == other_width,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}
