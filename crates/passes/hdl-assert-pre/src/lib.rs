//! Assertion clock binding
//!
//! Attaches a sensitivity tree to every assertion-like statement before later
//! passes reason about assertions:
//!
//! - A `default clocking` block sets the default clock for the rest of its
//!   module-like scope. The block itself is removed and its body kept.
//! - A clocked property (`@(posedge clk) disable iff (rst) p`) supplies an
//!   explicit clock for the enclosing assertion and is replaced by
//!   `!rst && p`, or by `p` when there is no disable condition.
//! - Each assertion then receives a clone of its explicit clock, else of the
//!   scope default. Without either, an `Unsupported` diagnostic is reported
//!   and an empty sensitivity tree is attached so the tree stays well formed.
//!
//! Assertions that already carry a sensitivity tree are left alone, so running
//! the pass twice is harmless.

mod error;
mod visitor;

use hdl_ast::{Tree, TreeError, TreeResult};
use hdl_diagnostics::DiagnosticSink;
use tracing::{debug, instrument};

pub use error::ClockingError;
pub use visitor::AssertPre;

/// Name used for tree dumps taken after this pass
pub const PASS_NAME: &str = "assertpre";

/// Dump level at which the driver writes the tree after this pass
pub const DUMP_LEVEL: u32 = 3;

/// Counters describing what one run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Assertions that received a sensitivity tree
    pub assertions_bound: usize,
    /// Assertions skipped because they were already bound
    pub already_bound: usize,
    /// Clocking blocks consumed
    pub clocking_blocks: usize,
    /// Clocked properties consumed
    pub clocked_wrappers: usize,
    /// Assertions left without a clock
    pub unclocked: usize,
    /// Assertions with more than one explicit clock
    pub multiple_clocks: usize,
    /// Nodes released by deferred deletion
    pub reclaimed: usize,
}

/// Bind a clock to every assertion reachable from the tree root
///
/// # Errors
///
/// Returns a [`TreeError`] if the tree has no root or breaks its ownership
/// contract while being rewritten. Clocking problems in the design are
/// reported to `sink` instead.
#[instrument(skip_all, name = "assertpre")]
pub fn bind_assertion_clocks(
    tree: &mut Tree,
    sink: &mut dyn DiagnosticSink,
) -> TreeResult<PassStats> {
    let root = tree.root().ok_or(TreeError::NoRoot)?;
    let stats = AssertPre::new(tree, sink).run(root)?;
    debug!(
        bound = stats.assertions_bound,
        skipped = stats.already_bound,
        clocking = stats.clocking_blocks,
        clocked = stats.clocked_wrappers,
        reclaimed = stats.reclaimed,
        "assertion clocks bound"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use hdl_ast::{Edge, NodeClass, NodeId, NodeKind, SerialDesign};
    use hdl_diagnostics::{Diagnostic, DiagnosticBag};
    use serde_json::{Value, json};

    fn build(root: Value) -> Tree {
        let design: SerialDesign = serde_json::from_value(json!({ "root": root })).unwrap();
        Tree::from_design(&design).0
    }

    fn var(name: &str) -> Value {
        json!({ "kind": "var_ref", "name": name })
    }

    fn edge(edge: &str, signal: &str) -> Value {
        json!({ "kind": "sen_item", "edge": edge, "term": var(signal) })
    }

    fn module(name: &str, items: Vec<Value>) -> Value {
        json!({ "kind": "module", "name": name, "items": items })
    }

    fn netlist(modules: Vec<Value>) -> Value {
        json!({ "kind": "netlist", "modules": modules })
    }

    fn clocking(senses: Value) -> Value {
        json!({ "kind": "clocking", "senses": senses })
    }

    fn assert_at(start: u32, prop: Value) -> Value {
        json!({ "kind": "assert", "at": [start, start + 10], "prop": prop })
    }

    fn clocked(senses: Value, disable: Option<Value>, prop: Value) -> Value {
        match disable {
            Some(disable) => {
                json!({ "kind": "clocked", "senses": senses, "disable": disable, "prop": prop })
            }
            None => json!({ "kind": "clocked", "senses": senses, "prop": prop }),
        }
    }

    fn run(tree: &mut Tree) -> (PassStats, Vec<Diagnostic>) {
        let mut bag = DiagnosticBag::new();
        let stats = bind_assertion_clocks(tree, &mut bag).unwrap();
        (stats, bag.into_diagnostics())
    }

    fn sentree_of(tree: &Tree, assertion: NodeId) -> NodeId {
        match tree.kind(assertion) {
            NodeKind::Assert {
                sentree: Some(sentree),
                ..
            } => *sentree,
            other => panic!("expected a bound assertion, got {other:?}"),
        }
    }

    fn prop_of(tree: &Tree, assertion: NodeId) -> NodeId {
        match tree.kind(assertion) {
            NodeKind::Assert { prop, .. } => *prop,
            other => panic!("expected an assertion, got {other:?}"),
        }
    }

    /// A `SENTREE` holding one freshly built sensitivity item
    fn expected_sentree(tree: &mut Tree, edge_value: Value) -> NodeId {
        let design: SerialDesign =
            serde_json::from_value(json!({ "root": { "kind": "sen_tree", "items": [edge_value] } }))
                .unwrap();
        tree.add_serial(&design.root)
    }

    #[test]
    fn test_default_clock_is_inherited() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![clocking(edge("posedge", "clk")), assert_at(20, var("x"))],
        )]));

        let (stats, diagnostics) = run(&mut tree);

        assert!(diagnostics.is_empty());
        assert_eq!(stats.assertions_bound, 1);
        assert_eq!(stats.clocking_blocks, 1);

        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let expected = expected_sentree(&mut tree, edge("posedge", "clk"));
        assert!(tree.same_structure(sentree_of(&tree, assertion), expected));

        let scope = tree.find_class(NodeClass::Scope)[0];
        assert_eq!(tree.children(scope), vec![assertion]);
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_disable_condition_guards_property() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![assert_at(
                0,
                clocked(edge("posedge", "clk"), Some(var("rst")), var("req")),
            )],
        )]));

        let (stats, diagnostics) = run(&mut tree);

        assert!(diagnostics.is_empty());
        assert_eq!(stats.clocked_wrappers, 1);
        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let root = tree.root().unwrap();
        expect![[r#"
            NETLIST
              MODULE module top
                ASSERT assert
                  AND
                    NOT
                      VARREF rst
                    VARREF req
                  SENTREE
                    SENITEM posedge
                      VARREF clk
        "#]]
        .assert_eq(&tree.dump(root).to_string());
        assert!(tree.find_class(NodeClass::ClockedWrapper).is_empty());
        assert_eq!(tree.parent(prop_of(&tree, assertion)), Some(assertion));
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_guard_nodes_take_disable_location() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![assert_at(
                0,
                clocked(
                    edge("posedge", "clk"),
                    Some(json!({ "kind": "var_ref", "name": "rst", "at": [30, 33] })),
                    var("req"),
                ),
            )],
        )]));

        run(&mut tree);

        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let guard = prop_of(&tree, assertion);
        assert_eq!(tree.span(guard).span.start, 30);
        assert_eq!(tree.span(tree.children(guard)[0]).span.end, 33);
    }

    #[test]
    fn test_without_disable_property_is_kept() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![assert_at(0, clocked(edge("negedge", "clk"), None, var("req")))],
        )]));
        let wrapper = tree.find_class(NodeClass::ClockedWrapper)[0];
        let original_prop = match tree.kind(wrapper) {
            NodeKind::Clocked { prop, .. } => *prop,
            other => panic!("unexpected {other:?}"),
        };

        let (_, diagnostics) = run(&mut tree);

        assert!(diagnostics.is_empty());
        let assertion = tree.find_class(NodeClass::Assertion)[0];
        assert_eq!(prop_of(&tree, assertion), original_prop);
        let expected = expected_sentree(&mut tree, edge("negedge", "clk"));
        assert!(tree.same_structure(sentree_of(&tree, assertion), expected));
    }

    #[test]
    fn test_explicit_clock_overrides_default() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![
                clocking(edge("posedge", "clk")),
                assert_at(0, clocked(edge("negedge", "slow_clk"), None, var("req"))),
            ],
        )]));

        run(&mut tree);

        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let expected = expected_sentree(&mut tree, edge("negedge", "slow_clk"));
        assert!(tree.same_structure(sentree_of(&tree, assertion), expected));
    }

    #[test]
    fn test_two_explicit_clocks_report_once() {
        let inner = clocked(edge("posedge", "clk_b"), None, var("req"));
        let outer = clocked(edge("negedge", "clk_a"), None, inner);
        let mut tree = build(netlist(vec![module("top", vec![assert_at(0, outer)])]));

        let (stats, diagnostics) = run(&mut tree);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].code.as_deref(),
            Some("assert_pre::multiple_clocks")
        );
        assert_eq!(stats.multiple_clocks, 1);
        assert_eq!(stats.clocked_wrappers, 2);

        // The outer wrapper finishes last, so its clock wins.
        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let expected = expected_sentree(&mut tree, edge("negedge", "clk_a"));
        assert!(tree.same_structure(sentree_of(&tree, assertion), expected));
        assert!(matches!(tree.kind(prop_of(&tree, assertion)), NodeKind::VarRef { .. }));
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_unclocked_assertion_gets_empty_sentree() {
        let mut tree = build(netlist(vec![module("top", vec![assert_at(40, var("x"))])]));

        let (stats, diagnostics) = run(&mut tree);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].text(), "Unsupported: Unclocked assertion");
        assert_eq!(diagnostics[0].span.span.start, 40);
        assert_eq!(stats.unclocked, 1);

        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let sentree = sentree_of(&tree, assertion);
        assert!(matches!(tree.kind(sentree), NodeKind::SenTree { items } if items.is_empty()));
    }

    #[test]
    fn test_default_clock_does_not_leak_to_sibling_scope() {
        let mut tree = build(netlist(vec![
            module(
                "a",
                vec![clocking(edge("posedge", "clk")), assert_at(0, var("x"))],
            ),
            module("b", vec![assert_at(100, var("y"))]),
        ]));

        let (_, diagnostics) = run(&mut tree);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span.span.start, 100);
        let assertions = tree.find_class(NodeClass::Assertion);
        let expected = expected_sentree(&mut tree, edge("posedge", "clk"));
        assert!(tree.same_structure(sentree_of(&tree, assertions[0]), expected));
    }

    #[test]
    fn test_nested_scope_starts_unclocked() {
        let mut tree = build(netlist(vec![module(
            "outer",
            vec![
                clocking(edge("posedge", "clk")),
                assert_at(0, var("before")),
                module("inner", vec![assert_at(50, var("inside"))]),
                assert_at(100, var("after")),
            ],
        )]));

        let (stats, diagnostics) = run(&mut tree);

        assert_eq!(stats.assertions_bound, 3);
        let starts: Vec<u32> = diagnostics.iter().map(|d| d.span.span.start).collect();
        assert_eq!(starts, vec![50, 100]);
    }

    #[test]
    fn test_explicit_clock_does_not_leak_to_next_assertion() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![
                assert_at(0, clocked(edge("posedge", "clk"), None, var("a"))),
                assert_at(20, var("b")),
            ],
        )]));

        let (_, diagnostics) = run(&mut tree);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span.span.start, 20);
    }

    #[test]
    fn test_clocking_body_is_kept_and_clocked() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![json!({
                "kind": "clocking",
                "senses": edge("posedge", "clk"),
                "body": [assert_at(0, var("x")), { "kind": "const", "value": 1, "width": 1 }]
            })],
        )]));

        let (stats, diagnostics) = run(&mut tree);

        assert!(diagnostics.is_empty());
        assert_eq!(stats.assertions_bound, 1);
        let scope = tree.find_class(NodeClass::Scope)[0];
        let items = tree.children(scope);
        assert_eq!(items.len(), 2);
        assert!(matches!(tree.kind(items[0]), NodeKind::Assert { sentree: Some(_), .. }));
        assert!(matches!(tree.kind(items[1]), NodeKind::Const { .. }));
        assert!(tree.find_class(NodeClass::ClockingDecl).is_empty());
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_every_nested_assertion_is_bound() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![
                clocking(edge("posedge", "clk")),
                json!({
                    "kind": "always",
                    "stmts": [{
                        "kind": "begin",
                        "name": "checks",
                        "stmts": [
                            assert_at(0, var("a")),
                            { "kind": "assert", "flavor": "cover", "prop": var("b") }
                        ]
                    }]
                }),
                json!({ "kind": "initial", "stmts": [assert_at(30, var("c"))] }),
            ],
        )]));

        let (stats, diagnostics) = run(&mut tree);

        assert!(diagnostics.is_empty());
        assert_eq!(stats.assertions_bound, 3);
        for assertion in tree.find_class(NodeClass::Assertion) {
            let sentree = sentree_of(&tree, assertion);
            assert_eq!(tree.parent(sentree), Some(assertion));
        }
    }

    #[test]
    fn test_each_assertion_gets_its_own_clone() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![
                clocking(edge("posedge", "clk")),
                assert_at(0, var("a")),
                assert_at(10, var("b")),
            ],
        )]));

        run(&mut tree);

        let assertions = tree.find_class(NodeClass::Assertion);
        let first = sentree_of(&tree, assertions[0]);
        let second = sentree_of(&tree, assertions[1]);
        assert_ne!(tree.children(first), tree.children(second));
        assert!(tree.same_structure(first, second));
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut tree = build(netlist(vec![
            module(
                "a",
                vec![
                    clocking(edge("posedge", "clk")),
                    assert_at(0, clocked(edge("negedge", "clk"), Some(var("rst")), var("x"))),
                ],
            ),
            module("b", vec![assert_at(100, var("y"))]),
        ]));
        let (_, first_diagnostics) = run(&mut tree);
        let root = tree.root().unwrap();
        let before = tree.dump(root).to_string();
        let live_before = tree.live_count();

        let (stats, diagnostics) = run(&mut tree);

        assert_eq!(first_diagnostics.len(), 1);
        assert!(diagnostics.is_empty());
        assert_eq!(stats.assertions_bound, 0);
        assert_eq!(stats.already_bound, 2);
        assert_eq!(stats.reclaimed, 0);
        assert_eq!(tree.dump(root).to_string(), before);
        assert_eq!(tree.live_count(), live_before);
    }

    #[test]
    fn test_removed_nodes_are_reclaimed() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![
                clocking(edge("posedge", "clk")),
                assert_at(0, clocked(edge("negedge", "clk"), Some(var("rst")), var("x"))),
            ],
        )]));

        let (stats, _) = run(&mut tree);

        // Clocking block with its item and term, wrapper with its item and term.
        assert_eq!(stats.reclaimed, 6);
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let mut tree = Tree::new();
        let mut bag = DiagnosticBag::new();
        assert_eq!(
            bind_assertion_clocks(&mut tree, &mut bag),
            Err(TreeError::NoRoot)
        );
    }

    #[test]
    fn test_sensitivity_item_edges_survive_cloning() {
        let mut tree = build(netlist(vec![module(
            "top",
            vec![clocking(edge("bothedge", "clk")), assert_at(0, var("x"))],
        )]));

        run(&mut tree);

        let assertion = tree.find_class(NodeClass::Assertion)[0];
        let item = tree.children(sentree_of(&tree, assertion))[0];
        assert!(matches!(
            tree.kind(item),
            NodeKind::SenItem {
                edge: Edge::Bothedge,
                ..
            }
        ));
    }
}
