// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::operator::OperatorNode;
use yare::parameterized;

fn match_names(op: &Operator) -> Vec<String> {
    let mut names = Vec::new();
    fn walk(op: &Operator, names: &mut Vec<String>) {
        match &op.node {
            OperatorNode::Match(spec) => names.push(spec.name.clone()),
            OperatorNode::And { children } | OperatorNode::Or { children } => {
                for child in children {
                    walk(child, names);
                }
            }
        }
    }
    walk(op, &mut names);
    names
}

#[test]
fn single_event_name() {
    let op = parse_on("startup").unwrap();
    match &op.node {
        OperatorNode::Match(spec) => {
            assert_eq!(spec.name, "startup");
            assert!(spec.args.is_empty());
        }
        other => panic!("expected match node, got {other:?}"),
    }
}

#[test]
fn and_of_two_events() {
    let op = parse_on("a and b").unwrap();
    assert!(matches!(&op.node, OperatorNode::And { children } if children.len() == 2));
    assert_eq!(match_names(&op), vec!["a", "b"]);
}

#[test]
fn or_of_two_events() {
    let op = parse_on("a or b").unwrap();
    assert!(matches!(&op.node, OperatorNode::Or { children } if children.len() == 2));
}

#[test]
fn and_binds_tighter_than_or() {
    let op = parse_on("a or b and c").unwrap();
    match &op.node {
        OperatorNode::Or { children } => {
            assert!(matches!(&children[0].node, OperatorNode::Match(_)));
            assert!(matches!(&children[1].node, OperatorNode::And { .. }));
        }
        other => panic!("expected or at root, got {other:?}"),
    }
}

#[test]
fn parens_override_precedence() {
    let op = parse_on("(a or b) and c").unwrap();
    match &op.node {
        OperatorNode::And { children } => {
            assert!(matches!(&children[0].node, OperatorNode::Or { .. }));
        }
        other => panic!("expected and at root, got {other:?}"),
    }
}

#[test]
fn key_value_argument() {
    let op = parse_on("net-up IFACE=eth0").unwrap();
    match &op.node {
        OperatorNode::Match(spec) => {
            assert_eq!(
                spec.args,
                vec![ArgMatch::Key {
                    key: "IFACE".into(),
                    value: ValueMatch::Literal("eth0".into()),
                }]
            );
        }
        other => panic!("expected match node, got {other:?}"),
    }
}

#[test]
fn env_reference_argument() {
    let op = parse_on("net-down IFACE=$IFACE").unwrap();
    match &op.node {
        OperatorNode::Match(spec) => {
            assert_eq!(
                spec.args,
                vec![ArgMatch::Key {
                    key: "IFACE".into(),
                    value: ValueMatch::Var("IFACE".into()),
                }]
            );
        }
        other => panic!("expected match node, got {other:?}"),
    }
}

#[test]
fn positional_argument() {
    let op = parse_on("runlevel 2").unwrap();
    match &op.node {
        OperatorNode::Match(spec) => {
            assert_eq!(
                spec.args,
                vec![ArgMatch::Positional(ValueMatch::Literal("2".into()))]
            );
        }
        other => panic!("expected match node, got {other:?}"),
    }
}

#[test]
fn quoted_values_keep_spaces() {
    let op = parse_on(r#"message TEXT="hello world""#).unwrap();
    match &op.node {
        OperatorNode::Match(spec) => {
            assert_eq!(spec.name, "message");
            assert_eq!(
                spec.args,
                vec![ArgMatch::Key {
                    key: "TEXT".into(),
                    value: ValueMatch::Literal("hello world".into()),
                }]
            );
        }
        other => panic!("expected match node, got {other:?}"),
    }
}

#[test]
fn nested_expression() {
    let op = parse_on("started network and (runlevel 2 or runlevel 3)").unwrap();
    assert_eq!(match_names(&op), vec!["started", "runlevel", "runlevel"]);
}

#[parameterized(
    empty = { "" },
    only_and = { "and" },
    trailing_and = { "a and" },
    leading_or = { "or a" },
    open_paren = { "(a" },
    close_paren = { "a)" },
    key_value_first = { "IFACE=eth0" },
    bad_reference = { "a K=$" },
)]
fn rejects_malformed(input: &str) {
    assert!(parse_on(input).is_err(), "{input:?} should not parse");
}

#[test]
fn empty_is_specific_error() {
    assert_eq!(parse_on("   "), Err(OnParseError::Empty));
}

#[test]
fn unbalanced_paren_is_specific_error() {
    assert_eq!(parse_on("(a or b"), Err(OnParseError::UnbalancedParen));
}
