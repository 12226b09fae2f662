// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event operator trees.
//!
//! A job's `start on` / `stop on` condition is a boolean expression over
//! event matches. The tree structure is fixed at load time; each node keeps
//! a mutable `value` plus, for match nodes, a reference to the matching
//! event and the environment bindings captured from it. Values latch: a
//! node stays true across later events until the whole tree is reset, which
//! is how conditions like `a and b` accumulate over separate emissions.

use crate::env::EnvList;
use crate::event::{Event, EventId};
use serde::{Deserialize, Serialize};

/// How a single argument matcher compares against the event environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMatch {
    /// Literal comparison against the event's value.
    Literal(String),
    /// Reference resolved in the evaluation's reference environment
    /// (the job env for stop conditions; absent for start conditions).
    Var(String),
}

/// One argument matcher of a match node, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgMatch {
    /// Match the n-th environment entry of the event by position.
    Positional(ValueMatch),
    /// Match the named environment entry of the event.
    Key { key: String, value: ValueMatch },
}

/// The event-name and argument matchers of a match node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpec {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ArgMatch>,
}

/// Structure of an operator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperatorNode {
    And { children: Vec<Operator> },
    Or { children: Vec<Operator> },
    Match(MatchSpec),
}

/// A node in an operator tree: fixed structure, mutable match state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    #[serde(flatten)]
    pub node: OperatorNode,
    #[serde(default)]
    pub value: bool,
    /// Event this match node matched, while the tree is live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventId>,
    /// Bindings captured from the matched event.
    #[serde(default, skip_serializing_if = "EnvList::is_empty")]
    pub captured: EnvList,
}

impl Operator {
    pub fn and(children: Vec<Operator>) -> Self {
        Self::with_node(OperatorNode::And { children })
    }

    pub fn or(children: Vec<Operator>) -> Self {
        Self::with_node(OperatorNode::Or { children })
    }

    pub fn match_event(spec: MatchSpec) -> Self {
        Self::with_node(OperatorNode::Match(spec))
    }

    fn with_node(node: OperatorNode) -> Self {
        Self {
            node,
            value: false,
            event: None,
            captured: EnvList::new(),
        }
    }

    /// Give `event` to every match node, then recompute internal values.
    ///
    /// Returns the root value after this event. A match node that matches
    /// replaces any earlier match it held.
    pub fn handle(&mut self, event: &Event, reference_env: Option<&EnvList>) -> bool {
        match &mut self.node {
            OperatorNode::And { children } => {
                let mut value = true;
                for child in children.iter_mut() {
                    value &= child.handle(event, reference_env);
                }
                self.value = value;
            }
            OperatorNode::Or { children } => {
                let mut value = false;
                for child in children.iter_mut() {
                    value |= child.handle(event, reference_env);
                }
                self.value = value;
            }
            OperatorNode::Match(spec) => {
                if let Some(captured) = match_event(spec, event, reference_env) {
                    self.value = true;
                    self.event = Some(event.id);
                    self.captured = captured;
                }
            }
        }
        self.value
    }

    /// Clear every node's value and matched-event reference.
    pub fn reset(&mut self) {
        self.value = false;
        self.event = None;
        self.captured = EnvList::new();
        for child in self.children_mut() {
            child.reset();
        }
    }

    /// Append, to `env`, the bindings captured by the matched subtree plus a
    /// space-separated list of matched event names under `extra_key`.
    pub fn environment(&self, env: &mut EnvList, extra_key: &str) {
        let mut names = Vec::new();
        self.collect_matched(&mut |op| {
            if let OperatorNode::Match(spec) = &op.node {
                env.merge(&op.captured);
                names.push(spec.name.clone());
            }
        });
        if !names.is_empty() {
            // Keys are constants; join cannot produce an invalid name.
            let _ = env.set(extra_key, &names.join(" "));
        }
    }

    /// Event ids referenced by the matched subtree, in tree order.
    pub fn matched_events(&self) -> Vec<EventId> {
        let mut events = Vec::new();
        self.collect_matched(&mut |op| {
            if let Some(id) = op.event {
                if !events.contains(&id) {
                    events.push(id);
                }
            }
        });
        events
    }

    /// Rewrite matched-event references through `map`.
    ///
    /// A node whose event cannot be mapped keeps its latched value and
    /// captured bindings but loses the reference (the event itself is
    /// gone). Returns how many references were unlinked.
    pub fn remap_events(&mut self, map: &impl Fn(EventId) -> Option<EventId>) -> usize {
        let mut unlinked = 0;
        if let Some(old) = self.event {
            self.event = map(old);
            if self.event.is_none() {
                unlinked += 1;
            }
        }
        for child in self.children_mut() {
            unlinked += child.remap_events(map);
        }
        unlinked
    }

    /// Visit the nodes of the subtree that evaluated true, in tree order.
    fn collect_matched(&self, visit: &mut impl FnMut(&Operator)) {
        if !self.value {
            return;
        }
        visit(self);
        match &self.node {
            OperatorNode::And { children } | OperatorNode::Or { children } => {
                for child in children {
                    child.collect_matched(visit);
                }
            }
            OperatorNode::Match(_) => {}
        }
    }

    fn children_mut(&mut self) -> &mut [Operator] {
        match &mut self.node {
            OperatorNode::And { children } | OperatorNode::Or { children } => {
                children.as_mut_slice()
            }
            OperatorNode::Match(_) => &mut [],
        }
    }
}

/// Match one event against a match spec; `Some(captured)` on success.
fn match_event(
    spec: &MatchSpec,
    event: &Event,
    reference_env: Option<&EnvList>,
) -> Option<EnvList> {
    if spec.name != event.name {
        return None;
    }

    let mut captured = EnvList::new();
    let mut position = 0usize;

    for arg in &spec.args {
        let (key, actual, want) = match arg {
            ArgMatch::Positional(want) => {
                let entry = event.env.entries().get(position)?;
                let (key, actual) = entry.split_once('=')?;
                position += 1;
                (key, actual, want)
            }
            ArgMatch::Key { key, value } => {
                let actual = event.env.get(key)?;
                (key.as_str(), actual, value)
            }
        };

        let matches = match want {
            ValueMatch::Literal(expected) => actual == expected,
            ValueMatch::Var(var) => match reference_env.and_then(|env| env.get(var)) {
                Some(expected) => actual == expected,
                None => false,
            },
        };
        if !matches {
            return None;
        }
        // Key came from event env or declaration; both are validated names.
        let _ = captured.set(key, actual);
    }

    Some(captured)
}

#[cfg(test)]
#[path = "operator_tests.rs"]
mod tests;
