// Copyright 2025 Cowboy AI, LLC.

//! Transition guards and guard aggregation
//!
//! A [`Guard`] is a named boolean predicate: the predicate decides, the
//! description explains the decision to a human. Guards never combine
//! themselves; the orchestrator collects them into a [`GuardSet`] per
//! configured transition and the set is evaluated as a whole.
//!
//! Aggregation never short-circuits: every guard in a set runs on every
//! evaluation so the failure report can name every unmet condition, not
//! just the first one. The outcome is a plain value
//! ([`GuardEvaluation`]) that the state machine branches on according to
//! the transition's [`GuardPolicy`].

use crate::describe::{join_described, split_camel_case};
use crate::errors::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// A named boolean predicate gating a transition or task
#[derive(Clone)]
pub struct Guard {
    predicate: Rc<dyn Fn() -> bool>,
    description: String,
}

impl Guard {
    /// Create a guard from a predicate and a description.
    ///
    /// The description is what failure reports show, so a blank one is a
    /// configuration error.
    pub fn new(
        predicate: impl Fn() -> bool + 'static,
        description: impl Into<String>,
    ) -> WorkflowResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(WorkflowError::MissingGuardDescription);
        }
        Ok(Self {
            predicate: Rc::new(predicate),
            description,
        })
    }

    /// Evaluate the predicate
    pub fn check(&self) -> bool {
        (self.predicate)()
    }

    /// The raw description, as declared
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The description rendered for humans
    pub fn described(&self) -> String {
        split_camel_case(&self.description)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("description", &self.description)
            .finish()
    }
}

/// How a failing guard aggregate is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardPolicy {
    /// A reachable transition with a failing aggregate raises a
    /// descriptive error naming every failed guard
    Strict,
    /// The transition is simply not offered. Required whenever several
    /// destination statuses share one activity, so one destination's
    /// failure leaves its siblings a chance to match
    Soft,
}

/// Result of evaluating a guard aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEvaluation {
    /// Every guard passed
    Pass,
    /// At least one guard failed; descriptions in declaration order
    Fail(Vec<String>),
}

impl GuardEvaluation {
    /// True when every guard passed
    pub fn is_pass(&self) -> bool {
        matches!(self, GuardEvaluation::Pass)
    }

    /// The failed guard descriptions, empty on a pass
    pub fn failed(&self) -> &[String] {
        match self {
            GuardEvaluation::Pass => &[],
            GuardEvaluation::Fail(descriptions) => descriptions,
        }
    }
}

/// An ordered collection of guards evaluated as one aggregate
#[derive(Clone, Debug, Default)]
pub struct GuardSet {
    guards: Vec<Guard>,
}

impl GuardSet {
    /// Create an empty set (always passes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect guards preserving declaration order
    pub fn from_guards(guards: impl IntoIterator<Item = Guard>) -> Self {
        Self {
            guards: guards.into_iter().collect(),
        }
    }

    /// Append a guard
    pub fn push(&mut self, guard: Guard) {
        self.guards.push(guard);
    }

    /// True when the set holds no guards
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Evaluate every guard unconditionally and collect the failures.
    ///
    /// Failure descriptions are rendered for humans and appear in
    /// declaration order.
    pub fn evaluate(&self) -> GuardEvaluation {
        let failed: Vec<String> = self
            .guards
            .iter()
            .filter(|guard| !guard.check())
            .map(Guard::described)
            .collect();

        if failed.is_empty() {
            GuardEvaluation::Pass
        } else {
            GuardEvaluation::Fail(failed)
        }
    }

    /// Human-readable summary of every guard in the set
    pub fn summary(&self) -> String {
        join_described(self.guards.iter().map(Guard::described))
    }
}
