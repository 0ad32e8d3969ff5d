//! Deterministic finite state machine driven by activities
//!
//! The machine never owns the status it governs: it reads and writes it
//! through caller-supplied accessor closures, so the status lives in the
//! entity the workflow is bound to. Configuration is fluent and per
//! status, in the declaration order the caller writes it:
//!
//! - `permit` / `permit_if`: transition to another status, optionally
//!   gated by a guard aggregate with an explicit reporting policy
//! - `permit_reentry`: transition back into the same status, running its
//!   entry actions again
//! - `internal_transition`: run an action without leaving the status
//! - `ignore`: accept the activity and do nothing
//! - `on_entry_from`: action run after entering the status through a
//!   given activity
//!
//! Candidates for one (status, activity) pair are tried in declaration
//! order; the first whose guards pass wins. A failing `Strict` candidate
//! raises [`WorkflowError::UnmetTransitionGuards`] with every failed
//! guard's description; a failing `Soft` candidate leaves its siblings a
//! chance to match. `permitted_triggers` always evaluates softly.

use crate::errors::{WorkflowError, WorkflowResult};
use crate::guard::{GuardEvaluation, GuardPolicy, GuardSet};
use crate::types::{kind_name, ActivityKind, StatusKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::rc::Rc;
use uuid::Uuid;

/// Record of a fired status transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition<S, A> {
    /// The status before the transition
    pub source: S,
    /// The status after the transition
    pub destination: S,
    /// The activity that triggered the transition
    pub activity: A,
    /// Unique identifier for this transition instance
    pub transition_id: Uuid,
    /// When the transition occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<S: StatusKind, A: ActivityKind> Transition<S, A> {
    fn record(source: S, destination: S, activity: A) -> Self {
        Self {
            source,
            destination,
            activity,
            transition_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// True when source and destination are the same status
    pub fn is_reentry(&self) -> bool {
        self.source == self.destination
    }
}

/// Optional argument carried by a fire call into entry and internal actions
pub struct FireArg<'a> {
    value: Option<&'a dyn Any>,
}

impl<'a> FireArg<'a> {
    /// No argument
    pub fn none() -> Self {
        Self { value: None }
    }

    /// Wrap a borrowed argument
    pub fn of<V: Any>(value: &'a V) -> Self {
        Self { value: Some(value) }
    }

    /// Downcast the argument to a concrete type
    pub fn get<V: Any>(&self) -> Option<&'a V> {
        self.value.and_then(|v| v.downcast_ref::<V>())
    }

    /// True when an argument was supplied
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

type EntryAction<S, A> = Rc<dyn Fn(&Transition<S, A>, &FireArg<'_>)>;
type Observer<S, A> = Rc<dyn Fn(&Transition<S, A>)>;

enum TransitionKind<S, A> {
    Transition(S),
    Reentry,
    Internal(EntryAction<S, A>),
    Ignore,
}

struct TransitionEntry<S, A> {
    activity: A,
    kind: TransitionKind<S, A>,
    guards: GuardSet,
    policy: GuardPolicy,
}

struct StateConfig<S, A> {
    entries: Vec<TransitionEntry<S, A>>,
    entry_actions: Vec<(A, EntryAction<S, A>)>,
}

impl<S, A> Default for StateConfig<S, A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            entry_actions: Vec::new(),
        }
    }
}

/// Accumulates per-status configuration before the machine is built
pub struct MachineBuilder<S: StatusKind, A: ActivityKind> {
    states: IndexMap<S, StateConfig<S, A>>,
}

impl<S: StatusKind, A: ActivityKind> Default for MachineBuilder<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StatusKind, A: ActivityKind> MachineBuilder<S, A> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            states: IndexMap::new(),
        }
    }

    /// Open the configuration of one status
    pub fn configure(&mut self, status: S) -> StateConfigurator<'_, S, A> {
        StateConfigurator {
            config: self.states.entry(status).or_default(),
        }
    }

    /// Finalize into a machine bound to the given status accessors
    pub fn build(
        self,
        status_get: impl Fn() -> S + 'static,
        status_set: impl Fn(S) + 'static,
    ) -> StateMachine<S, A> {
        StateMachine {
            states: self.states,
            status_get: Box::new(status_get),
            status_set: Box::new(status_set),
            observers: Vec::new(),
        }
    }
}

/// Fluent configuration of a single status
pub struct StateConfigurator<'m, S: StatusKind, A: ActivityKind> {
    config: &'m mut StateConfig<S, A>,
}

impl<'m, S: StatusKind, A: ActivityKind> StateConfigurator<'m, S, A> {
    /// Permit an unconditional transition
    pub fn permit(self, activity: A, destination: S) -> Self {
        self.push(activity, TransitionKind::Transition(destination), GuardSet::new(), GuardPolicy::Soft)
    }

    /// Permit a transition gated by a guard aggregate with an explicit
    /// reporting policy
    pub fn permit_if(
        self,
        activity: A,
        destination: S,
        guards: GuardSet,
        policy: GuardPolicy,
    ) -> Self {
        self.push(activity, TransitionKind::Transition(destination), guards, policy)
    }

    /// Permit re-entering the current status, running its entry actions
    pub fn permit_reentry(self, activity: A) -> Self {
        self.push(activity, TransitionKind::Reentry, GuardSet::new(), GuardPolicy::Soft)
    }

    /// Permit a guarded re-entry
    pub fn permit_reentry_if(self, activity: A, guards: GuardSet, policy: GuardPolicy) -> Self {
        self.push(activity, TransitionKind::Reentry, guards, policy)
    }

    /// Run an action on the activity without leaving the status
    pub fn internal_transition(
        self,
        activity: A,
        action: impl Fn(&Transition<S, A>, &FireArg<'_>) + 'static,
    ) -> Self {
        self.push(
            activity,
            TransitionKind::Internal(Rc::new(action)),
            GuardSet::new(),
            GuardPolicy::Soft,
        )
    }

    /// Accept the activity and do nothing
    pub fn ignore(self, activity: A) -> Self {
        self.push(activity, TransitionKind::Ignore, GuardSet::new(), GuardPolicy::Soft)
    }

    /// Register an action run after entering this status through the given
    /// activity. The action receives the transition record and the fire
    /// argument, if any.
    pub fn on_entry_from(
        self,
        activity: A,
        action: impl Fn(&Transition<S, A>, &FireArg<'_>) + 'static,
    ) -> Self {
        self.config.entry_actions.push((activity, Rc::new(action)));
        self
    }

    fn push(self, activity: A, kind: TransitionKind<S, A>, guards: GuardSet, policy: GuardPolicy) -> Self {
        self.config.entries.push(TransitionEntry {
            activity,
            kind,
            guards,
            policy,
        });
        self
    }
}

/// A configured state machine over externally held status
pub struct StateMachine<S: StatusKind, A: ActivityKind> {
    states: IndexMap<S, StateConfig<S, A>>,
    status_get: Box<dyn Fn() -> S>,
    status_set: Box<dyn Fn(S)>,
    observers: Vec<Observer<S, A>>,
}

impl<S: StatusKind, A: ActivityKind> StateMachine<S, A> {
    /// Start accumulating configuration
    pub fn builder() -> MachineBuilder<S, A> {
        MachineBuilder::new()
    }

    /// Register a callback invoked after every completed transition
    pub fn on_transitioned(&mut self, observer: impl Fn(&Transition<S, A>) + 'static) {
        self.observers.push(Rc::new(observer));
    }

    /// The status currently reported by the bound accessor
    pub fn state(&self) -> S {
        (self.status_get)()
    }

    /// Fire an activity without an argument
    pub fn fire(&self, activity: A) -> WorkflowResult<()> {
        self.fire_with(activity, &FireArg::none())
    }

    /// Fire an activity, carrying an argument into entry and internal
    /// actions
    pub fn fire_with(&self, activity: A, arg: &FireArg<'_>) -> WorkflowResult<()> {
        let source = self.state();
        let not_permitted = || WorkflowError::ActivityNotPermitted {
            status: kind_name(&source),
            activity: kind_name(&activity),
        };

        let config = self.states.get(&source).ok_or_else(&not_permitted)?;
        let candidates: Vec<&TransitionEntry<S, A>> = config
            .entries
            .iter()
            .filter(|entry| entry.activity == activity)
            .collect();
        if candidates.is_empty() {
            return Err(not_permitted());
        }

        for entry in candidates {
            match entry.guards.evaluate() {
                GuardEvaluation::Pass => return self.execute(source, activity, entry, arg),
                GuardEvaluation::Fail(failed) => match entry.policy {
                    GuardPolicy::Soft => continue,
                    GuardPolicy::Strict => {
                        return Err(WorkflowError::UnmetTransitionGuards {
                            status: kind_name(&source),
                            activity: kind_name(&activity),
                            destination: kind_name(&self.destination_of(source, entry)),
                            failed_guards: failed,
                        })
                    }
                },
            }
        }

        Err(not_permitted())
    }

    /// The activities currently accepted from the bound status.
    ///
    /// Guards are evaluated softly: a guarded candidate whose aggregate
    /// fails is simply not listed. Ignored and internal activities count
    /// as accepted.
    pub fn permitted_triggers(&self) -> Vec<A> {
        let source = self.state();
        let mut permitted = Vec::new();

        if let Some(config) = self.states.get(&source) {
            for entry in &config.entries {
                if permitted.contains(&entry.activity) {
                    continue;
                }
                if entry.guards.evaluate().is_pass() {
                    permitted.push(entry.activity);
                }
            }
        }

        permitted
    }

    /// Export the configured transition table in DOT format
    pub fn to_dot_graph(&self) -> String {
        let mut lines = vec!["digraph {".to_string()];

        for (status, config) in &self.states {
            for entry in &config.entries {
                let destination = match &entry.kind {
                    TransitionKind::Transition(dest) => *dest,
                    TransitionKind::Reentry => *status,
                    TransitionKind::Internal(_) | TransitionKind::Ignore => continue,
                };
                let label = if entry.guards.is_empty() {
                    kind_name(&entry.activity)
                } else {
                    format!("{} [{}]", kind_name(&entry.activity), entry.guards.summary())
                };
                lines.push(format!(
                    "    \"{}\" -> \"{}\" [label=\"{}\"];",
                    kind_name(status),
                    kind_name(&destination),
                    label
                ));
            }
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    fn destination_of(&self, source: S, entry: &TransitionEntry<S, A>) -> S {
        match &entry.kind {
            TransitionKind::Transition(dest) => *dest,
            _ => source,
        }
    }

    fn execute(
        &self,
        source: S,
        activity: A,
        entry: &TransitionEntry<S, A>,
        arg: &FireArg<'_>,
    ) -> WorkflowResult<()> {
        match &entry.kind {
            TransitionKind::Ignore => Ok(()),
            TransitionKind::Internal(action) => {
                let transition = Transition::record(source, source, activity);
                action(&transition, arg);
                Ok(())
            }
            TransitionKind::Reentry => self.complete(Transition::record(source, source, activity), arg),
            TransitionKind::Transition(destination) => {
                self.complete(Transition::record(source, *destination, activity), arg)
            }
        }
    }

    fn complete(&self, transition: Transition<S, A>, arg: &FireArg<'_>) -> WorkflowResult<()> {
        (self.status_set)(transition.destination);

        tracing::debug!(
            target: "flowgate::transition",
            source = ?transition.source,
            destination = ?transition.destination,
            activity = ?transition.activity,
            "status transition"
        );

        if let Some(config) = self.states.get(&transition.destination) {
            for (activity, action) in &config.entry_actions {
                if *activity == transition.activity {
                    action(&transition, arg);
                }
            }
        }

        for observer in &self.observers {
            observer(&transition);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::Guard;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    enum Phase {
        Draft,
        Review,
        Published,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    enum Act {
        Submit,
        Approve,
        Touch,
        Poke,
    }

    fn machine_over(
        initial: Phase,
        configure: impl FnOnce(&mut MachineBuilder<Phase, Act>),
    ) -> (StateMachine<Phase, Act>, Rc<Cell<Phase>>) {
        let status = Rc::new(Cell::new(initial));
        let mut builder = StateMachine::builder();
        configure(&mut builder);

        let get = status.clone();
        let set = status.clone();
        let machine = builder.build(move || get.get(), move |s| set.set(s));
        (machine, status)
    }

    #[test]
    fn test_fire_moves_through_configured_transitions() {
        let (machine, status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).permit(Act::Submit, Phase::Review);
            builder.configure(Phase::Review).permit(Act::Approve, Phase::Published);
        });

        machine.fire(Act::Submit).unwrap();
        assert_eq!(status.get(), Phase::Review);

        machine.fire(Act::Approve).unwrap();
        assert_eq!(status.get(), Phase::Published);
    }

    #[test]
    fn test_unconfigured_activity_is_rejected() {
        let (machine, status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).permit(Act::Submit, Phase::Review);
        });

        let err = machine.fire(Act::Approve).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No valid leaving transitions are permitted from status 'Draft' for activity \
             'Approve'. Consider ignoring the activity"
        );
        assert_eq!(status.get(), Phase::Draft);
    }

    #[test]
    fn test_strict_guard_failure_reports_every_failed_guard() {
        let (machine, status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).permit_if(
                Act::Submit,
                Phase::Review,
                GuardSet::from_guards([
                    Guard::new(|| false, "SpellCheckDone").unwrap(),
                    Guard::new(|| true, "HasTitle").unwrap(),
                    Guard::new(|| false, "HasReviewerAssigned").unwrap(),
                ]),
                GuardPolicy::Strict,
            );
        });

        let err = machine.fire(Act::Submit).unwrap_err();
        match err {
            WorkflowError::UnmetTransitionGuards {
                status: state,
                activity,
                destination,
                failed_guards,
            } => {
                assert_eq!(state, "Draft");
                assert_eq!(activity, "Submit");
                assert_eq!(destination, "Review");
                assert_eq!(
                    failed_guards,
                    vec![
                        "spell check done".to_string(),
                        "has reviewer assigned".to_string()
                    ]
                );
            }
            other => panic!("expected UnmetTransitionGuards, got {:?}", other),
        }
        assert_eq!(status.get(), Phase::Draft);
    }

    #[test]
    fn test_soft_siblings_let_the_passing_destination_win() {
        // Two destinations share one activity; the failing one must not
        // block its sibling.
        let reviewed = Rc::new(Cell::new(false));
        let flag = reviewed.clone();

        let (machine, status) = machine_over(Phase::Draft, move |builder| {
            let to_review = flag.clone();
            let to_published = flag;
            builder
                .configure(Phase::Draft)
                .permit_if(
                    Act::Submit,
                    Phase::Review,
                    GuardSet::from_guards([Guard::new(move || !to_review.get(), "NeedsReview").unwrap()]),
                    GuardPolicy::Soft,
                )
                .permit_if(
                    Act::Submit,
                    Phase::Published,
                    GuardSet::from_guards([Guard::new(move || to_published.get(), "AlreadyReviewed").unwrap()]),
                    GuardPolicy::Soft,
                );
        });

        machine.fire(Act::Submit).unwrap();
        assert_eq!(status.get(), Phase::Review);

        status.set(Phase::Draft);
        reviewed.set(true);
        machine.fire(Act::Submit).unwrap();
        assert_eq!(status.get(), Phase::Published);
    }

    #[test]
    fn test_all_soft_candidates_failing_is_activity_not_permitted() {
        let (machine, _status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).permit_if(
                Act::Submit,
                Phase::Review,
                GuardSet::from_guards([Guard::new(|| false, "NeedsReview").unwrap()]),
                GuardPolicy::Soft,
            );
        });

        let err = machine.fire(Act::Submit).unwrap_err();
        assert!(matches!(err, WorkflowError::ActivityNotPermitted { .. }));
    }

    #[test]
    fn test_permitted_triggers_evaluate_softly() {
        let open = Rc::new(Cell::new(false));
        let flag = open.clone();

        let (machine, _status) = machine_over(Phase::Draft, move |builder| {
            builder
                .configure(Phase::Draft)
                .permit_if(
                    Act::Submit,
                    Phase::Review,
                    GuardSet::from_guards([Guard::new(move || flag.get(), "ReviewOpen").unwrap()]),
                    GuardPolicy::Strict,
                )
                .ignore(Act::Touch);
        });

        // Strict guards never raise from the query path
        assert_eq!(machine.permitted_triggers(), vec![Act::Touch]);

        open.set(true);
        assert_eq!(machine.permitted_triggers(), vec![Act::Submit, Act::Touch]);
    }

    #[test]
    fn test_ignore_accepts_without_effect() {
        let (machine, status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).ignore(Act::Touch);
        });

        machine.fire(Act::Touch).unwrap();
        assert_eq!(status.get(), Phase::Draft);
    }

    #[test]
    fn test_internal_transition_runs_action_in_place() {
        let poked = Rc::new(Cell::new(0));
        let count = poked.clone();

        let (machine, status) = machine_over(Phase::Draft, move |builder| {
            builder.configure(Phase::Draft).internal_transition(Act::Poke, move |t, _arg| {
                assert_eq!(t.source, t.destination);
                count.set(count.get() + 1);
            });
        });

        machine.fire(Act::Poke).unwrap();
        machine.fire(Act::Poke).unwrap();
        assert_eq!(poked.get(), 2);
        assert_eq!(status.get(), Phase::Draft);
    }

    #[test]
    fn test_reentry_runs_entry_actions_again() {
        let entered = Rc::new(Cell::new(0));
        let count = entered.clone();

        let (machine, status) = machine_over(Phase::Review, move |builder| {
            builder
                .configure(Phase::Review)
                .permit_reentry(Act::Touch)
                .on_entry_from(Act::Touch, move |_t, _arg| count.set(count.get() + 1));
        });

        machine.fire(Act::Touch).unwrap();
        machine.fire(Act::Touch).unwrap();
        assert_eq!(entered.get(), 2);
        assert_eq!(status.get(), Phase::Review);
    }

    #[test]
    fn test_entry_action_receives_fire_argument() {
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = seen.clone();

        let (machine, _status) = machine_over(Phase::Draft, move |builder| {
            builder.configure(Phase::Draft).permit(Act::Submit, Phase::Review);
            builder.configure(Phase::Review).on_entry_from(Act::Submit, move |_t, arg| {
                if let Some(note) = arg.get::<String>() {
                    *sink.borrow_mut() = note.clone();
                }
            });
        });

        let note = "first draft".to_string();
        machine.fire_with(Act::Submit, &FireArg::of(&note)).unwrap();
        assert_eq!(*seen.borrow(), "first draft");
    }

    #[test]
    fn test_observers_see_completed_transitions_only() {
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let log = transitions.clone();

        let (mut machine, _status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).permit(Act::Submit, Phase::Review).ignore(Act::Touch);
        });
        machine.on_transitioned(move |t| log.borrow_mut().push((t.source, t.destination, t.activity)));

        machine.fire(Act::Touch).unwrap();
        machine.fire(Act::Submit).unwrap();

        assert_eq!(
            *transitions.borrow(),
            vec![(Phase::Draft, Phase::Review, Act::Submit)]
        );
    }

    #[test]
    fn test_transition_record_serializes_for_persistence_hooks() {
        let transition = Transition::record(Phase::Draft, Phase::Review, Act::Submit);

        let json = serde_json::to_value(&transition).unwrap();
        assert_eq!(json["source"], "Draft");
        assert_eq!(json["destination"], "Review");
        assert_eq!(json["activity"], "Submit");
        assert!(json["transition_id"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_dot_graph_lists_transitions_with_guard_labels() {
        let (machine, _status) = machine_over(Phase::Draft, |builder| {
            builder.configure(Phase::Draft).permit_if(
                Act::Submit,
                Phase::Review,
                GuardSet::from_guards([Guard::new(|| true, "SpellCheckDone").unwrap()]),
                GuardPolicy::Strict,
            );
            builder.configure(Phase::Review).permit(Act::Approve, Phase::Published);
        });

        let dot = machine.to_dot_graph();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"Draft\" -> \"Review\" [label=\"Submit [spell check done]\"];"));
        assert!(dot.contains("\"Review\" -> \"Published\" [label=\"Approve\"];"));
        assert!(dot.ends_with("}"));
    }
}
