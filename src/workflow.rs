// Copyright 2025 Cowboy AI, LLC.

//! Workflow orchestrator - a configured machine bound to one entity
//!
//! A [`Workflow`] binds exactly one status holder, one role provider and
//! one transition table for its whole lifetime. Construction goes through
//! [`WorkflowBuilder`]: the version key is stamped onto an unset holder or
//! validated against an existing stamp (a mismatch is fatal, so an entity
//! produced by an older configuration is never evaluated against a table
//! that has since evolved), then the configuration override runs exactly
//! once, then the instance is frozen.
//!
//! ```rust
//! use flowgate::{SimpleStatusHolder, ManualRoleProvider, WorkflowBuilder};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Status { Draft, Submitted }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Activity { Submit }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Actor { Agent }
//!
//! let holder = Rc::new(RefCell::new(SimpleStatusHolder::new(Status::Draft)));
//! let roles = Rc::new(ManualRoleProvider::new());
//! roles.impersonate([Actor::Agent]);
//!
//! let workflow = WorkflowBuilder::new("Application_V1", holder.clone(), roles.clone())
//!     .configure(|cfg| {
//!         let agent = cfg.roles([Actor::Agent])?;
//!         cfg.state(Status::Draft)
//!             .permit_for_roles(Activity::Submit, Status::Submitted, agent);
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! workflow.fire(Activity::Submit).unwrap();
//! assert_eq!(workflow.current_status(), Status::Submitted);
//! ```

use crate::describe::join_described;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::guard::{Guard, GuardPolicy, GuardSet};
use crate::machine::{FireArg, MachineBuilder, StateConfigurator, StateMachine, Transition};
use crate::providers::{RoleProvider, StatusHolder};
use crate::types::{kind_name, ActivityKind, RoleKind, StatusKind};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// Shared handle to the bound status holder
pub type SharedStatusHolder<S> = Rc<RefCell<dyn StatusHolder<S>>>;

pub(crate) type TransitionObserver<S, A> = Box<dyn Fn(&Transition<S, A>)>;
type ConfigureFn<S, A, R> = Box<dyn FnOnce(&mut WorkflowConfigurer<'_, S, A, R>) -> WorkflowResult<()>>;

/// Builder assembling a [`Workflow`]
pub struct WorkflowBuilder<S: StatusKind, A: ActivityKind, R: RoleKind> {
    version_key: String,
    holder: SharedStatusHolder<S>,
    roles: Rc<dyn RoleProvider<R>>,
    observers: Vec<TransitionObserver<S, A>>,
    configure: Option<ConfigureFn<S, A, R>>,
}

impl<S: StatusKind, A: ActivityKind, R: RoleKind> WorkflowBuilder<S, A, R> {
    /// Bind the version key, status holder and role provider
    pub fn new(
        version_key: impl Into<String>,
        holder: SharedStatusHolder<S>,
        roles: Rc<dyn RoleProvider<R>>,
    ) -> Self {
        Self {
            version_key: version_key.into(),
            holder,
            roles,
            observers: Vec::new(),
            configure: None,
        }
    }

    /// Register a callback invoked after every successful transition.
    ///
    /// Persisting transitions is the caller's concern; this hook is where
    /// it happens.
    pub fn on_transition(mut self, observer: impl Fn(&Transition<S, A>) + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Supply the one-shot configuration override
    pub fn configure(
        mut self,
        configure: impl FnOnce(&mut WorkflowConfigurer<'_, S, A, R>) -> WorkflowResult<()> + 'static,
    ) -> Self {
        self.configure = Some(Box::new(configure));
        self
    }

    /// Validate the version key, run the configuration and freeze the
    /// workflow instance
    pub fn build(self) -> WorkflowResult<Workflow<S, A, R>> {
        validate_version_key(&self.version_key, &self.holder)?;

        let mut machine_builder = MachineBuilder::new();
        if let Some(configure) = self.configure {
            let mut configurer = WorkflowConfigurer::new(&mut machine_builder, &self.roles);
            configure(&mut configurer)?;
        }

        let mut machine = build_machine(machine_builder, &self.holder);
        attach_observers(&mut machine, self.observers);

        Ok(Workflow::from_parts(
            self.version_key,
            self.holder,
            self.roles,
            machine,
        ))
    }
}

/// Attach the logging hook and the caller's observers to a built machine
pub(crate) fn attach_observers<S: StatusKind, A: ActivityKind>(
    machine: &mut StateMachine<S, A>,
    observers: Vec<TransitionObserver<S, A>>,
) {
    machine.on_transitioned(move |transition| {
        info!(
            target: "flowgate::workflow",
            source = ?transition.source,
            destination = ?transition.destination,
            activity = ?transition.activity,
            "workflow transition"
        );
        for observer in &observers {
            observer(transition);
        }
    });
}

/// Stamp an unset holder, validate an already-stamped one
pub(crate) fn validate_version_key<S: StatusKind>(
    version_key: &str,
    holder: &SharedStatusHolder<S>,
) -> WorkflowResult<()> {
    let existing = holder.borrow().version_key().map(str::to_string);
    match existing.as_deref() {
        None | Some("") => {
            holder.borrow_mut().set_version_key(version_key);
            Ok(())
        }
        Some(existing) if existing == version_key => Ok(()),
        Some(existing) => Err(WorkflowError::VersionKeyMismatch {
            holder_key: existing.to_string(),
            workflow_key: version_key.to_string(),
        }),
    }
}

/// Build the machine over accessor closures into the shared holder
pub(crate) fn build_machine<S: StatusKind, A: ActivityKind>(
    builder: MachineBuilder<S, A>,
    holder: &SharedStatusHolder<S>,
) -> StateMachine<S, A> {
    let get = Rc::clone(holder);
    let set = Rc::clone(holder);
    builder.build(
        move || get.borrow().status(),
        move |status| set.borrow_mut().set_status(status),
    )
}

/// Configuration surface handed to the construction-time override
pub struct WorkflowConfigurer<'a, S: StatusKind, A: ActivityKind, R: RoleKind> {
    machine: &'a mut MachineBuilder<S, A>,
    roles: &'a Rc<dyn RoleProvider<R>>,
}

impl<'a, S: StatusKind, A: ActivityKind, R: RoleKind> WorkflowConfigurer<'a, S, A, R> {
    pub(crate) fn new(machine: &'a mut MachineBuilder<S, A>, roles: &'a Rc<dyn RoleProvider<R>>) -> Self {
        Self { machine, roles }
    }

    /// Open the configuration of one status
    pub fn state(&mut self, status: S) -> TransitionConfigurer<'_, S, A> {
        TransitionConfigurer {
            inner: self.machine.configure(status),
        }
    }

    /// Build a role guard: passes while the current impersonations
    /// intersect the permitted set non-emptily
    pub fn roles(&self, allowed: impl IntoIterator<Item = R>) -> WorkflowResult<Guard> {
        role_guard(self.roles, allowed)
    }
}

pub(crate) fn role_guard<R: RoleKind>(
    provider: &Rc<dyn RoleProvider<R>>,
    allowed: impl IntoIterator<Item = R>,
) -> WorkflowResult<Guard> {
    let allowed: Vec<R> = allowed.into_iter().collect();
    let description = join_described(allowed.iter().map(kind_name));

    let provider = Rc::clone(provider);
    Guard::new(
        move || {
            provider
                .current_roles()
                .map(|current| current.iter().any(|role| allowed.contains(role)))
                .unwrap_or(false)
        },
        description,
    )
}

/// Per-status configuration with the guard-aggregation idioms layered on
/// top of the raw machine configurator
pub struct TransitionConfigurer<'m, S: StatusKind, A: ActivityKind> {
    inner: StateConfigurator<'m, S, A>,
}

impl<'m, S: StatusKind, A: ActivityKind> TransitionConfigurer<'m, S, A> {
    /// Permit an unconditional transition
    pub fn permit(self, activity: A, destination: S) -> Self {
        Self {
            inner: self.inner.permit(activity, destination),
        }
    }

    /// Permit a transition for the given roles only. Soft: a failing role
    /// guard means the transition is not offered.
    pub fn permit_for_roles(self, activity: A, destination: S, role_guard: Guard) -> Self {
        Self {
            inner: self.inner.permit_if(
                activity,
                destination,
                GuardSet::from_guards([role_guard]),
                GuardPolicy::Soft,
            ),
        }
    }

    /// Permit a transition only when the role guard and every further
    /// guard hold. Strict: if the transition is otherwise reachable but
    /// the aggregate fails, firing raises a failure naming every unmet
    /// condition.
    pub fn permit_only_if(
        self,
        activity: A,
        destination: S,
        role_guard: Guard,
        guards: impl IntoIterator<Item = Guard>,
    ) -> Self {
        let mut set = GuardSet::from_guards([role_guard]);
        for guard in guards {
            set.push(guard);
        }
        Self {
            inner: self
                .inner
                .permit_if(activity, destination, set, GuardPolicy::Strict),
        }
    }

    /// Permit a guarded transition softly. Use this whenever several
    /// destination statuses share one activity, so one destination's
    /// failing aggregate leaves its siblings a chance to match.
    pub fn permit_when(
        self,
        activity: A,
        destination: S,
        guards: impl IntoIterator<Item = Guard>,
    ) -> Self {
        Self {
            inner: self.inner.permit_if(
                activity,
                destination,
                GuardSet::from_guards(guards),
                GuardPolicy::Soft,
            ),
        }
    }

    /// Permit a guarded transition with an explicit policy
    pub fn permit_if(
        self,
        activity: A,
        destination: S,
        guards: GuardSet,
        policy: GuardPolicy,
    ) -> Self {
        Self {
            inner: self.inner.permit_if(activity, destination, guards, policy),
        }
    }

    /// Permit re-entering the current status
    pub fn permit_reentry(self, activity: A) -> Self {
        Self {
            inner: self.inner.permit_reentry(activity),
        }
    }

    /// Run an action on the activity without leaving the status
    pub fn internal_transition(
        self,
        activity: A,
        action: impl Fn(&Transition<S, A>, &FireArg<'_>) + 'static,
    ) -> Self {
        Self {
            inner: self.inner.internal_transition(activity, action),
        }
    }

    /// Accept the activity and do nothing
    pub fn ignore(self, activity: A) -> Self {
        Self {
            inner: self.inner.ignore(activity),
        }
    }

    /// Register an entry action for arrivals through the given activity
    pub fn on_entry_from(
        self,
        activity: A,
        action: impl Fn(&Transition<S, A>, &FireArg<'_>) + 'static,
    ) -> Self {
        Self {
            inner: self.inner.on_entry_from(activity, action),
        }
    }
}

/// A configured workflow bound to one status-holder entity
pub struct Workflow<S: StatusKind, A: ActivityKind, R: RoleKind> {
    version_key: String,
    holder: SharedStatusHolder<S>,
    roles: Rc<dyn RoleProvider<R>>,
    machine: StateMachine<S, A>,
}

impl<S: StatusKind, A: ActivityKind, R: RoleKind> std::fmt::Debug for Workflow<S, A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("version_key", &self.version_key)
            .finish_non_exhaustive()
    }
}

impl<S: StatusKind, A: ActivityKind, R: RoleKind> Workflow<S, A, R> {
    pub(crate) fn from_parts(
        version_key: String,
        holder: SharedStatusHolder<S>,
        roles: Rc<dyn RoleProvider<R>>,
        machine: StateMachine<S, A>,
    ) -> Self {
        Self {
            version_key,
            holder,
            roles,
            machine,
        }
    }

    /// The version key this instance was configured with
    pub fn version_key(&self) -> &str {
        &self.version_key
    }

    /// The entity's current status
    pub fn current_status(&self) -> S {
        self.holder.borrow().status()
    }

    /// The entity's current status rendered as a name
    pub fn current_status_name(&self) -> String {
        kind_name(&self.current_status())
    }

    /// The currently impersonated roles; empty impersonation is a usage
    /// error
    pub fn current_roles(&self) -> WorkflowResult<Vec<R>> {
        let roles = self.roles.current_roles()?;
        if roles.is_empty() {
            return Err(WorkflowError::NoRolesImpersonated);
        }
        Ok(roles)
    }

    /// Unconditionally request the transition; propagates whatever failure
    /// the machine raises
    pub fn fire(&self, activity: A) -> WorkflowResult<()> {
        self.machine.fire(activity)
    }

    /// Fire with an argument delivered to entry and internal actions
    pub fn fire_with_arg<V: Any>(&self, activity: A, arg: &V) -> WorkflowResult<()> {
        self.machine.fire_with(activity, &FireArg::of(arg))
    }

    /// Fire only when the current status equals `expected`.
    ///
    /// The result chains: `then_fire` fires a follow-up activity only if
    /// the first fire actually occurred, expressing multi-hop pass-through
    /// transitions as one call.
    pub fn fire_if(&self, expected: S, activity: A) -> WorkflowResult<FireIfResult<'_, S, A>> {
        let proceed = self.current_status() == expected;
        if proceed {
            self.machine.fire(activity)?;
        }
        Ok(FireIfResult {
            fired: proceed,
            machine: &self.machine,
        })
    }

    /// Fire only when the activity is currently listed among the permitted
    /// triggers; otherwise raise naming the current status and the
    /// attempted activity. Returns the workflow for chaining.
    pub fn fire_checked(&self, activity: A) -> WorkflowResult<&Self> {
        if !self.machine.permitted_triggers().contains(&activity) {
            return Err(WorkflowError::ActivityNotPermitted {
                status: self.current_status_name(),
                activity: kind_name(&activity),
            });
        }
        self.machine.fire(activity)?;
        Ok(self)
    }

    /// The machine's current permitted-trigger set, verbatim
    pub fn permitted_activities(&self) -> Vec<A> {
        self.machine.permitted_triggers()
    }

    /// Export the configured transition table in DOT format
    pub fn to_dot_graph(&self) -> String {
        self.machine.to_dot_graph()
    }

}

/// Chainable result of a conditional fire
pub struct FireIfResult<'a, S: StatusKind, A: ActivityKind> {
    fired: bool,
    machine: &'a StateMachine<S, A>,
}

impl<'a, S: StatusKind, A: ActivityKind> FireIfResult<'a, S, A> {
    /// Whether the conditional fire occurred
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Fire the follow-up activity only if the previous fire occurred
    pub fn then_fire(self, activity: A) -> WorkflowResult<Self> {
        if self.fired {
            self.machine.fire(activity)?;
        }
        Ok(self)
    }
}
