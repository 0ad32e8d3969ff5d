// Copyright 2025 Cowboy AI, LLC.

//! Task-aware workflow orchestrator
//!
//! Extends the plain [`Workflow`] with the parallel task-permission model:
//! per-role [`RestrictionTable`]s declared at construction time, payload
//! resolution, and a "require these tasks already done" guard factory for
//! transition configuration.
//!
//! Every task query evaluates across ALL currently impersonated roles and
//! takes the logical union - a multi-role actor is exactly as permissive
//! as its most permissive role.

use crate::describe::join_described;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::guard::Guard;
use crate::machine::{MachineBuilder, Transition};
use crate::providers::{RoleProvider, StatusHolder, TaskCompletionProvider};
use crate::restriction::{short_type_name, RestrictionTable, TaskCause};
use crate::types::{kind_name, ActivityKind, RoleKind, StatusKind, TaskKind};
use crate::workflow::{
    attach_observers, build_machine, validate_version_key, FireIfResult, SharedStatusHolder,
    TransitionConfigurer, TransitionObserver, Workflow, WorkflowConfigurer,
};
use indexmap::{IndexMap, IndexSet};
use std::any::Any;
use std::rc::Rc;

type TaskConfigureFn<S, A, T, R> =
    Box<dyn FnOnce(&mut TaskWorkflowConfigurer<'_, S, A, T, R>) -> WorkflowResult<()>>;

/// Builder assembling a [`TaskWorkflow`]
pub struct TaskWorkflowBuilder<S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> {
    version_key: String,
    holder: SharedStatusHolder<S>,
    roles: Rc<dyn RoleProvider<R>>,
    tasks: Rc<dyn TaskCompletionProvider<T>>,
    observers: Vec<TransitionObserver<S, A>>,
    configure: Option<TaskConfigureFn<S, A, T, R>>,
}

impl<S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> TaskWorkflowBuilder<S, A, T, R> {
    /// Bind the version key, status holder, role provider and
    /// task-completion provider
    pub fn new(
        version_key: impl Into<String>,
        holder: SharedStatusHolder<S>,
        roles: Rc<dyn RoleProvider<R>>,
        tasks: Rc<dyn TaskCompletionProvider<T>>,
    ) -> Self {
        Self {
            version_key: version_key.into(),
            holder,
            roles,
            tasks,
            observers: Vec::new(),
            configure: None,
        }
    }

    /// Register a callback invoked after every successful transition
    pub fn on_transition(mut self, observer: impl Fn(&Transition<S, A>) + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Supply the one-shot configuration override
    pub fn configure(
        mut self,
        configure: impl FnOnce(&mut TaskWorkflowConfigurer<'_, S, A, T, R>) -> WorkflowResult<()>
            + 'static,
    ) -> Self {
        self.configure = Some(Box::new(configure));
        self
    }

    /// Validate the version key, run the configuration and freeze the
    /// instance
    pub fn build(self) -> WorkflowResult<TaskWorkflow<S, A, T, R>> {
        validate_version_key(&self.version_key, &self.holder)?;

        let mut machine_builder = MachineBuilder::new();
        let mut restrictions: IndexMap<R, RestrictionTable<S, T>> = IndexMap::new();

        if let Some(configure) = self.configure {
            let mut configurer = TaskWorkflowConfigurer {
                base: WorkflowConfigurer::new(&mut machine_builder, &self.roles),
                holder: &self.holder,
                tasks: &self.tasks,
                restrictions: &mut restrictions,
            };
            configure(&mut configurer)?;
        }

        let mut machine = build_machine(machine_builder, &self.holder);
        attach_observers(&mut machine, self.observers);

        Ok(TaskWorkflow {
            workflow: Workflow::from_parts(self.version_key, self.holder, self.roles, machine),
            restrictions,
            tasks: self.tasks,
        })
    }
}

/// Configuration surface for the task-aware builder
pub struct TaskWorkflowConfigurer<'a, S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> {
    base: WorkflowConfigurer<'a, S, A, R>,
    holder: &'a SharedStatusHolder<S>,
    tasks: &'a Rc<dyn TaskCompletionProvider<T>>,
    restrictions: &'a mut IndexMap<R, RestrictionTable<S, T>>,
}

impl<'a, S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind>
    TaskWorkflowConfigurer<'a, S, A, T, R>
{
    /// Open the configuration of one status
    pub fn state(&mut self, status: S) -> TransitionConfigurer<'_, S, A> {
        self.base.state(status)
    }

    /// Build a role guard over the bound role provider
    pub fn roles(&self, allowed: impl IntoIterator<Item = R>) -> WorkflowResult<Guard> {
        self.base.roles(allowed)
    }

    /// Build a guard requiring the given tasks to be already completed
    pub fn completed(&self, required: impl IntoIterator<Item = T>) -> WorkflowResult<Guard> {
        let required: Vec<T> = required.into_iter().collect();
        let description = join_described(required.iter().map(kind_name));

        let provider = Rc::clone(self.tasks);
        Guard::new(
            move || {
                let completed = provider.completed_tasks();
                required.iter().all(|task| completed.contains(task))
            },
            description,
        )
    }

    /// The restriction table for one role, created on first reference with
    /// its status accessor already bound to the workflow's entity
    pub fn tasks_for(&mut self, role: R) -> &mut RestrictionTable<S, T> {
        let holder = self.holder;
        self.restrictions.entry(role).or_insert_with(|| {
            let mut table = RestrictionTable::new();
            let current = Rc::clone(holder);
            table.bind_status_accessor(move || current.borrow().status());
            table
        })
    }
}

/// A workflow with the parallel task-permission model attached
pub struct TaskWorkflow<S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> {
    workflow: Workflow<S, A, R>,
    restrictions: IndexMap<R, RestrictionTable<S, T>>,
    tasks: Rc<dyn TaskCompletionProvider<T>>,
}

impl<S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> std::fmt::Debug
    for TaskWorkflow<S, A, T, R>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskWorkflow")
            .field("workflow", &self.workflow)
            .finish_non_exhaustive()
    }
}

impl<S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> TaskWorkflow<S, A, T, R> {
    /// The underlying plain workflow
    pub fn workflow(&self) -> &Workflow<S, A, R> {
        &self.workflow
    }

    /// True when the task is permitted under any currently impersonated
    /// role in the current status
    pub fn allows(&self, task: T) -> WorkflowResult<bool> {
        for role in self.workflow.current_roles()? {
            if let Some(table) = self.restrictions.get(&role) {
                if table.is_allowed(task)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Resolve a payload to its task per role table, then test it
    pub fn allows_payload<P>(&self, payload: &P) -> WorkflowResult<bool>
    where
        P: TaskCause<T> + Any,
    {
        for role in self.workflow.current_roles()? {
            if let Some(table) = self.restrictions.get(&role) {
                if table.is_allowed_payload(payload)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Negation of [`Self::allows`]
    pub fn denies(&self, task: T) -> WorkflowResult<bool> {
        Ok(!self.allows(task)?)
    }

    /// Negation of [`Self::allows_payload`]
    pub fn denies_payload<P>(&self, payload: &P) -> WorkflowResult<bool>
    where
        P: TaskCause<T> + Any,
    {
        Ok(!self.allows_payload(payload)?)
    }

    /// Raise unless the task is permitted
    pub fn require_allowed(&self, task: T) -> WorkflowResult<()> {
        if self.allows(task)? {
            return Ok(());
        }
        Err(WorkflowError::TaskNotPermitted {
            task: kind_name(&task),
            roles: self.current_role_names()?,
            status: self.workflow.current_status_name(),
        })
    }

    /// Raise unless the payload's task is permitted
    pub fn require_allowed_payload<P>(&self, payload: &P) -> WorkflowResult<()>
    where
        P: TaskCause<T> + Any,
    {
        if self.allows_payload(payload)? {
            return Ok(());
        }
        Err(WorkflowError::TaskNotPermitted {
            task: short_type_name::<P>(),
            roles: self.current_role_names()?,
            status: self.workflow.current_status_name(),
        })
    }

    /// True when at least one task is permitted right now
    pub fn allows_any(&self) -> WorkflowResult<bool> {
        for role in self.workflow.current_roles()? {
            if let Some(table) = self.restrictions.get(&role) {
                if !table.allowed_tasks()?.is_empty() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Raise unless at least one task is permitted right now
    pub fn require_any_allowed(&self) -> WorkflowResult<()> {
        if self.allows_any()? {
            return Ok(());
        }
        Err(WorkflowError::NoTasksPermitted {
            roles: self.current_role_names()?,
            status: self.workflow.current_status_name(),
        })
    }

    /// Every task permitted right now under the current impersonations,
    /// deduplicated, in declaration order
    pub fn permitted_tasks(&self) -> WorkflowResult<Vec<T>> {
        self.union_for(self.workflow.current_roles()?)
    }

    /// Every task permitted right now under an explicit role list
    pub fn permitted_tasks_for(
        &self,
        roles: impl IntoIterator<Item = R>,
    ) -> WorkflowResult<Vec<T>> {
        let roles: Vec<R> = roles.into_iter().collect();
        if roles.is_empty() {
            return Err(WorkflowError::EmptyRoleList);
        }
        self.union_for(roles)
    }

    /// Per-role report of which statuses ever allow the task, for
    /// diagnostics and UI support. Each entry pairs the role name with the
    /// comma-joined status names.
    pub fn permitted_statuses_for(&self, task: T) -> Vec<(String, String)> {
        self.restrictions
            .iter()
            .map(|(role, table)| {
                (
                    kind_name(role),
                    join_described(table.statuses_for(task).iter().map(kind_name)),
                )
            })
            .collect()
    }

    /// The tasks recorded as completed by the bound provider
    pub fn completed_tasks(&self) -> Vec<T> {
        self.tasks.completed_tasks()
    }

    /// The currently impersonated roles
    pub fn current_roles(&self) -> WorkflowResult<Vec<R>> {
        self.workflow.current_roles()
    }

    fn union_for(&self, roles: Vec<R>) -> WorkflowResult<Vec<T>> {
        let mut union: IndexSet<T> = IndexSet::new();
        for role in roles {
            if let Some(table) = self.restrictions.get(&role) {
                union.extend(table.allowed_tasks()?);
            }
        }
        Ok(union.into_iter().collect())
    }

    fn current_role_names(&self) -> WorkflowResult<String> {
        Ok(join_described(
            self.workflow.current_roles()?.iter().map(kind_name),
        ))
    }

    // Delegating pass-throughs for the transition surface

    /// See [`Workflow::fire`]
    pub fn fire(&self, activity: A) -> WorkflowResult<()> {
        self.workflow.fire(activity)
    }

    /// See [`Workflow::fire_with_arg`]
    pub fn fire_with_arg<V: Any>(&self, activity: A, arg: &V) -> WorkflowResult<()> {
        self.workflow.fire_with_arg(activity, arg)
    }

    /// See [`Workflow::fire_if`]
    pub fn fire_if(&self, expected: S, activity: A) -> WorkflowResult<FireIfResult<'_, S, A>> {
        self.workflow.fire_if(expected, activity)
    }

    /// See [`Workflow::fire_checked`]
    pub fn fire_checked(&self, activity: A) -> WorkflowResult<&Self> {
        self.workflow.fire_checked(activity)?;
        Ok(self)
    }

    /// See [`Workflow::permitted_activities`]
    pub fn permitted_activities(&self) -> Vec<A> {
        self.workflow.permitted_activities()
    }

    /// See [`Workflow::current_status`]
    pub fn current_status(&self) -> S {
        self.workflow.current_status()
    }

    /// See [`Workflow::current_status_name`]
    pub fn current_status_name(&self) -> String {
        self.workflow.current_status_name()
    }

    /// See [`Workflow::version_key`]
    pub fn version_key(&self) -> &str {
        self.workflow.version_key()
    }

    /// See [`Workflow::to_dot_graph`]
    pub fn to_dot_graph(&self) -> String {
        self.workflow.to_dot_graph()
    }
}
