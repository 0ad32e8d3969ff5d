// Copyright 2025 Cowboy AI, LLC.

//! Controlled batch execution of task actions
//!
//! A [`TaskRunner`] maps tasks to zero-argument actions and is bound to
//! one task-aware workflow. `run()` executes the actions whose task is
//! currently permitted, in registration order. Not atomic: a failing
//! action stops the batch and the failure propagates; nothing is rolled
//! back.

use crate::errors::{WorkflowError, WorkflowResult};
use crate::task_workflow::TaskWorkflow;
use crate::types::{kind_name, ActivityKind, RoleKind, StatusKind, TaskKind};
use indexmap::IndexMap;
use serde::Serialize;

type TaskAction<'w> = Box<dyn FnMut() -> anyhow::Result<()> + 'w>;

/// Report of one runner batch: the tasks that actually ran
#[derive(Debug, Clone, Serialize)]
pub struct TaskRunReport<T> {
    /// Executed tasks, in execution order
    pub tasks: Vec<T>,
}

/// Registry of task actions bound to one workflow instance
pub struct TaskRunner<'w, S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> {
    workflow: &'w TaskWorkflow<S, A, T, R>,
    actions: IndexMap<T, TaskAction<'w>>,
}

impl<'w, S: StatusKind, A: ActivityKind, T: TaskKind, R: RoleKind> TaskRunner<'w, S, A, T, R> {
    /// Bind a runner to a workflow instance
    pub fn new(workflow: &'w TaskWorkflow<S, A, T, R>) -> Self {
        Self {
            workflow,
            actions: IndexMap::new(),
        }
    }

    /// Register an action for a task. Registration order is execution
    /// order; registering the same task again replaces its action.
    pub fn register(
        &mut self,
        task: T,
        action: impl FnMut() -> anyhow::Result<()> + 'w,
    ) -> &mut Self {
        self.actions.insert(task, Box::new(action));
        self
    }

    /// Run every registered action whose task is currently permitted.
    ///
    /// Raises [`WorkflowError::NoTasksPermitted`] without running anything
    /// when no task at all is permitted. A failing action aborts the rest
    /// of the batch.
    pub fn run(&mut self) -> WorkflowResult<TaskRunReport<T>> {
        self.workflow.require_any_allowed()?;

        // The batch is decided up front; an action mutating permissions
        // mid-run does not change what this run executes.
        let batch: Vec<bool> = self
            .actions
            .keys()
            .map(|task| self.workflow.allows(*task))
            .collect::<WorkflowResult<_>>()?;

        let mut executed = Vec::new();
        for (selected, (task, action)) in batch.into_iter().zip(self.actions.iter_mut()) {
            if !selected {
                continue;
            }
            action().map_err(|err| WorkflowError::TaskActionFailed {
                task: kind_name(task),
                message: format!("{:#}", err),
            })?;
            executed.push(*task);
        }

        Ok(TaskRunReport { tasks: executed })
    }
}
