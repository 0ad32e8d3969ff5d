// Copyright 2025 Cowboy AI, LLC.

//! Task restrictions - which tasks are permitted in which statuses
//!
//! A [`Restriction`] pairs one task with the whitelist of statuses under
//! which it is permitted. A [`RestrictionTable`] holds every restriction
//! declared for one role, resolves payload objects to tasks, and answers
//! permission queries against the entity's current status through a bound
//! accessor.
//!
//! Tables are populated during the configuration phase through the
//! declarative idiom "these tasks are permitted exactly when status is one
//! of these":
//!
//! ```rust
//! use flowgate::RestrictionTable;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Status { CustomerArrived, WaitingForOrder }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum TaskType { GreetCustomer, ProvideMenu }
//!
//! let mut table = RestrictionTable::new();
//! table.bind_status_accessor(|| Status::CustomerArrived);
//! table
//!     .allow([TaskType::GreetCustomer, TaskType::ProvideMenu])
//!     .when([Status::CustomerArrived]);
//!
//! assert!(table.is_allowed(TaskType::GreetCustomer).unwrap());
//! ```

use crate::errors::{WorkflowError, WorkflowResult};
use crate::types::{StatusKind, TaskKind};
use indexmap::{IndexMap, IndexSet};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Declarative tag linking a payload type to the task it causes
///
/// Payload objects (commands, DTOs, form submissions) implement this to
/// participate in permission checks without an explicit cause map entry.
pub trait TaskCause<T: TaskKind> {
    /// The task this payload causes when applied
    fn task_cause(&self) -> T;
}

/// Explicit payload-type to task registration table
///
/// Built once during the configuration phase; when bound to a table it is
/// authoritative and an unmapped payload type is a configuration error.
#[derive(Debug, Clone, Default)]
pub struct CauseMap<T: TaskKind> {
    by_type: HashMap<TypeId, T>,
}

impl<T: TaskKind> CauseMap<T> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    /// Register a payload type as causing the given task
    pub fn register<P: Any>(mut self, task: T) -> Self {
        self.by_type.insert(TypeId::of::<P>(), task);
        self
    }

    /// Look up the task for a payload type
    pub fn task_for<P: Any>(&self) -> Option<T> {
        self.by_type.get(&TypeId::of::<P>()).copied()
    }
}

/// The set of statuses under which one task is permitted
///
/// Owned by one [`RestrictionTable`]; the whitelist grows during the
/// configuration phase and is idempotent under repeated unions.
pub struct Restriction<S: StatusKind, T: TaskKind> {
    task: T,
    whitelist: IndexSet<S>,
}

impl<S: StatusKind, T: TaskKind> Restriction<S, T> {
    fn new(task: T) -> Self {
        Self {
            task,
            whitelist: IndexSet::new(),
        }
    }

    /// The task this restriction governs
    pub fn task(&self) -> T {
        self.task
    }

    /// Union new statuses into the whitelist; duplicates are ignored
    pub fn extend(&mut self, statuses: impl IntoIterator<Item = S>) -> &mut Self {
        for status in statuses {
            self.whitelist.insert(status);
        }
        self
    }

    /// Membership test against the whitelist
    pub fn is_allowed(&self, status: S) -> bool {
        self.whitelist.contains(&status)
    }

    /// The whitelist, in registration order
    pub fn whitelist(&self) -> impl Iterator<Item = S> + '_ {
        self.whitelist.iter().copied()
    }
}

impl<S: StatusKind, T: TaskKind> fmt::Debug for Restriction<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restriction")
            .field("task", &self.task)
            .field("whitelist", &self.whitelist)
            .finish()
    }
}

/// Every restriction declared for one role
pub struct RestrictionTable<S: StatusKind, T: TaskKind> {
    restrictions: IndexMap<T, Restriction<S, T>>,
    cause_map: Option<CauseMap<T>>,
    status_accessor: Option<Rc<dyn Fn() -> S>>,
}

impl<S: StatusKind, T: TaskKind> Default for RestrictionTable<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StatusKind, T: TaskKind> RestrictionTable<S, T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            restrictions: IndexMap::new(),
            cause_map: None,
            status_accessor: None,
        }
    }

    /// Bind the closure reporting the entity's current status.
    ///
    /// Required before any status-dependent query; querying without it is
    /// a configuration error, not a business-logic outcome.
    pub fn bind_status_accessor(&mut self, accessor: impl Fn() -> S + 'static) -> &mut Self {
        self.status_accessor = Some(Rc::new(accessor));
        self
    }

    /// Bind an explicit payload-type to task map.
    ///
    /// Once bound the map is authoritative: payload types it does not name
    /// fail to resolve even when they carry a [`TaskCause`] tag.
    pub fn bind_cause_map(&mut self, map: CauseMap<T>) -> &mut Self {
        self.cause_map = Some(map);
        self
    }

    /// The single restriction for a task, created on first reference
    pub fn restriction_for(&mut self, task: T) -> &mut Restriction<S, T> {
        self.restrictions
            .entry(task)
            .or_insert_with(|| Restriction::new(task))
    }

    /// Start the declarative idiom "allow these tasks when status is in
    /// this set"
    pub fn allow(&mut self, tasks: impl IntoIterator<Item = T>) -> RestrictionBuilder<'_, S, T> {
        RestrictionBuilder {
            table: self,
            tasks: tasks.into_iter().collect(),
        }
    }

    /// The entity's current status through the bound accessor
    pub fn current_status(&self) -> WorkflowResult<S> {
        let accessor = self
            .status_accessor
            .as_ref()
            .ok_or(WorkflowError::MissingStatusAccessor)?;
        Ok(accessor())
    }

    /// True when a restriction exists for the task and its whitelist
    /// contains the current status
    pub fn is_allowed(&self, task: T) -> WorkflowResult<bool> {
        let status = self.current_status()?;
        Ok(self
            .restrictions
            .get(&task)
            .map(|restriction| restriction.is_allowed(status))
            .unwrap_or(false))
    }

    /// Resolve a payload to its task, then test it like [`Self::is_allowed`]
    pub fn is_allowed_payload<P>(&self, payload: &P) -> WorkflowResult<bool>
    where
        P: TaskCause<T> + Any,
    {
        let task = self.resolve_cause(payload)?;
        self.is_allowed(task)
    }

    /// Resolve a payload type through the bound cause map alone.
    ///
    /// Fails with a configuration error naming the type when the map does
    /// not know it (or no map is bound).
    pub fn mapped_task_for<P: Any>(&self) -> WorkflowResult<T> {
        self.cause_map
            .as_ref()
            .and_then(CauseMap::task_for::<P>)
            .ok_or_else(|| WorkflowError::UnmappedPayloadType {
                type_name: short_type_name::<P>(),
            })
    }

    /// Every task whose whitelist contains the current status
    pub fn allowed_tasks(&self) -> WorkflowResult<Vec<T>> {
        Ok(self.allowed_tasks_in(self.current_status()?))
    }

    /// Every task whose whitelist contains the given status
    pub fn allowed_tasks_in(&self, status: S) -> Vec<T> {
        self.restrictions
            .values()
            .filter(|restriction| restriction.is_allowed(status))
            .map(Restriction::task)
            .collect()
    }

    /// Union of all statuses ever registered for the task, for diagnostics
    pub fn statuses_for(&self, task: T) -> Vec<S> {
        self.restrictions
            .get(&task)
            .map(|restriction| restriction.whitelist().collect())
            .unwrap_or_default()
    }

    fn resolve_cause<P>(&self, payload: &P) -> WorkflowResult<T>
    where
        P: TaskCause<T> + Any,
    {
        match &self.cause_map {
            Some(_) => self.mapped_task_for::<P>(),
            None => Ok(payload.task_cause()),
        }
    }
}

impl<S: StatusKind, T: TaskKind> fmt::Debug for RestrictionTable<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestrictionTable")
            .field("restrictions", &self.restrictions)
            .field("cause_map", &self.cause_map)
            .field("has_status_accessor", &self.status_accessor.is_some())
            .finish()
    }
}

/// Fluent helper finishing an `allow(..)` declaration
pub struct RestrictionBuilder<'a, S: StatusKind, T: TaskKind> {
    table: &'a mut RestrictionTable<S, T>,
    tasks: Vec<T>,
}

impl<'a, S: StatusKind, T: TaskKind> RestrictionBuilder<'a, S, T> {
    /// Union the given statuses into every named task's whitelist and hand
    /// the table back for further declarations
    pub fn when(self, statuses: impl IntoIterator<Item = S>) -> &'a mut RestrictionTable<S, T> {
        let statuses: Vec<S> = statuses.into_iter().collect();
        for task in self.tasks {
            self.table
                .restriction_for(task)
                .extend(statuses.iter().copied());
        }
        self.table
    }
}

/// Last path segment of a type name, for error messages
pub(crate) fn short_type_name<P: ?Sized>() -> String {
    let full = std::any::type_name::<P>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}
