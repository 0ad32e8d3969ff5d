// Copyright 2025 Cowboy AI, LLC.

//! Collaborator contracts consumed by the workflow engine
//!
//! The engine owns no domain state of its own. The entity whose status is
//! governed, the identity of the acting party and the record of completed
//! tasks all live behind these traits, implemented by the caller. Concrete
//! adapters implement [`StatusHolder`] directly; there is no runtime
//! member discovery.
//!
//! Simple in-crate implementations are provided for tests, demos and small
//! callers that do not bring their own.

use crate::errors::{WorkflowError, WorkflowResult};
use crate::types::{RoleKind, StatusKind, TaskKind};
use indexmap::IndexSet;
use std::cell::RefCell;

/// The externally owned entity whose status the workflow reads and mutates
pub trait StatusHolder<S: StatusKind> {
    /// Current status
    fn status(&self) -> S;

    /// Replace the status; called by the machine on each transition
    fn set_status(&mut self, status: S);

    /// Version key of the workflow configuration that produced this holder,
    /// if one has been stamped
    fn version_key(&self) -> Option<&str>;

    /// Stamp the version key
    fn set_version_key(&mut self, key: &str);
}

/// Provides the roles the caller is currently impersonating
pub trait RoleProvider<R: RoleKind> {
    /// The current impersonations. Never empty: querying permissions with
    /// no role set is a usage error.
    fn current_roles(&self) -> WorkflowResult<Vec<R>>;
}

/// Provides the set of tasks already completed for the bound entity,
/// consulted by "require these tasks already done" guards
pub trait TaskCompletionProvider<T: TaskKind> {
    /// Tasks completed so far
    fn completed_tasks(&self) -> Vec<T>;
}

/// Minimal owned status holder
///
/// Concrete domain entities normally implement [`StatusHolder`] themselves;
/// this struct is for tests and callers without an entity of their own.
#[derive(Debug, Clone)]
pub struct SimpleStatusHolder<S: StatusKind> {
    status: S,
    version_key: Option<String>,
}

impl<S: StatusKind> SimpleStatusHolder<S> {
    /// Create a holder in the given initial status with no version key
    pub fn new(initial: S) -> Self {
        Self {
            status: initial,
            version_key: None,
        }
    }
}

impl<S: StatusKind> StatusHolder<S> for SimpleStatusHolder<S> {
    fn status(&self) -> S {
        self.status
    }

    fn set_status(&mut self, status: S) {
        self.status = status;
    }

    fn version_key(&self) -> Option<&str> {
        self.version_key.as_deref()
    }

    fn set_version_key(&mut self, key: &str) {
        self.version_key = Some(key.to_string());
    }
}

/// Role provider driven explicitly by the caller
///
/// Tests and interactive callers set the impersonated roles before acting:
///
/// ```rust
/// use flowgate::{ManualRoleProvider, RoleProvider};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Actor { Waiter, Customer }
///
/// let provider = ManualRoleProvider::new();
/// assert!(provider.current_roles().is_err());
///
/// provider.impersonate([Actor::Waiter, Actor::Customer]);
/// assert_eq!(provider.current_roles().unwrap(), vec![Actor::Waiter, Actor::Customer]);
/// ```
#[derive(Debug, Default)]
pub struct ManualRoleProvider<R: RoleKind> {
    roles: RefCell<Vec<R>>,
}

impl<R: RoleKind> ManualRoleProvider<R> {
    /// Create a provider with no impersonation set
    pub fn new() -> Self {
        Self {
            roles: RefCell::new(Vec::new()),
        }
    }

    /// Replace the current impersonations
    pub fn impersonate(&self, roles: impl IntoIterator<Item = R>) {
        *self.roles.borrow_mut() = roles.into_iter().collect();
    }

    /// Drop all impersonations
    pub fn clear(&self) {
        self.roles.borrow_mut().clear();
    }
}

impl<R: RoleKind> RoleProvider<R> for ManualRoleProvider<R> {
    fn current_roles(&self) -> WorkflowResult<Vec<R>> {
        let roles = self.roles.borrow();
        if roles.is_empty() {
            return Err(WorkflowError::NoRolesImpersonated);
        }
        Ok(roles.clone())
    }
}

/// Task completion record driven explicitly by the caller
#[derive(Debug, Default)]
pub struct ManualTaskCompletion<T: TaskKind> {
    done: RefCell<IndexSet<T>>,
}

impl<T: TaskKind> ManualTaskCompletion<T> {
    /// Create an empty completion record
    pub fn new() -> Self {
        Self {
            done: RefCell::new(IndexSet::new()),
        }
    }

    /// Mark a task as completed
    pub fn complete(&self, task: T) {
        self.done.borrow_mut().insert(task);
    }

    /// Forget every completion
    pub fn reset(&self) {
        self.done.borrow_mut().clear();
    }
}

impl<T: TaskKind> TaskCompletionProvider<T> for ManualTaskCompletion<T> {
    fn completed_tasks(&self) -> Vec<T> {
        self.done.borrow().iter().copied().collect()
    }
}
