//! # Flowgate
//!
//! Role-aware workflow permission engine: governs which status transitions
//! and which fine-grained operations ("tasks") are currently permitted on a
//! business entity, given its current status and the role(s) of the acting
//! party.
//!
//! The crate layers two permission models over a compact deterministic
//! state machine:
//!
//! - **Transition guards**: each configured (activity, destination) pair
//!   carries a guard aggregate - a role guard, optional task-completion
//!   guard and free business predicates. Aggregates evaluate every guard
//!   on every query so failure reports can name every unmet condition.
//! - **Task restrictions**: a parallel permission model independent of
//!   transitions. Per role, each task carries a whitelist of statuses
//!   under which it is permitted; queries union across all currently
//!   impersonated roles.
//!
//! ## Design Principles
//!
//! 1. **Declare once, query many**: guards and restrictions are declared
//!    in a one-shot configuration override and read-only afterwards
//! 2. **Plain enums everywhere**: statuses, activities, roles and tasks
//!    are caller enums used directly as keys - no conversion layers
//! 3. **Explicit adapters**: the governed entity implements
//!    [`StatusHolder`] directly; no runtime member discovery
//! 4. **Pure guard evaluation**: aggregation produces a value to branch
//!    on, and the reporting policy (strict or soft) is an explicit,
//!    caller-selectable property of each transition
//! 5. **Synchronous and single-threaded**: every evaluation and firing
//!    completes within the calling stack; one orchestrator per entity
//!
//! ## Example
//!
//! ```rust
//! use flowgate::{ManualRoleProvider, ManualTaskCompletion, SimpleStatusHolder,
//!     TaskWorkflowBuilder};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Status { CustomerArrived, WaitingForOrder }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Activity { ProvideTable }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum TaskType { GreetCustomer }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Actor { Waiter }
//!
//! let order = Rc::new(RefCell::new(SimpleStatusHolder::new(Status::CustomerArrived)));
//! let actors = Rc::new(ManualRoleProvider::new());
//! let done = Rc::new(ManualTaskCompletion::new());
//! actors.impersonate([Actor::Waiter]);
//!
//! let workflow = TaskWorkflowBuilder::new("MealOrder_V1", order, actors.clone(), done.clone())
//!     .configure(|cfg| {
//!         let waiter = cfg.roles([Actor::Waiter])?;
//!         cfg.state(Status::CustomerArrived)
//!             .permit_for_roles(Activity::ProvideTable, Status::WaitingForOrder, waiter);
//!         cfg.tasks_for(Actor::Waiter)
//!             .allow([TaskType::GreetCustomer])
//!             .when([Status::CustomerArrived]);
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert!(workflow.allows(TaskType::GreetCustomer).unwrap());
//! workflow.fire(Activity::ProvideTable).unwrap();
//! assert!(workflow.denies(TaskType::GreetCustomer).unwrap());
//! ```

#![warn(missing_docs)]

mod describe;
mod errors;
mod guard;
mod machine;
mod providers;
mod restriction;
mod runner;
mod task_workflow;
mod types;
mod workflow;

// Re-export core types
pub use describe::{join_described, split_camel_case};
pub use errors::{WorkflowError, WorkflowResult};
pub use guard::{Guard, GuardEvaluation, GuardPolicy, GuardSet};
pub use machine::{
    FireArg, MachineBuilder, StateConfigurator, StateMachine, Transition,
};
pub use providers::{
    ManualRoleProvider, ManualTaskCompletion, RoleProvider, SimpleStatusHolder, StatusHolder,
    TaskCompletionProvider,
};
pub use restriction::{CauseMap, Restriction, RestrictionBuilder, RestrictionTable, TaskCause};
pub use runner::{TaskRunReport, TaskRunner};
pub use task_workflow::{TaskWorkflow, TaskWorkflowBuilder, TaskWorkflowConfigurer};
pub use types::{kind_name, ActivityKind, RoleKind, StatusKind, TaskKind};
pub use workflow::{
    FireIfResult, SharedStatusHolder, TransitionConfigurer, Workflow, WorkflowBuilder,
    WorkflowConfigurer,
};
