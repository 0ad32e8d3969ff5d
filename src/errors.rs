// Copyright 2025 Cowboy AI, LLC.

//! Error types for workflow operations
//!
//! Every failure surfaces synchronously to the immediate caller; nothing is
//! retried or recovered automatically. Each variant renders a diagnostic
//! message through `Display` and a separate user-facing message through
//! [`WorkflowError::user_message`] suitable for direct display.

use crate::describe::split_camel_case;
use thiserror::Error;

/// Errors that can occur while configuring or driving a workflow
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// A guard was built without a usable description
    #[error("Guard description is missing or blank")]
    MissingGuardDescription,

    /// A restriction table was queried before a status accessor was bound
    #[error("No status accessor is bound to this restriction table; call bind_status_accessor() during the configuration phase")]
    MissingStatusAccessor,

    /// The status holder was produced by a different workflow configuration
    #[error("Status holder version key '{holder_key}' doesn't match workflow version key '{workflow_key}'. This prevents processing of objects created by other workflow versions")]
    VersionKeyMismatch {
        /// Version key found on the status holder
        holder_key: String,
        /// Version key of the workflow instance
        workflow_key: String,
    },

    /// A payload type could not be resolved to a task
    #[error("Payload type '{type_name}' is not mapped to a task. Please verify the bound cause map")]
    UnmappedPayloadType {
        /// Short name of the offending payload type
        type_name: String,
    },

    /// The activity is not configured from the current status
    #[error("No valid leaving transitions are permitted from status '{status}' for activity '{activity}'. Consider ignoring the activity")]
    ActivityNotPermitted {
        /// Current status name
        status: String,
        /// Attempted activity name
        activity: String,
    },

    /// The transition was reachable but its guard aggregate failed
    #[error(
        "Although activity '{activity}' is configured from status '{status}' to '{destination}', \
         it can not be completed because condition(-s) are not met: {failed}",
        failed = .failed_guards.join(", ")
    )]
    UnmetTransitionGuards {
        /// Current status name
        status: String,
        /// Attempted activity name
        activity: String,
        /// Destination status name
        destination: String,
        /// Descriptions of every failed guard, in declaration order
        failed_guards: Vec<String>,
    },

    /// The task is not permitted for the current roles and status
    #[error("Task '{task}' is not allowed for role(-s) '{roles}' within status '{status}'")]
    TaskNotPermitted {
        /// Task name
        task: String,
        /// Currently impersonated roles, comma separated
        roles: String,
        /// Current status name
        status: String,
    },

    /// No task at all is permitted for the current roles and status
    #[error("There are no tasks permitted for role(-s) '{roles}' in status '{status}'. Check allowed tasks first by calling allows_any()")]
    NoTasksPermitted {
        /// Currently impersonated roles, comma separated
        roles: String,
        /// Current status name
        status: String,
    },

    /// A registered task action returned an error
    #[error("Task '{task}' failed to run: {message}")]
    TaskActionFailed {
        /// Task name
        task: String,
        /// Rendered action error
        message: String,
    },

    /// A role-scoped query was made before any role was impersonated
    #[error("No role is currently impersonated; set at least one role before querying permissions")]
    NoRolesImpersonated,

    /// An explicit role list argument was empty
    #[error("List of roles should not be empty and should contain at least one element")]
    EmptyRoleList,
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// User-facing message suitable for direct display
    ///
    /// Identifiers are rendered as space-separated words; the diagnostic
    /// `Display` message keeps them verbatim.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::ActivityNotPermitted { status, activity } => format!(
                "'{}' is not possible while in status '{}'",
                split_camel_case(activity),
                split_camel_case(status)
            ),
            WorkflowError::UnmetTransitionGuards {
                activity,
                failed_guards,
                ..
            } => format!(
                "'{}' can not be completed yet: {}",
                split_camel_case(activity),
                failed_guards.join(", ")
            ),
            WorkflowError::TaskNotPermitted { task, status, .. } => format!(
                "'{}' is not allowed in status '{}'",
                split_camel_case(task),
                split_camel_case(status)
            ),
            WorkflowError::NoTasksPermitted { status, .. } => format!(
                "Nothing can be done in status '{}'",
                split_camel_case(status)
            ),
            other => other.to_string(),
        }
    }

    /// Check if this is a configuration-phase error
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::MissingGuardDescription
                | WorkflowError::MissingStatusAccessor
                | WorkflowError::VersionKeyMismatch { .. }
                | WorkflowError::UnmappedPayloadType { .. }
        )
    }

    /// Check if this is a permission outcome (activity or task denied)
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::ActivityNotPermitted { .. }
                | WorkflowError::UnmetTransitionGuards { .. }
                | WorkflowError::TaskNotPermitted { .. }
                | WorkflowError::NoTasksPermitted { .. }
        )
    }

    /// Check if this is an API usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::NoRolesImpersonated | WorkflowError::EmptyRoleList
        )
    }
}
