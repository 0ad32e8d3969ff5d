// Copyright 2025 Cowboy AI, LLC.

//! Marker traits for the four enumerated kinds the engine is generic over
//!
//! Domain code supplies plain enums for statuses, activities, roles and
//! tasks. The engine only needs them to be cheap to copy, comparable,
//! hashable and debuggable, so each kind is a blanket-implemented marker
//! trait rather than something callers must implement by hand. Enumerated
//! values are used directly as map keys; there is no integer conversion
//! layer.

use std::fmt::Debug;
use std::hash::Hash;

/// A status value - the entity's current phase
pub trait StatusKind: Copy + Eq + Hash + Debug + 'static {}
impl<T: Copy + Eq + Hash + Debug + 'static> StatusKind for T {}

/// An activity value - a trigger capable of causing a status transition
pub trait ActivityKind: Copy + Eq + Hash + Debug + 'static {}
impl<T: Copy + Eq + Hash + Debug + 'static> ActivityKind for T {}

/// A role value - an acting identity; several may be impersonated at once
pub trait RoleKind: Copy + Eq + Hash + Debug + 'static {}
impl<T: Copy + Eq + Hash + Debug + 'static> RoleKind for T {}

/// A task value - a fine-grained permission unit independent of activities
pub trait TaskKind: Copy + Eq + Hash + Debug + 'static {}
impl<T: Copy + Eq + Hash + Debug + 'static> TaskKind for T {}

/// Render a kind value's identifier for error messages and reports
pub fn kind_name<K: Debug>(kind: &K) -> String {
    format!("{:?}", kind)
}
