//! Core types for outlet-router.
//!
//! These types flow between routes, the render registry and outlet queues.
//! Everything here is plain data: no scheduling, no reactivity.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::RouteError;

// =============================================================================
// Constants
// =============================================================================

/// Outlet name used when a render or an outlet does not name one.
pub const DEFAULT_OUTLET: &str = "main";

/// Name of the root route. Its attributes are shared with every rendered component.
pub const APPLICATION_ROUTE: &str = "application";

/// Canonical delimiter for render targets (`posts.index` becomes `posts/index`).
pub const TARGET_DELIMITER: char = '/';

/// Route event names owned by the host router. Never handed to components as actions.
pub const RESERVED_ROUTE_ACTIONS: &[&str] = &[
    "_super",
    "queryParamsDidChange",
    "finalizeQueryParamChange",
    "didTransition",
    "willTransition",
    "loading",
    "error",
];

// =============================================================================
// Targets and route names
// =============================================================================

/// Normalize an `into` target so dotted route names and slash template
/// paths address the same outlet.
pub fn normalize_target(into: &str) -> String {
    into.replace('.', &TARGET_DELIMITER.to_string())
}

/// True if `route_name` is a strict descendant of `ancestor` in dotted-path
/// terms (`parent.child` descends from `parent`, `parental` does not).
pub fn is_descendant_route(ancestor: &str, route_name: &str) -> bool {
    route_name
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}

// =============================================================================
// TaskInfo
// =============================================================================

/// Identity of a render task as seen by its neighbours' hooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskInfo {
    pub component_name: String,
    pub route_name: String,
}

impl TaskInfo {
    pub fn new(component_name: impl Into<String>, route_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            route_name: route_name.into(),
        }
    }
}

impl fmt::Display for TaskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.component_name, self.route_name)
    }
}

// =============================================================================
// Actions
// =============================================================================

/// A route action callable by a rendered component.
pub type Action = Rc<dyn Fn(&Value)>;

/// Named actions a route hands to its components.
#[derive(Clone, Default)]
pub struct Actions {
    entries: BTreeMap<String, Action>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action (builder style).
    pub fn with(mut self, name: impl Into<String>, action: impl Fn(&Value) + 'static) -> Self {
        self.insert(name, action);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, action: impl Fn(&Value) + 'static) {
        self.entries.insert(name.into(), Rc::new(action));
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call an action by name.
    pub fn invoke(&self, name: &str, argument: &Value) -> Result<(), RouteError> {
        let action = self
            .entries
            .get(name)
            .ok_or_else(|| RouteError::UnknownAction(name.to_string()))?;
        action(argument);
        Ok(())
    }

    /// Drop actions whose names belong to the host router's own route events.
    pub fn attributable(mut self) -> Self {
        self.entries
            .retain(|name, _| !RESERVED_ROUTE_ACTIONS.contains(&name.as_str()));
        self
    }

    /// Add every action from `other` that is not already present.
    fn fill_from(&mut self, other: &Actions) {
        for (name, action) in &other.entries {
            self.entries
                .entry(name.clone())
                .or_insert_with(|| Rc::clone(action));
        }
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Data a route passes to the component it renders.
///
/// `data` is opaque: usually a JSON object, but any value is allowed. Only
/// object data takes part in shared-attribute merging.
#[derive(Clone, Default)]
pub struct Attributes {
    data: Value,
    actions: Actions,
}

impl Attributes {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            actions: Actions::default(),
        }
    }

    pub fn with_actions(mut self, actions: Actions) -> Self {
        self.actions = actions;
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Look up a key when the data is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_object().and_then(|map| map.get(key))
    }

    /// True when the data is a plain key-value mapping.
    pub fn is_mapping(&self) -> bool {
        self.data.is_object()
    }

    /// Merge shared attributes into a copy of these.
    ///
    /// Shared keys win over the route's own keys. Shared actions only fill
    /// names the route does not define. When either side is not a mapping the
    /// attributes come back untouched.
    pub fn merged_with(&self, shared: &Attributes) -> Attributes {
        let (Some(own), Some(extra)) = (self.data.as_object(), shared.data.as_object()) else {
            return self.clone();
        };

        let mut data: Map<String, Value> = own.clone();
        for (key, value) in extra {
            data.insert(key.clone(), value.clone());
        }

        let mut actions = self.actions.clone();
        actions.fill_from(&shared.actions);

        Attributes {
            data: Value::Object(data),
            actions,
        }
    }
}

impl From<Value> for Attributes {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

impl PartialEq for Attributes {
    /// Data equality plus the same action names. Closures are not comparable.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.actions.names().eq(other.actions.names())
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes")
            .field("data", &self.data)
            .field("actions", &self.actions)
            .finish()
    }
}
