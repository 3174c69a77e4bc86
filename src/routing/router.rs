//! Host router contract.
//!
//! The render core never walks a router's internals. It asks two questions,
//! through [`HostRouter`]: who is this route's parent, and is this route
//! settled in the current transition.
//!
//! [`RouteTree`] answers both from dotted route names and an explicit
//! transition log. Hosts with a real router implement the trait themselves.

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::types::APPLICATION_ROUTE;

pub trait HostRouter {
    /// Immediate parent of `route_name`. `None` for the root route.
    fn parent_route_name(&self, route_name: &str) -> Option<String>;

    /// True once the route has been entered and is not mid-transition.
    fn is_route_active(&self, route_name: &str) -> bool;
}

// =============================================================================
// RouteTree
// =============================================================================

/// Router derived from dotted names (`posts.show` is a child of `posts`,
/// top-level routes are children of the application route).
#[derive(Debug)]
pub struct RouteTree {
    application_route: String,
    entered: RefCell<BTreeSet<String>>,
    transitioning: RefCell<BTreeSet<String>>,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new(APPLICATION_ROUTE)
    }
}

impl RouteTree {
    pub fn new(application_route: impl Into<String>) -> Self {
        Self {
            application_route: application_route.into(),
            entered: RefCell::new(BTreeSet::new()),
            transitioning: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn application_route(&self) -> &str {
        &self.application_route
    }

    /// `route_name` and every ancestor, root first.
    pub fn lineage(&self, route_name: &str) -> Vec<String> {
        let mut lineage = vec![route_name.to_string()];
        let mut current = route_name.to_string();
        while let Some(parent) = self.parent_route_name(&current) {
            lineage.push(parent.clone());
            current = parent;
        }
        lineage.reverse();
        lineage
    }

    /// Start a transition to `route_name`. Routes it enters stay inactive
    /// until [`finish_transition`](Self::finish_transition).
    pub fn begin_transition(&self, route_name: &str) {
        let lineage = self.lineage(route_name);
        let entered = self.entered.borrow();
        let mut transitioning = self.transitioning.borrow_mut();
        transitioning.clear();
        transitioning.extend(lineage.into_iter().filter(|route| !entered.contains(route)));
        tracing::trace!(route = route_name, pending = ?transitioning, "transition started");
    }

    /// Settle the current transition to `route_name`: routes outside its
    /// lineage are exited and the rest become active.
    ///
    /// Returns the exited routes, deepest first, so a host can deactivate
    /// their bindings.
    pub fn finish_transition(&self, route_name: &str) -> Vec<String> {
        let lineage: BTreeSet<String> = self.lineage(route_name).into_iter().collect();
        let mut entered = self.entered.borrow_mut();

        let mut exited: Vec<String> = entered.difference(&lineage).cloned().collect();
        exited.sort_by_key(|route| std::cmp::Reverse(route.matches('.').count()));

        *entered = lineage;
        self.transitioning.borrow_mut().clear();
        exited
    }

    /// Begin and finish a transition in one step.
    pub fn transition_to(&self, route_name: &str) -> Vec<String> {
        self.begin_transition(route_name);
        self.finish_transition(route_name)
    }
}

impl HostRouter for RouteTree {
    fn parent_route_name(&self, route_name: &str) -> Option<String> {
        if route_name == self.application_route {
            return None;
        }
        match route_name.rsplit_once('.') {
            Some((parent, _)) => Some(parent.to_string()),
            None => Some(self.application_route.clone()),
        }
    }

    fn is_route_active(&self, route_name: &str) -> bool {
        self.entered.borrow().contains(route_name) && !self.transitioning.borrow().contains(route_name)
    }
}
