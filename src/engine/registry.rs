//! Render Registry - matches render requests to live outlets.
//!
//! Two sets, matched in both directions:
//! - **Renders**: at most one request per `(route, into, outlet)`, in submission order
//! - **Connections**: at most one per live outlet instance
//!
//! A new render goes to every matching connection. A new connection gets the
//! latest matching render. Either side may show up first.
//!
//! # Pattern: No Borrow Across Calls
//!
//! Every operation collects what it needs from the registry state, releases
//! the borrow, and only then calls into outlets. Outlets are free to call back
//! into the registry (a mounted component may connect nested outlets).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::types::{normalize_target, Attributes};

// =============================================================================
// Outlet contract
// =============================================================================

/// A live mount point the registry can render into.
pub trait Outlet {
    /// Render (or update) a component for a route.
    fn render_component(&self, component_name: &str, route_name: &str, attributes: Attributes);

    /// Permit the matching component to tear down.
    fn teardown_component(&self, component_name: &str, route_name: &str);
}

fn same_outlet(a: &Rc<dyn Outlet>, b: &Rc<dyn Outlet>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

// =============================================================================
// Records
// =============================================================================

/// A route's request to show a component in an outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub route_name: String,
    pub component_name: String,
    pub attributes: Attributes,
    /// Normalized target (template or component containing the outlet).
    pub into: String,
    pub outlet: String,
}

impl RenderRequest {
    fn targets(&self, into: &str, outlet: &str) -> bool {
        self.into == into && self.outlet == outlet
    }
}

#[derive(Clone)]
struct Connection {
    outlet: Rc<dyn Outlet>,
    into: String,
    outlet_name: String,
}

impl Connection {
    fn accepts(&self, render: &RenderRequest) -> bool {
        render.targets(&self.into, &self.outlet_name)
    }
}

#[derive(Default)]
struct RegistryState {
    renders: Vec<RenderRequest>,
    connections: Vec<Connection>,
    app_attributes: Attributes,
}

impl RegistryState {
    fn connections_for(&self, render: &RenderRequest) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|connection| connection.accepts(render))
            .cloned()
            .collect()
    }

    fn last_render_for(&self, connection: &Connection) -> Option<RenderRequest> {
        self.renders
            .iter()
            .rev()
            .find(|render| connection.accepts(render))
            .cloned()
    }
}

// =============================================================================
// RenderRegistry
// =============================================================================

/// Central broker between routes and outlets. One per application.
#[derive(Default)]
pub struct RenderRegistry {
    state: RefCell<RegistryState>,
}

impl RenderRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Record a render request and forward it to every matching connection.
    ///
    /// Replaces any request with the same `(route, into, outlet)` key; the
    /// replacement becomes the latest request.
    pub fn queue_render(
        &self,
        route_name: &str,
        component_name: &str,
        attributes: Attributes,
        into: &str,
        outlet: &str,
    ) {
        let render = RenderRequest {
            route_name: route_name.to_string(),
            component_name: component_name.to_string(),
            attributes,
            into: normalize_target(into),
            outlet: outlet.to_string(),
        };

        let (targets, shared) = {
            let mut state = self.state.borrow_mut();
            state.renders.retain(|existing| {
                !(existing.route_name == render.route_name && existing.targets(&render.into, &render.outlet))
            });
            state.renders.push(render.clone());
            (state.connections_for(&render), state.app_attributes.clone())
        };

        tracing::debug!(
            route = %render.route_name,
            component = %render.component_name,
            into = %render.into,
            outlet = %render.outlet,
            connections = targets.len(),
            "render queued"
        );

        for connection in &targets {
            render_into(connection, &render, &shared);
        }
    }

    /// Register a live outlet and give it the latest matching render.
    ///
    /// Connecting an already connected outlet replaces its record.
    pub fn connect_outlet(&self, outlet: Rc<dyn Outlet>, into: &str, outlet_name: &str) {
        let connection = Connection {
            outlet,
            into: normalize_target(into),
            outlet_name: outlet_name.to_string(),
        };

        let (latest, shared) = {
            let mut state = self.state.borrow_mut();
            state
                .connections
                .retain(|existing| !same_outlet(&existing.outlet, &connection.outlet));
            state.connections.push(connection.clone());
            (state.last_render_for(&connection), state.app_attributes.clone())
        };

        tracing::debug!(
            into = %connection.into,
            outlet = %connection.outlet_name,
            matched = latest.is_some(),
            "outlet connected"
        );

        if let Some(render) = latest {
            render_into(&connection, &render, &shared);
        }
    }

    /// Forget a live outlet. Its renders stay queued for the next outlet in the slot.
    pub fn disconnect_outlet(&self, outlet: &Rc<dyn Outlet>) {
        let mut state = self.state.borrow_mut();
        let before = state.connections.len();
        state
            .connections
            .retain(|existing| !same_outlet(&existing.outlet, outlet));

        if state.connections.len() != before {
            tracing::debug!("outlet disconnected");
        }
    }

    /// Drop every render by `route_name`, tearing its components down.
    ///
    /// Each outlet that lost a component immediately gets its new latest
    /// matching render, so an earlier request reclaims the slot.
    pub fn remove_renders_by(&self, route_name: &str) {
        let (removed, torn_down) = {
            let mut state = self.state.borrow_mut();
            let (removed, kept): (Vec<RenderRequest>, Vec<RenderRequest>) = state
                .renders
                .drain(..)
                .partition(|render| render.route_name == route_name);
            state.renders = kept;

            let torn_down: Vec<(Connection, RenderRequest)> = removed
                .iter()
                .flat_map(|render| {
                    state
                        .connections_for(render)
                        .into_iter()
                        .map(move |connection| (connection, render.clone()))
                })
                .collect();
            (removed, torn_down)
        };

        tracing::debug!(route = route_name, removed = removed.len(), "renders removed");

        let mut reclaim: Vec<Connection> = Vec::new();
        for (connection, render) in &torn_down {
            connection
                .outlet
                .teardown_component(&render.component_name, &render.route_name);
            if !reclaim.iter().any(|seen| same_outlet(&seen.outlet, &connection.outlet)) {
                reclaim.push(connection.clone());
            }
        }

        for connection in &reclaim {
            self.render_last_into(connection);
        }
    }

    /// Replace the attributes shared with every component and push them to
    /// every live connection.
    pub fn update_app_attributes(&self, attributes: Attributes) {
        let connections = {
            let mut state = self.state.borrow_mut();
            state.app_attributes = attributes;
            state.connections.clone()
        };

        tracing::debug!(connections = connections.len(), "app attributes updated");

        for connection in &connections {
            self.render_last_into(connection);
        }
    }

    fn render_last_into(&self, connection: &Connection) {
        let (latest, shared) = {
            let state = self.state.borrow();
            (state.last_render_for(connection), state.app_attributes.clone())
        };
        if let Some(render) = latest {
            render_into(connection, &render, &shared);
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Outstanding render requests, oldest first.
    pub fn renders(&self) -> Vec<RenderRequest> {
        self.state.borrow().renders.clone()
    }

    /// `(into, outlet)` of every live connection, in connection order.
    pub fn connections(&self) -> Vec<(String, String)> {
        self.state
            .borrow()
            .connections
            .iter()
            .map(|connection| (connection.into.clone(), connection.outlet_name.clone()))
            .collect()
    }

    pub fn app_attributes(&self) -> Attributes {
        self.state.borrow().app_attributes.clone()
    }
}

impl fmt::Debug for RenderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RenderRegistry")
            .field("renders", &state.renders)
            .field("connections", &state.connections.len())
            .field("app_attributes", &state.app_attributes)
            .finish()
    }
}

fn render_into(connection: &Connection, render: &RenderRequest, shared: &Attributes) {
    tracing::trace!(
        route = %render.route_name,
        component = %render.component_name,
        into = %connection.into,
        outlet = %connection.outlet_name,
        "render forwarded"
    );
    connection.outlet.render_component(
        &render.component_name,
        &render.route_name,
        render.attributes.merged_with(shared),
    );
}
