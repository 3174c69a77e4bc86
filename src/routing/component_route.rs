//! Component Route - the boundary between a host router and the render registry.
//!
//! A route implements [`ComponentRoute`], overriding only the hooks it needs.
//! A [`RouteBinding`] carries the route's state (model, params, current
//! attributes, query-param cache) and drives the hooks at the right moments:
//!
//! - **setup**: compute attributes, then share them (application route) or
//!   render components
//! - **query-param-only change**: re-run the refresh, once per turn
//! - **deactivate**: withdraw every render this route queued
//!
//! # Example
//!
//! ```ignore
//! struct PostsRoute;
//!
//! impl ComponentRoute for PostsRoute {
//!     fn render_components(&self, renderer: &RouteRenderer<'_>) {
//!         renderer.render_component("post-list", RenderOptions::default());
//!         renderer.render_component("post-filters", RenderOptions::new().outlet("sidebar"));
//!     }
//! }
//!
//! let posts = RouteBinding::new(&context, "posts", PostsRoute);
//! posts.setup(json!([{ "title": "Hello" }]), Map::new());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};

use crate::config::RouterConfig;
use crate::engine::{RenderRegistry, Spawner};
use crate::types::{Actions, Attributes};

use super::query_params::{QueryParam, QueryParamCache, QueryParamsDiff};
use super::router::HostRouter;

// =============================================================================
// RouterContext
// =============================================================================

/// Collaborators every route binding shares.
#[derive(Clone)]
pub struct RouterContext {
    pub registry: Rc<RenderRegistry>,
    pub router: Rc<dyn HostRouter>,
    pub config: Rc<RouterConfig>,
    pub spawner: Spawner,
}

impl RouterContext {
    pub fn new(registry: Rc<RenderRegistry>, router: Rc<dyn HostRouter>, spawner: Spawner) -> Self {
        Self {
            registry,
            router,
            config: Rc::new(RouterConfig::default()),
            spawner,
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = Rc::new(config);
        self
    }
}

impl fmt::Debug for RouterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Where to render a component. Missing (or empty) fields fall back to the
/// route's parent and the configured default outlet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub into: Option<String>,
    pub outlet: Option<String>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template or component containing the outlet.
    pub fn target(mut self, into: impl Into<String>) -> Self {
        self.into = Some(into.into());
        self
    }

    pub fn outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }
}

/// Handed to [`ComponentRoute::render_components`]; queues renders with the
/// route's current attributes.
pub struct RouteRenderer<'a> {
    route_name: &'a str,
    attributes: &'a Attributes,
    registry: &'a RenderRegistry,
    default_into: String,
    default_outlet: &'a str,
}

impl RouteRenderer<'_> {
    pub fn route_name(&self) -> &str {
        self.route_name
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    /// Queue a render of `component_name` for this route.
    pub fn render_component(&self, component_name: &str, options: RenderOptions) {
        let into = options
            .into
            .filter(|into| !into.is_empty())
            .unwrap_or_else(|| self.default_into.clone());
        let outlet = options
            .outlet
            .filter(|outlet| !outlet.is_empty())
            .unwrap_or_else(|| self.default_outlet.to_string());

        tracing::debug!(
            route = self.route_name,
            component = component_name,
            into = %into,
            outlet = %outlet,
            "render queued"
        );
        self.registry
            .queue_render(self.route_name, component_name, self.attributes.clone(), &into, &outlet);
    }
}

// =============================================================================
// ComponentRoute
// =============================================================================

/// Overridable hooks of a route that renders components.
pub trait ComponentRoute {
    /// Attributes for the rendered components.
    ///
    /// Defaults to `{ "model": .., "params": .. }` carrying `actions`.
    fn attributes(&self, model: &Value, params: &Map<String, Value>, actions: Actions) -> Attributes {
        let mut data = Map::new();
        data.insert("model".to_string(), model.clone());
        data.insert("params".to_string(), Value::Object(params.clone()));
        Attributes::new(Value::Object(data)).with_actions(actions)
    }

    /// Which components to render. Defaults to one component named after
    /// the route, rendered into the parent's default outlet.
    fn render_components(&self, renderer: &RouteRenderer<'_>) {
        renderer.render_component(renderer.route_name(), RenderOptions::default());
    }

    /// Actions offered to components. Reserved route-event names are
    /// filtered out before they are handed over.
    fn actions(&self) -> Actions {
        Actions::new()
    }

    /// Query params this route declares.
    fn query_params(&self) -> Vec<QueryParam> {
        Vec::new()
    }

    /// Runs when only declared query params changed on an active route.
    fn query_params_did_only_change(&self, binding: &RouteBinding<Self>)
    where
        Self: Sized,
    {
        binding.refresh_attributes();
    }
}

// =============================================================================
// RouteBinding
// =============================================================================

/// A route instance wired to the registry.
pub struct RouteBinding<R: ComponentRoute> {
    name: String,
    route: R,
    context: RouterContext,
    query_params: Vec<QueryParam>,
    model: RefCell<Value>,
    params: RefCell<Map<String, Value>>,
    cache: RefCell<QueryParamCache>,
    current_attributes: RefCell<Attributes>,
    refresh_scheduled: Cell<bool>,
    this: Weak<RouteBinding<R>>,
}

impl<R: ComponentRoute> RouteBinding<R> {
    pub fn new(context: &RouterContext, name: impl Into<String>, route: R) -> Rc<Self> {
        let query_params = route.query_params();
        let name = name.into();
        Rc::new_cyclic(|this| Self {
            name,
            route,
            context: context.clone(),
            query_params,
            model: RefCell::new(Value::Null),
            params: RefCell::new(Map::new()),
            cache: RefCell::new(QueryParamCache::new()),
            current_attributes: RefCell::new(Attributes::default()),
            refresh_scheduled: Cell::new(false),
            this: this.clone(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn route(&self) -> &R {
        &self.route
    }

    pub fn is_application_route(&self) -> bool {
        self.name == self.context.config.application_route
    }

    pub fn model(&self) -> Value {
        self.model.borrow().clone()
    }

    pub fn query_params(&self) -> &[QueryParam] {
        &self.query_params
    }

    /// Attributes from the last refresh.
    pub fn current_attributes(&self) -> Attributes {
        self.current_attributes.borrow().clone()
    }

    /// Positional params overlaid with every declared query param.
    pub fn params_for(&self) -> Map<String, Value> {
        self.cache
            .borrow()
            .params_for(&self.query_params, &self.params.borrow())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Enter the route with its resolved model and positional params.
    pub fn setup(&self, model: Value, params: Map<String, Value>) {
        tracing::debug!(route = %self.name, "route setup");
        *self.model.borrow_mut() = model;
        *self.params.borrow_mut() = params;
        self.refresh_attributes();
    }

    /// Recompute attributes, then share or render them.
    pub fn refresh_attributes(&self) {
        let model = self.model();
        let params = self.params_for();
        let attributes = self
            .route
            .attributes(&model, &params, self.route.actions().attributable());
        *self.current_attributes.borrow_mut() = attributes.clone();

        if self.is_application_route() {
            self.context.registry.update_app_attributes(attributes);
        } else {
            self.route.render_components(&self.renderer(&attributes));
        }
    }

    /// Withdraw every render this route queued.
    pub fn deactivate(&self) {
        tracing::debug!(route = %self.name, "route deactivated");
        self.context.registry.remove_renders_by(&self.name);
    }

    fn renderer<'a>(&'a self, attributes: &'a Attributes) -> RouteRenderer<'a> {
        let default_into = self
            .context
            .router
            .parent_route_name(&self.name)
            .unwrap_or_else(|| self.context.config.application_route.clone());

        RouteRenderer {
            route_name: &self.name,
            attributes,
            registry: &self.context.registry,
            default_into,
            default_outlet: &self.context.config.default_outlet,
        }
    }
}

impl<R: ComponentRoute + 'static> RouteBinding<R> {
    /// Record a query-param change reported by the host router.
    ///
    /// Schedules [`ComponentRoute::query_params_did_only_change`] when one of
    /// this route's params changed and the route is active. Repeated changes
    /// in one turn share a single call.
    pub fn query_params_did_change(&self, diff: &QueryParamsDiff) {
        self.cache.borrow_mut().cache_diff(&self.query_params, diff);

        if !diff.touches(&self.query_params) {
            return;
        }
        if !self.context.router.is_route_active(&self.name) {
            tracing::trace!(route = %self.name, "query params changed mid-transition, setup will refresh");
            return;
        }
        if self.refresh_scheduled.replace(true) {
            return;
        }

        let binding = self.this.clone();
        self.context.spawner.spawn(async move {
            if let Some(binding) = binding.upgrade() {
                binding.refresh_scheduled.set(false);
                tracing::debug!(route = %binding.name, "query params changed");
                binding.route.query_params_did_only_change(&binding);
            }
        });
    }
}

impl<R: ComponentRoute> fmt::Debug for RouteBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("name", &self.name)
            .field("query_params", &self.query_params)
            .field("current_attributes", &self.current_attributes.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RenderRequest, Scheduler};
    use crate::routing::router::RouteTree;
    use serde_json::json;

    struct Harness {
        scheduler: Scheduler,
        registry: Rc<RenderRegistry>,
        tree: Rc<RouteTree>,
        context: RouterContext,
    }

    impl Harness {
        fn new() -> Self {
            let scheduler = Scheduler::new();
            let registry = RenderRegistry::new();
            let tree = Rc::new(RouteTree::default());
            let context = RouterContext::new(registry.clone(), tree.clone(), scheduler.spawner());
            Self {
                scheduler,
                registry,
                tree,
                context,
            }
        }

        fn render(&self, route_name: &str) -> Option<RenderRequest> {
            self.registry
                .renders()
                .into_iter()
                .find(|render| render.route_name == route_name)
        }
    }

    struct DefaultRoute;

    impl ComponentRoute for DefaultRoute {}

    #[test]
    fn test_setup_renders_route_component_into_parent() {
        let harness = Harness::new();
        let route = RouteBinding::new(&harness.context, "posts.show", DefaultRoute);

        let params = json!({ "post_id": "1" });
        route.setup(json!({ "title": "Hello" }), params.as_object().cloned().unwrap_or_default());

        let render = harness.render("posts.show").unwrap();
        assert_eq!(render.component_name, "posts.show");
        assert_eq!(render.into, "posts");
        assert_eq!(render.outlet, "main");
        assert_eq!(
            render.attributes.data(),
            &json!({ "model": { "title": "Hello" }, "params": { "post_id": "1" } })
        );
    }

    #[test]
    fn test_top_level_route_renders_into_application() {
        let harness = Harness::new();
        let route = RouteBinding::new(&harness.context, "about", DefaultRoute);
        route.setup(Value::Null, Map::new());

        assert_eq!(harness.render("about").unwrap().into, "application");
    }

    #[test]
    fn test_application_route_shares_attributes() {
        let harness = Harness::new();
        let route = RouteBinding::new(&harness.context, "application", DefaultRoute);
        route.setup(json!({ "user": "ada" }), Map::new());

        assert!(harness.registry.renders().is_empty());
        assert_eq!(
            harness.registry.app_attributes().get("model"),
            Some(&json!({ "user": "ada" }))
        );
    }

    #[test]
    fn test_custom_render_components() {
        struct Layout;

        impl ComponentRoute for Layout {
            fn render_components(&self, renderer: &RouteRenderer<'_>) {
                renderer.render_component("post-list", RenderOptions::default());
                renderer.render_component("post-filters", RenderOptions::new().target("posts").outlet("sidebar"));
                renderer.render_component("post-footer", RenderOptions::new().target("").outlet(""));
            }
        }

        let harness = Harness::new();
        let route = RouteBinding::new(&harness.context, "posts", Layout);
        route.setup(Value::Null, Map::new());

        let targets: Vec<(String, String, String)> = harness
            .registry
            .renders()
            .into_iter()
            .map(|render| (render.component_name, render.into, render.outlet))
            .collect();
        // One request per (route, into, outlet); the footer replaced the list
        assert_eq!(
            targets,
            vec![
                ("post-filters".to_string(), "posts".to_string(), "sidebar".to_string()),
                ("post-footer".to_string(), "application".to_string(), "main".to_string()),
            ]
        );
    }

    #[test]
    fn test_configured_default_outlet() {
        let harness = Harness::new();
        let config = RouterConfig {
            default_outlet: "content".to_string(),
            ..RouterConfig::default()
        };
        let context = harness.context.clone().with_config(config);
        let route = RouteBinding::new(&context, "about", DefaultRoute);
        route.setup(Value::Null, Map::new());

        assert_eq!(harness.render("about").unwrap().outlet, "content");
    }

    #[test]
    fn test_reserved_actions_filtered() {
        struct WithActions;

        impl ComponentRoute for WithActions {
            fn actions(&self) -> Actions {
                Actions::new()
                    .with("save", |_| {})
                    .with("willTransition", |_| {})
                    .with("error", |_| {})
            }
        }

        let harness = Harness::new();
        let route = RouteBinding::new(&harness.context, "edit", WithActions);
        route.setup(Value::Null, Map::new());

        let attributes = route.current_attributes();
        assert_eq!(attributes.actions().names().collect::<Vec<_>>(), vec!["save"]);
    }

    #[test]
    fn test_deactivate_removes_renders() {
        let harness = Harness::new();
        let route = RouteBinding::new(&harness.context, "about", DefaultRoute);
        route.setup(Value::Null, Map::new());
        assert!(harness.render("about").is_some());

        route.deactivate();
        assert!(harness.render("about").is_none());
    }

    struct Paged {
        refreshes: Rc<Cell<usize>>,
    }

    impl ComponentRoute for Paged {
        fn query_params(&self) -> Vec<QueryParam> {
            vec![QueryParam::new("page", 1).with_url_key("p")]
        }

        fn query_params_did_only_change(&self, binding: &RouteBinding<Self>) {
            self.refreshes.set(self.refreshes.get() + 1);
            binding.refresh_attributes();
        }
    }

    fn paged(harness: &Harness) -> (Rc<RouteBinding<Paged>>, Rc<Cell<usize>>) {
        let refreshes = Rc::new(Cell::new(0));
        let route = RouteBinding::new(
            &harness.context,
            "posts",
            Paged {
                refreshes: refreshes.clone(),
            },
        );
        (route, refreshes)
    }

    #[test]
    fn test_query_param_change_refreshes_once_per_turn() {
        let harness = Harness::new();
        let (route, refreshes) = paged(&harness);
        harness.tree.transition_to("posts");
        route.setup(Value::Null, Map::new());
        assert_eq!(route.params_for().get("page"), Some(&json!(1)));

        route.query_params_did_change(&QueryParamsDiff::new().changed("p", "2"));
        route.query_params_did_change(&QueryParamsDiff::new().changed("p", "3"));
        harness.scheduler.run_until_stalled();

        assert_eq!(refreshes.get(), 1);
        let render = harness.render("posts").unwrap();
        assert_eq!(render.attributes.get("params"), Some(&json!({ "page": 3 })));

        route.query_params_did_change(&QueryParamsDiff::new().removed("p"));
        harness.scheduler.run_until_stalled();
        assert_eq!(refreshes.get(), 2);
        assert_eq!(route.params_for().get("page"), Some(&json!(1)));
    }

    #[test]
    fn test_undeclared_query_param_ignored() {
        let harness = Harness::new();
        let (route, refreshes) = paged(&harness);
        harness.tree.transition_to("posts");
        route.setup(Value::Null, Map::new());

        route.query_params_did_change(&QueryParamsDiff::new().changed("page", "2"));
        harness.scheduler.run_until_stalled();
        assert_eq!(refreshes.get(), 0);
    }

    #[test]
    fn test_query_param_change_mid_transition_is_cached_only() {
        let harness = Harness::new();
        let (route, refreshes) = paged(&harness);
        harness.tree.begin_transition("posts");

        route.query_params_did_change(&QueryParamsDiff::new().changed("p", "5"));
        harness.scheduler.run_until_stalled();
        assert_eq!(refreshes.get(), 0);

        // Setup at the end of the transition sees the cached value
        harness.tree.finish_transition("posts");
        route.setup(Value::Null, Map::new());
        assert_eq!(
            harness.render("posts").unwrap().attributes.get("params"),
            Some(&json!({ "page": 5 }))
        );
    }
}
