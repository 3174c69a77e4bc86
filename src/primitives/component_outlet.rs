//! Component Outlet - a live, named mount point.
//!
//! The outlet connects to the [`RenderRegistry`], receives renders for its
//! `(into, outlet)` slot and feeds them to its own [`OutletQueue`]. It never
//! decides *when* a component mounts: it watches each task's `rendered`
//! signal and follows it.
//!
//! # Pattern: Effect-driven Mounting
//!
//! 1. A new task gets an effect reading its `rendered` signal
//! 2. Any change schedules one render pass on the scheduler
//! 3. The render pass mounts instances for rendered tasks (via the factory)
//!    and drops instances whose task is no longer rendered
//! 4. After the pass, freshly mounted instances register their hooks
//!
//! Several signal changes in one turn share one render pass.
//!
//! ```ignore
//! let outlet = ComponentOutlet::new(registry.clone(), catalog, scheduler.spawner(), "application");
//! outlet.connect();
//!
//! // ... later, when the view containing the outlet goes away
//! outlet.disconnect();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::effect;

use crate::engine::{Outlet, RenderRegistry, Spawner};
use crate::pipeline::{ComponentInstance, OutletQueue, RenderTask};
use crate::types::{normalize_target, Attributes, DEFAULT_OUTLET};

use super::catalog::ComponentFactory;

struct Mounted {
    task: Rc<RenderTask>,
    instance: Rc<dyn ComponentInstance>,
}

struct Watcher {
    task: Weak<RenderTask>,
    stop: Box<dyn FnOnce()>,
}

pub struct ComponentOutlet {
    registry: Rc<RenderRegistry>,
    factory: Rc<dyn ComponentFactory>,
    spawner: Spawner,
    queue: OutletQueue,
    into: String,
    outlet_name: String,
    mounted: RefCell<Vec<Mounted>>,
    watchers: RefCell<Vec<Watcher>>,
    render_scheduled: Cell<bool>,
    this: Weak<ComponentOutlet>,
}

impl ComponentOutlet {
    /// Outlet named `main` inside `into`.
    pub fn new(
        registry: Rc<RenderRegistry>,
        factory: Rc<dyn ComponentFactory>,
        spawner: Spawner,
        into: impl Into<String>,
    ) -> Rc<Self> {
        Self::named(registry, factory, spawner, into, DEFAULT_OUTLET)
    }

    pub fn named(
        registry: Rc<RenderRegistry>,
        factory: Rc<dyn ComponentFactory>,
        spawner: Spawner,
        into: impl Into<String>,
        outlet_name: impl Into<String>,
    ) -> Rc<Self> {
        let queue = OutletQueue::new(spawner.clone());
        let into = normalize_target(&into.into());
        let outlet_name = outlet_name.into();
        Rc::new_cyclic(|this| Self {
            registry,
            factory,
            spawner,
            queue,
            into,
            outlet_name,
            mounted: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
            render_scheduled: Cell::new(false),
            this: this.clone(),
        })
    }

    // =========================================================================
    // Registry connection
    // =========================================================================

    pub fn connect(self: &Rc<Self>) {
        let handle: Rc<dyn Outlet> = self.clone();
        self.registry.connect_outlet(handle, &self.into, &self.outlet_name);
    }

    pub fn disconnect(self: &Rc<Self>) {
        let handle: Rc<dyn Outlet> = self.clone();
        self.registry.disconnect_outlet(&handle);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn into_target(&self) -> &str {
        &self.into
    }

    pub fn outlet_name(&self) -> &str {
        &self.outlet_name
    }

    pub fn queue(&self) -> &OutletQueue {
        &self.queue
    }

    /// Names of the mounted components, oldest first.
    pub fn mounted_components(&self) -> Vec<String> {
        self.mounted
            .borrow()
            .iter()
            .map(|entry| entry.task.component_name().to_string())
            .collect()
    }

    pub fn instances(&self) -> Vec<Rc<dyn ComponentInstance>> {
        self.mounted
            .borrow()
            .iter()
            .map(|entry| Rc::clone(&entry.instance))
            .collect()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn watch(&self, task: &Rc<RenderTask>) {
        let rendered = task.rendered_signal();
        let outlet = self.this.clone();
        let stop = effect(move || {
            let _ = rendered.get();
            if let Some(outlet) = outlet.upgrade() {
                outlet.schedule_render();
            }
        });

        self.watchers.borrow_mut().push(Watcher {
            task: Rc::downgrade(task),
            stop: Box::new(stop),
        });
    }

    fn schedule_render(&self) {
        if self.render_scheduled.replace(true) {
            return;
        }
        let outlet = self.this.clone();
        self.spawner.spawn(async move {
            if let Some(outlet) = outlet.upgrade() {
                outlet.render();
            }
        });
    }

    /// One render pass: follow every task's `rendered` flag, then let
    /// new instances register.
    fn render(&self) {
        self.render_scheduled.set(false);

        let unmounted: Vec<Mounted> = {
            let mut mounted = self.mounted.borrow_mut();
            let (keep, gone): (Vec<Mounted>, Vec<Mounted>) =
                mounted.drain(..).partition(|entry| entry.task.is_rendered());
            *mounted = keep;
            gone
        };
        for entry in &unmounted {
            tracing::debug!(
                component = entry.task.component_name(),
                route = entry.task.route_name(),
                outlet = %self.outlet_name,
                "component unmounted"
            );
        }
        drop(unmounted);

        let pending: Vec<Rc<RenderTask>> = {
            let mounted = self.mounted.borrow();
            self.queue
                .rendered_tasks()
                .into_iter()
                .filter(|task| !mounted.iter().any(|entry| Rc::ptr_eq(&entry.task, task)))
                .collect()
        };

        for task in pending {
            let Some(instance) = self.factory.create(task.component_name(), Rc::downgrade(&task)) else {
                tracing::warn!(
                    component = task.component_name(),
                    route = task.route_name(),
                    into = %self.into,
                    outlet = %self.outlet_name,
                    "no component registered under this name"
                );
                continue;
            };
            tracing::debug!(
                component = task.component_name(),
                route = task.route_name(),
                outlet = %self.outlet_name,
                "component mounted"
            );
            self.mounted.borrow_mut().push(Mounted { task, instance });
        }

        self.sort_mounted();
        self.prune_watchers();

        let instances = self.instances();
        self.queue
            .after_children_rendered(instances.iter().map(|instance| instance.as_ref()));
    }

    /// Keep mounted entries in queue order.
    fn sort_mounted(&self) {
        let order = self.queue.tasks();
        let position = |task: &Rc<RenderTask>| {
            order
                .iter()
                .position(|queued| Rc::ptr_eq(queued, task))
                .unwrap_or(usize::MAX)
        };
        self.mounted
            .borrow_mut()
            .sort_by_key(|entry| position(&entry.task));
    }

    /// Stop watching tasks that have finished unmounting.
    fn prune_watchers(&self) {
        let finished: Vec<Watcher> = {
            let mut watchers = self.watchers.borrow_mut();
            let (keep, done): (Vec<Watcher>, Vec<Watcher>) =
                watchers.drain(..).partition(|watcher| match watcher.task.upgrade() {
                    Some(task) => task.is_rendered() || !task.is_tearing_down(),
                    None => false,
                });
            *watchers = keep;
            done
        };

        for watcher in finished {
            (watcher.stop)();
        }
    }
}

impl Outlet for ComponentOutlet {
    fn render_component(&self, component_name: &str, route_name: &str, attributes: Attributes) {
        if let Some(task) = self.queue.submit_render(component_name, route_name, attributes) {
            self.watch(&task);
        }
    }

    fn teardown_component(&self, component_name: &str, route_name: &str) {
        self.queue.signal_teardown(component_name, route_name);
    }
}

impl Drop for ComponentOutlet {
    fn drop(&mut self) {
        for watcher in self.watchers.get_mut().drain(..) {
            (watcher.stop)();
        }
    }
}

impl fmt::Debug for ComponentOutlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOutlet")
            .field("into", &self.into)
            .field("outlet_name", &self.outlet_name)
            .field("mounted", &self.mounted_components())
            .finish()
    }
}
