//! Render Task - lifecycle of one component assignment in one outlet.
//!
//! ```text
//! pending → registered → rendered → tearing down → torn down
//! ```
//!
//! # Suspension points
//!
//! [`RenderTask::perform`] yields at four places, each released from outside:
//! 1. registration - the mounted component calls back via [`RenderTask::register_hooks`]
//! 2. `on_mounted` settling
//! 3. teardown permission - [`RenderTask::permit_teardown`], sent by the outlet queue
//! 4. `on_will_unmount` settling
//!
//! # Reactivity
//!
//! `rendered`, `registered` and `tearingdown` are signals. Setting `rendered`
//! is what mounts or unmounts the component: the outlet watches it with an
//! effect. The task never touches a view directly.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use crate::engine::Latch;
use crate::error::{HookError, RenderError};
use crate::types::{Attributes, TaskInfo};

use super::hooks::{BoundHooks, ComponentHooks, ComponentInstance, TeardownHandle, UnmountDecision};

/// Tasks of one outlet, oldest first. Shared between the queue and the
/// task currently performing (for neighbour lookups and stale sweeps).
pub type TaskList = Rc<RefCell<Vec<Rc<RenderTask>>>>;

bitflags::bitflags! {
    /// Snapshot of a task's lifecycle flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TaskState: u8 {
        const RENDERED = 1 << 0;
        const REGISTERED = 1 << 1;
        const TEARING_DOWN = 1 << 2;
    }
}

impl TaskState {
    /// Mounted and not on its way out.
    pub fn is_stable(self) -> bool {
        self.contains(TaskState::RENDERED) && !self.contains(TaskState::TEARING_DOWN)
    }
}

// =============================================================================
// RenderTask
// =============================================================================

pub struct RenderTask {
    component_name: String,
    route_name: String,
    attributes: RefCell<Attributes>,
    rendered: Signal<bool>,
    registered: Signal<bool>,
    tearingdown: Signal<bool>,
    hooks: RefCell<BoundHooks>,
    registration: Latch,
    teardown_permit: Latch,
    this: Weak<RenderTask>,
}

impl RenderTask {
    pub fn new(
        component_name: impl Into<String>,
        route_name: impl Into<String>,
        attributes: Attributes,
    ) -> Rc<Self> {
        let component_name = component_name.into();
        let route_name = route_name.into();
        Rc::new_cyclic(|this| Self {
            component_name,
            route_name,
            attributes: RefCell::new(attributes),
            rendered: signal(false),
            registered: signal(false),
            tearingdown: signal(false),
            hooks: RefCell::new(BoundHooks::default()),
            registration: Latch::new(),
            teardown_permit: Latch::new(),
            this: this.clone(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn info(&self) -> TaskInfo {
        TaskInfo::new(self.component_name.as_str(), self.route_name.as_str())
    }

    /// Same `(component, route)` assignment.
    pub fn matches(&self, component_name: &str, route_name: &str) -> bool {
        self.component_name == component_name && self.route_name == route_name
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes.borrow().clone()
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered.get()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.get()
    }

    pub fn is_tearing_down(&self) -> bool {
        self.tearingdown.get()
    }

    /// Signal the outlet watches to mount and unmount the component.
    pub fn rendered_signal(&self) -> Signal<bool> {
        self.rendered.clone()
    }

    pub fn state(&self) -> TaskState {
        let mut state = TaskState::empty();
        state.set(TaskState::RENDERED, self.is_rendered());
        state.set(TaskState::REGISTERED, self.is_registered());
        state.set(TaskState::TEARING_DOWN, self.is_tearing_down());
        state
    }

    // =========================================================================
    // External signals
    // =========================================================================

    /// Bind the hooks a freshly mounted instance offers.
    ///
    /// Call once per task; callers check [`is_registered`](Self::is_registered) first.
    pub fn register_hooks(&self, instance: &dyn ComponentInstance) {
        self.bind_hooks(instance.hooks());
    }

    /// Bind hooks directly, for hosts that do not model component instances.
    pub fn bind_hooks(&self, hooks: ComponentHooks) {
        tracing::debug!(
            component = %self.component_name,
            route = %self.route_name,
            ?hooks,
            "component registered"
        );
        *self.hooks.borrow_mut() = BoundHooks::bind(hooks);
        self.registered.set(true);
        self.registration.open();
    }

    /// Let the task leave once its mount hook has settled.
    pub fn permit_teardown(&self) {
        if !self.teardown_permit.is_open() {
            tracing::debug!(component = %self.component_name, route = %self.route_name, "teardown permitted");
        }
        self.teardown_permit.open();
    }

    pub fn is_teardown_permitted(&self) -> bool {
        self.teardown_permit.is_open()
    }

    /// Unmount the component now.
    pub fn teardown(&self) {
        tracing::debug!(component = %self.component_name, route = %self.route_name, "unmounting");
        self.rendered.set(false);
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle::new(self.this.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drive the task from mount to teardown.
    ///
    /// `tasks` is the owning outlet's task list; it supplies the previous and
    /// next task for the hooks and is swept of stale predecessors.
    pub async fn perform(self: Rc<Self>, tasks: TaskList) -> Result<(), RenderError> {
        tracing::debug!(component = %self.component_name, route = %self.route_name, "mounting");
        self.rendered.set(true);

        self.registration
            .wait()
            .await
            .map_err(|_| self.abandoned("registration"))?;

        let previous = self.neighbour(&tasks, -1);
        let mounted = self.hooks.borrow().mounted(previous);
        mounted.await.map_err(|source| self.hook_failed("on_mounted", source))?;

        self.remove_previous_unrendered(&tasks);

        self.teardown_permit
            .wait()
            .await
            .map_err(|_| self.abandoned("teardown permission"))?;

        self.tearingdown.set(true);

        let next = self.neighbour(&tasks, 1);
        let will_unmount = self.hooks.borrow().will_unmount(next, self.teardown_handle());
        let decision = will_unmount
            .await
            .map_err(|source| self.hook_failed("on_will_unmount", source))?;

        match decision {
            UnmountDecision::Now => self.teardown(),
            UnmountDecision::Deferred => {
                tracing::debug!(component = %self.component_name, route = %self.route_name, "teardown deferred");
            }
        }

        Ok(())
    }

    /// Replace the attributes in place once the component has registered.
    pub async fn update_attributes(self: Rc<Self>, attributes: Attributes) -> Result<(), RenderError> {
        self.registration
            .wait()
            .await
            .map_err(|_| self.abandoned("registration"))?;

        *self.attributes.borrow_mut() = attributes;
        let current = self.attributes();

        tracing::debug!(component = %self.component_name, route = %self.route_name, "attributes updated");
        self.hooks.borrow().attributes_changed(&current);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn position_in(&self, tasks: &[Rc<RenderTask>]) -> Option<usize> {
        tasks.iter().position(|task| std::ptr::eq(task.as_ref(), self))
    }

    fn neighbour(&self, tasks: &TaskList, offset: isize) -> Option<TaskInfo> {
        let tasks = tasks.borrow();
        let index = self.position_in(&tasks)?;
        let target = index.checked_add_signed(offset)?;
        tasks.get(target).map(|task| task.info())
    }

    /// Drop earlier tasks that are no longer rendered.
    fn remove_previous_unrendered(&self, tasks: &TaskList) {
        let mut tasks = tasks.borrow_mut();
        let Some(index) = self.position_in(&tasks) else {
            return;
        };

        let before = tasks.len();
        let mut position = 0;
        tasks.retain(|task| {
            let keep = position >= index || task.is_rendered();
            position += 1;
            keep
        });

        let removed = before - tasks.len();
        if removed > 0 {
            tracing::trace!(component = %self.component_name, removed, "stale tasks swept");
        }
    }

    fn hook_failed(&self, hook: &'static str, source: HookError) -> RenderError {
        RenderError::Hook {
            component_name: self.component_name.clone(),
            route_name: self.route_name.clone(),
            hook,
            source,
        }
    }

    fn abandoned(&self, waiting_for: &'static str) -> RenderError {
        RenderError::Abandoned {
            component_name: self.component_name.clone(),
            route_name: self.route_name.clone(),
            waiting_for,
        }
    }
}

impl fmt::Debug for RenderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTask")
            .field("component_name", &self.component_name)
            .field("route_name", &self.route_name)
            .field("state", &self.state())
            .finish()
    }
}
