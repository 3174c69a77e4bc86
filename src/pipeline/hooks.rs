//! Component Hooks - the lifecycle contract between a task and its component.
//!
//! A mounted component may offer any of three hooks:
//!
//! - `on_mounted(previous)` - runs after the component registers; must settle
//!   before the component can be asked to leave
//! - `on_will_unmount(next, teardown)` - runs once teardown is permitted;
//!   returning [`UnmountDecision::Deferred`] keeps the component mounted until
//!   the [`TeardownHandle`] is called
//! - `on_attributes_changed(attributes)` - runs after an in-place attribute update
//!
//! Missing hooks resolve immediately.
//!
//! # Example
//!
//! ```ignore
//! let hooks = ComponentHooks::new()
//!     .on_mounted(|_previous| async { Ok(()) })
//!     .on_will_unmount(move |_next, teardown| {
//!         fade_out(element, move || teardown.teardown());
//!         async { Ok(UnmountDecision::Deferred) }
//!     });
//! ```

use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::HookError;
use crate::types::{Attributes, TaskInfo};

use super::task::RenderTask;

/// Future returned by an async hook.
pub type HookFuture<T> = LocalBoxFuture<'static, Result<T, HookError>>;

type MountedHook = Box<dyn Fn(Option<TaskInfo>) -> HookFuture<()>>;
type WillUnmountHook = Box<dyn Fn(Option<TaskInfo>, TeardownHandle) -> HookFuture<UnmountDecision>>;
type AttributesChangedHook = Box<dyn Fn(&Attributes)>;

// =============================================================================
// UnmountDecision
// =============================================================================

/// What `on_will_unmount` wants done once it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmountDecision {
    /// Unmount right away.
    #[default]
    Now,
    /// Stay mounted until the teardown handle is called.
    Deferred,
}

// =============================================================================
// TeardownHandle
// =============================================================================

/// Unmounts a task's component when called. Safe to call more than once.
#[derive(Clone)]
pub struct TeardownHandle {
    task: Weak<RenderTask>,
}

impl TeardownHandle {
    pub(crate) fn new(task: Weak<RenderTask>) -> Self {
        Self { task }
    }

    pub fn teardown(&self) {
        if let Some(task) = self.task.upgrade() {
            task.teardown();
        }
    }
}

impl fmt::Debug for TeardownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.task.upgrade().map(|task| task.info());
        f.debug_struct("TeardownHandle").field("task", &info).finish()
    }
}

// =============================================================================
// ComponentHooks
// =============================================================================

/// Hooks a component offers. Build with the `on_*` methods; leave out any
/// the component does not need.
#[derive(Default)]
pub struct ComponentHooks {
    on_mounted: Option<MountedHook>,
    on_will_unmount: Option<WillUnmountHook>,
    on_attributes_changed: Option<AttributesChangedHook>,
}

impl ComponentHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_mounted<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Option<TaskInfo>) -> Fut + 'static,
        Fut: Future<Output = Result<(), HookError>> + 'static,
    {
        self.on_mounted = Some(Box::new(move |previous: Option<TaskInfo>| -> HookFuture<()> {
            hook(previous).boxed_local()
        }));
        self
    }

    pub fn on_will_unmount<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Option<TaskInfo>, TeardownHandle) -> Fut + 'static,
        Fut: Future<Output = Result<UnmountDecision, HookError>> + 'static,
    {
        self.on_will_unmount = Some(Box::new(
            move |next: Option<TaskInfo>, teardown: TeardownHandle| -> HookFuture<UnmountDecision> {
                hook(next, teardown).boxed_local()
            },
        ));
        self
    }

    pub fn on_attributes_changed(mut self, hook: impl Fn(&Attributes) + 'static) -> Self {
        self.on_attributes_changed = Some(Box::new(hook));
        self
    }

    pub fn has_on_mounted(&self) -> bool {
        self.on_mounted.is_some()
    }

    pub fn has_on_will_unmount(&self) -> bool {
        self.on_will_unmount.is_some()
    }

    pub fn has_on_attributes_changed(&self) -> bool {
        self.on_attributes_changed.is_some()
    }
}

impl fmt::Debug for ComponentHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHooks")
            .field("on_mounted", &self.has_on_mounted())
            .field("on_will_unmount", &self.has_on_will_unmount())
            .field("on_attributes_changed", &self.has_on_attributes_changed())
            .finish()
    }
}

// =============================================================================
// BoundHooks
// =============================================================================

/// Hooks after registration: every slot filled, missing ones with no-ops.
pub(crate) struct BoundHooks {
    on_mounted: MountedHook,
    on_will_unmount: WillUnmountHook,
    on_attributes_changed: AttributesChangedHook,
}

impl BoundHooks {
    pub(crate) fn bind(hooks: ComponentHooks) -> Self {
        let on_mounted: MountedHook = match hooks.on_mounted {
            Some(hook) => hook,
            None => Box::new(|_: Option<TaskInfo>| -> HookFuture<()> { future::ready(Ok(())).boxed_local() }),
        };
        let on_will_unmount: WillUnmountHook = match hooks.on_will_unmount {
            Some(hook) => hook,
            None => Box::new(
                |_: Option<TaskInfo>, _: TeardownHandle| -> HookFuture<UnmountDecision> {
                    future::ready(Ok(UnmountDecision::Now)).boxed_local()
                },
            ),
        };
        let on_attributes_changed: AttributesChangedHook = match hooks.on_attributes_changed {
            Some(hook) => hook,
            None => Box::new(|_: &Attributes| {}),
        };

        Self {
            on_mounted,
            on_will_unmount,
            on_attributes_changed,
        }
    }

    pub(crate) fn mounted(&self, previous: Option<TaskInfo>) -> HookFuture<()> {
        (self.on_mounted)(previous)
    }

    pub(crate) fn will_unmount(&self, next: Option<TaskInfo>, teardown: TeardownHandle) -> HookFuture<UnmountDecision> {
        (self.on_will_unmount)(next, teardown)
    }

    pub(crate) fn attributes_changed(&self, attributes: &Attributes) {
        (self.on_attributes_changed)(attributes)
    }
}

impl Default for BoundHooks {
    fn default() -> Self {
        Self::bind(ComponentHooks::default())
    }
}

// =============================================================================
// ComponentInstance
// =============================================================================

/// A live component mounted by an outlet.
///
/// Holds a non-owning reference to the task that mounted it and offers its
/// hooks when the task registers it.
pub trait ComponentInstance {
    /// The task this instance was mounted for, if it is still alive.
    fn render_task(&self) -> Option<Rc<RenderTask>>;

    /// Hooks read once, at registration.
    fn hooks(&self) -> ComponentHooks {
        ComponentHooks::default()
    }
}
