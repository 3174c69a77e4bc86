//! Outlet Queue - one-at-a-time task execution for a single outlet.
//!
//! Tasks are appended in submission order and handed to a single worker
//! future. The worker awaits each task's whole `perform`, teardown included,
//! before it even starts the next, so the next component never mounts while
//! the previous one is still settling (unless that one deferred its teardown).
//!
//! # Pattern: Worker Drain
//!
//! ```text
//! submit_render ──▶ tasks (shared list) ──▶ channel ──▶ worker: perform(1) → perform(2) → ...
//! ```
//!
//! A failed `perform` stops the worker. The error is kept as the queue's
//! fault and the outlet stays stalled: nothing after it will mount.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::mpsc;
use futures::StreamExt;

use crate::engine::Spawner;
use crate::error::RenderError;
use crate::types::{is_descendant_route, Attributes};

use super::hooks::ComponentInstance;
use super::task::{RenderTask, TaskList};

pub struct OutletQueue {
    tasks: TaskList,
    sender: mpsc::UnboundedSender<Rc<RenderTask>>,
    spawner: Spawner,
    fault: Rc<RefCell<Option<RenderError>>>,
}

impl OutletQueue {
    pub fn new(spawner: Spawner) -> Self {
        let tasks: TaskList = Rc::new(RefCell::new(Vec::new()));
        let fault: Rc<RefCell<Option<RenderError>>> = Rc::new(RefCell::new(None));
        let (sender, mut receiver) = mpsc::unbounded::<Rc<RenderTask>>();

        let worker_tasks = tasks.clone();
        let worker_fault = fault.clone();
        spawner.spawn(async move {
            while let Some(task) = receiver.next().await {
                if let Err(err) = task.perform(worker_tasks.clone()).await {
                    tracing::error!(%err, "render task failed, outlet stalled");
                    *worker_fault.borrow_mut() = Some(err);
                    break;
                }
            }
        });

        Self {
            tasks,
            sender,
            spawner,
            fault,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Submit a render for this outlet.
    ///
    /// - Same assignment as the last task, not yet leaving: update its
    ///   attributes in place, no new task.
    /// - Last task belongs to an ancestor route: permit its teardown now,
    ///   since that route stays active and will never deactivate for us.
    /// - Same assignment already mounted and not leaving: nothing to do.
    /// - Otherwise: append a new task behind every earlier one.
    ///
    /// Returns the new task, if one was created.
    pub fn submit_render(
        &self,
        component_name: &str,
        route_name: &str,
        attributes: Attributes,
    ) -> Option<Rc<RenderTask>> {
        if let Some(last) = self.last_task() {
            if !last.is_tearing_down() && last.matches(component_name, route_name) {
                tracing::trace!(component = component_name, route = route_name, "render is an attribute update");
                let error_fault = self.fault.clone();
                self.spawner.spawn(async move {
                    if let Err(err) = last.update_attributes(attributes).await {
                        tracing::warn!(%err, "attribute update dropped");
                        error_fault.borrow_mut().get_or_insert(err);
                    }
                });
                return None;
            }

            if is_descendant_route(last.route_name(), route_name) {
                tracing::trace!(
                    parent = last.route_name(),
                    route = route_name,
                    "child route render, releasing parent component"
                );
                self.signal_teardown(last.component_name(), last.route_name());
            }
        }

        let duplicate = self.tasks.borrow().iter().any(|task| {
            task.matches(component_name, route_name) && task.state().is_stable()
        });
        if duplicate {
            tracing::trace!(component = component_name, route = route_name, "already mounted, render skipped");
            return None;
        }

        let task = RenderTask::new(component_name, route_name, attributes);
        self.tasks.borrow_mut().push(task.clone());

        if self.sender.unbounded_send(task.clone()).is_err() {
            tracing::warn!(component = component_name, route = route_name, "outlet queue stalled, task will not mount");
        }

        Some(task)
    }

    /// Permit every task for `(component, route)` to tear down.
    pub fn signal_teardown(&self, component_name: &str, route_name: &str) {
        let matching: Vec<Rc<RenderTask>> = self
            .tasks
            .borrow()
            .iter()
            .filter(|task| task.matches(component_name, route_name))
            .cloned()
            .collect();

        for task in matching {
            task.permit_teardown();
        }
    }

    /// Register hooks for freshly mounted instances.
    ///
    /// Call after each render pass; instances already registered are skipped.
    pub fn after_children_rendered<'a>(&self, instances: impl IntoIterator<Item = &'a dyn ComponentInstance>) {
        for instance in instances {
            let Some(task) = instance.render_task() else {
                continue;
            };
            if !task.is_registered() {
                task.register_hooks(instance);
            }
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn tasks(&self) -> Vec<Rc<RenderTask>> {
        self.tasks.borrow().clone()
    }

    pub fn last_task(&self) -> Option<Rc<RenderTask>> {
        self.tasks.borrow().last().cloned()
    }

    /// Tasks whose component is currently mounted, oldest first.
    pub fn rendered_tasks(&self) -> Vec<Rc<RenderTask>> {
        self.tasks
            .borrow()
            .iter()
            .filter(|task| task.is_rendered())
            .cloned()
            .collect()
    }

    pub fn contains(&self, task: &Rc<RenderTask>) -> bool {
        self.tasks.borrow().iter().any(|queued| Rc::ptr_eq(queued, task))
    }

    /// The error that stalled this queue, if any.
    pub fn fault(&self) -> Option<RenderError> {
        self.fault.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Scheduler;
    use crate::error::HookError;
    use crate::pipeline::hooks::{ComponentHooks, UnmountDecision};
    use crate::pipeline::task::TaskState;
    use serde_json::json;
    use std::cell::Cell;

    fn setup() -> (Scheduler, OutletQueue) {
        let scheduler = Scheduler::new();
        let queue = OutletQueue::new(scheduler.spawner());
        (scheduler, queue)
    }

    /// Register every rendered-but-unregistered task with `hooks_for`.
    fn register_rendered(queue: &OutletQueue, hooks_for: impl Fn(&RenderTask) -> ComponentHooks) {
        for task in queue.rendered_tasks() {
            if !task.is_registered() {
                task.bind_hooks(hooks_for(&task));
            }
        }
    }

    fn names(tasks: &[Rc<RenderTask>]) -> Vec<String> {
        tasks.iter().map(|task| task.component_name().to_string()).collect()
    }

    #[test]
    fn test_submit_creates_and_mounts_task() {
        let (scheduler, queue) = setup();

        let task = queue.submit_render("x-foo", "index", Attributes::default()).unwrap();
        assert_eq!(task.state(), TaskState::empty());

        scheduler.run_until_stalled();
        assert!(task.is_rendered());
        assert_eq!(queue.tasks().len(), 1);
    }

    #[test]
    fn test_fifo_next_waits_for_full_teardown() {
        let (scheduler, queue) = setup();
        let log = Rc::new(RefCell::new(Vec::<String>::new()));

        let first = queue.submit_render("first", "a", Attributes::default()).unwrap();
        let second = queue.submit_render("second", "b", Attributes::default()).unwrap();
        scheduler.run_until_stalled();

        // Only the first task starts
        assert!(first.is_rendered());
        assert_eq!(second.state(), TaskState::empty());

        let hooks_for = |task: &RenderTask| {
            let name = task.component_name().to_string();
            let mounted_log = log.clone();
            let unmount_log = log.clone();
            let mounted_name = name.clone();
            ComponentHooks::new()
                .on_mounted(move |_| {
                    mounted_log.borrow_mut().push(format!("mount {mounted_name}"));
                    async { Ok(()) }
                })
                .on_will_unmount(move |_, _| {
                    unmount_log.borrow_mut().push(format!("unmount {name}"));
                    async { Ok(UnmountDecision::Now) }
                })
        };

        register_rendered(&queue, hooks_for);
        scheduler.run_until_stalled();
        assert!(!second.is_rendered());

        queue.signal_teardown("first", "a");
        scheduler.run_until_stalled();
        assert!(!first.is_rendered());
        assert!(second.is_rendered());

        register_rendered(&queue, hooks_for);
        scheduler.run_until_stalled();

        assert_eq!(*log.borrow(), vec!["mount first", "unmount first", "mount second"]);
        // The torn-down predecessor was swept when the second mounted
        assert_eq!(names(&queue.tasks()), vec!["second"]);
    }

    #[test]
    fn test_at_most_one_stable_task() {
        let (scheduler, queue) = setup();
        let stable_counts = Rc::new(RefCell::new(Vec::new()));

        for (component, route) in [("one", "a"), ("two", "b"), ("three", "c")] {
            queue.submit_render(component, route, Attributes::default());
        }

        for (component, route) in [("one", "a"), ("two", "b"), ("three", "c")] {
            scheduler.run_until_stalled();
            stable_counts
                .borrow_mut()
                .push(queue.tasks().iter().filter(|t| t.state().is_stable()).count());
            register_rendered(&queue, |_| ComponentHooks::new());
            scheduler.run_until_stalled();
            stable_counts
                .borrow_mut()
                .push(queue.tasks().iter().filter(|t| t.state().is_stable()).count());
            queue.signal_teardown(component, route);
        }

        assert!(stable_counts.borrow().iter().all(|&count| count <= 1));
    }

    #[test]
    fn test_same_assignment_updates_attributes() {
        let (scheduler, queue) = setup();
        let changes = Rc::new(Cell::new(0));
        let mounts = Rc::new(Cell::new(0));

        let task = queue.submit_render("x-foo", "a", json!({ "n": 1 }).into()).unwrap();
        scheduler.run_until_stalled();

        let counter = changes.clone();
        let mount_counter = mounts.clone();
        task.bind_hooks(
            ComponentHooks::new()
                .on_mounted(move |_| {
                    mount_counter.set(mount_counter.get() + 1);
                    async { Ok(()) }
                })
                .on_attributes_changed(move |_| counter.set(counter.get() + 1)),
        );
        scheduler.run_until_stalled();

        assert!(queue.submit_render("x-foo", "a", json!({ "n": 2 }).into()).is_none());
        scheduler.run_until_stalled();

        assert_eq!(queue.tasks().len(), 1);
        assert_eq!(task.attributes().data(), &json!({ "n": 2 }));
        assert_eq!(changes.get(), 1);
        assert_eq!(mounts.get(), 1);
        assert!(task.state().is_stable());
    }

    #[test]
    fn test_tearing_down_task_is_not_updated() {
        let (scheduler, queue) = setup();

        let first = queue.submit_render("x-foo", "a", json!({ "n": 1 }).into()).unwrap();
        scheduler.run_until_stalled();
        first.bind_hooks(
            ComponentHooks::new().on_will_unmount(|_, _| async { Ok(UnmountDecision::Deferred) }),
        );
        queue.signal_teardown("x-foo", "a");
        scheduler.run_until_stalled();
        assert!(first.is_tearing_down());

        let second = queue.submit_render("x-foo", "a", json!({ "n": 2 }).into());
        assert!(second.is_some());
        assert_eq!(first.attributes().data(), &json!({ "n": 1 }));
    }

    #[test]
    fn test_child_route_releases_parent() {
        let (scheduler, queue) = setup();

        let parent = queue.submit_render("parent-view", "parent", Attributes::default()).unwrap();
        scheduler.run_until_stalled();
        parent.bind_hooks(ComponentHooks::new());
        scheduler.run_until_stalled();
        assert!(!parent.is_teardown_permitted());

        let child = queue.submit_render("child-view", "parent.child", Attributes::default()).unwrap();
        assert!(parent.is_teardown_permitted());

        scheduler.run_until_stalled();
        assert!(!parent.is_rendered());
        assert!(child.is_rendered());
    }

    #[test]
    fn test_sibling_route_does_not_release() {
        let (scheduler, queue) = setup();

        let first = queue.submit_render("view", "parent", Attributes::default()).unwrap();
        scheduler.run_until_stalled();
        queue.submit_render("view", "parental", Attributes::default());

        assert!(!first.is_teardown_permitted());
    }

    #[test]
    fn test_duplicate_stable_render_skipped() {
        let (scheduler, queue) = setup();

        let first = queue.submit_render("x-foo", "a", Attributes::default()).unwrap();
        scheduler.run_until_stalled();
        first.bind_hooks(ComponentHooks::new());
        queue.submit_render("x-bar", "b", Attributes::default()).unwrap();

        // x-foo/a is still mounted and stable behind x-bar
        assert!(queue.submit_render("x-foo", "a", Attributes::default()).is_none());
        assert_eq!(queue.tasks().len(), 2);
    }

    #[test]
    fn test_signal_teardown_without_match_is_noop() {
        let (scheduler, queue) = setup();
        let task = queue.submit_render("x-foo", "a", Attributes::default()).unwrap();
        scheduler.run_until_stalled();

        queue.signal_teardown("x-foo", "other");
        assert!(!task.is_teardown_permitted());
    }

    #[test]
    fn test_deferred_teardown_overlaps_next_mount() {
        let (scheduler, queue) = setup();
        let handles = Rc::new(RefCell::new(Vec::new()));

        let first = queue.submit_render("first", "a", Attributes::default()).unwrap();
        let second = queue.submit_render("second", "b", Attributes::default()).unwrap();
        scheduler.run_until_stalled();

        let stash = handles.clone();
        first.bind_hooks(ComponentHooks::new().on_will_unmount(move |_, teardown| {
            stash.borrow_mut().push(teardown);
            async { Ok(UnmountDecision::Deferred) }
        }));
        queue.signal_teardown("first", "a");
        scheduler.run_until_stalled();

        // Both mounted while the exit transition runs
        assert_eq!(names(&queue.rendered_tasks()), vec!["first", "second"]);

        handles.borrow()[0].teardown();
        assert_eq!(names(&queue.rendered_tasks()), vec!["second"]);
    }

    #[test]
    fn test_hook_failure_stalls_queue() {
        let (scheduler, queue) = setup();

        let first = queue.submit_render("first", "a", Attributes::default()).unwrap();
        let second = queue.submit_render("second", "b", Attributes::default()).unwrap();
        scheduler.run_until_stalled();

        first.bind_hooks(ComponentHooks::new().on_mounted(|_| async { Err(HookError::new("boom")) }));
        scheduler.run_until_stalled();
        queue.signal_teardown("first", "a");
        scheduler.run_until_stalled();

        assert!(matches!(queue.fault(), Some(RenderError::Hook { hook: "on_mounted", .. })));
        assert!(!second.is_rendered());
    }

    #[test]
    fn test_after_children_rendered_registers_once() {
        use crate::pipeline::hooks::ComponentInstance;
        use std::rc::Weak;

        struct Counted {
            task: Weak<RenderTask>,
            reads: Rc<Cell<usize>>,
        }

        impl ComponentInstance for Counted {
            fn render_task(&self) -> Option<Rc<RenderTask>> {
                self.task.upgrade()
            }

            fn hooks(&self) -> ComponentHooks {
                self.reads.set(self.reads.get() + 1);
                ComponentHooks::new()
            }
        }

        let (scheduler, queue) = setup();
        let task = queue.submit_render("x-foo", "a", Attributes::default()).unwrap();
        scheduler.run_until_stalled();

        let reads = Rc::new(Cell::new(0));
        let instance = Counted {
            task: Rc::downgrade(&task),
            reads: reads.clone(),
        };

        queue.after_children_rendered([&instance as &dyn ComponentInstance]);
        queue.after_children_rendered([&instance as &dyn ComponentInstance]);

        assert!(task.is_registered());
        assert_eq!(reads.get(), 1);
    }
}
