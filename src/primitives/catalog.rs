//! Component Catalog - looks components up by name.
//!
//! The outlet only knows a component's name. The catalog turns that name into
//! a live instance, handing it a weak reference to the task it belongs to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::pipeline::{ComponentInstance, RenderTask};

/// Builds component instances for an outlet.
pub trait ComponentFactory {
    /// `None` when no component is known by that name.
    fn create(&self, component_name: &str, task: Weak<RenderTask>) -> Option<Rc<dyn ComponentInstance>>;
}

type Constructor = Rc<dyn Fn(Weak<RenderTask>) -> Rc<dyn ComponentInstance>>;

/// Name → constructor map.
#[derive(Default)]
pub struct ComponentCatalog {
    constructors: RefCell<HashMap<String, Constructor>>,
}

impl ComponentCatalog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register (or replace) a constructor.
    pub fn register<F, C>(&self, component_name: impl Into<String>, constructor: F)
    where
        F: Fn(Weak<RenderTask>) -> Rc<C> + 'static,
        C: ComponentInstance + 'static,
    {
        self.constructors.borrow_mut().insert(
            component_name.into(),
            Rc::new(move |task| -> Rc<dyn ComponentInstance> { constructor(task) }),
        );
    }

    /// Register a component that offers no hooks.
    pub fn register_plain(&self, component_name: impl Into<String>) {
        self.register(component_name, |task| Rc::new(PlainComponent { task }));
    }

    pub fn unregister(&self, component_name: &str) -> bool {
        self.constructors.borrow_mut().remove(component_name).is_some()
    }

    pub fn contains(&self, component_name: &str) -> bool {
        self.constructors.borrow().contains_key(component_name)
    }
}

impl ComponentFactory for ComponentCatalog {
    fn create(&self, component_name: &str, task: Weak<RenderTask>) -> Option<Rc<dyn ComponentInstance>> {
        // Constructors may build nested outlets; don't hold the map while they run
        let constructor = self.constructors.borrow().get(component_name).cloned()?;
        Some(constructor(task))
    }
}

/// A component with no lifecycle hooks.
pub struct PlainComponent {
    task: Weak<RenderTask>,
}

impl ComponentInstance for PlainComponent {
    fn render_task(&self) -> Option<Rc<RenderTask>> {
        self.task.upgrade()
    }
}
