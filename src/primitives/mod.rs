//! Outlet primitives - the view side of the render pipeline.
//!
//! - [`catalog`] - turns component names into live instances
//! - [`component_outlet`] - a mount point that follows its queue's tasks
//!
//! # Reactivity
//!
//! An outlet never mounts on its own initiative. Each task's `rendered`
//! signal is the source of truth; the outlet subscribes with an effect and
//! reconciles its mounted instances against it.
//!
//! ```ignore
//! let catalog = ComponentCatalog::new();
//! catalog.register("x-post", |task| Rc::new(PostView::new(task)));
//!
//! let outlet = ComponentOutlet::new(registry, catalog, spawner, "application");
//! outlet.connect();
//! ```

pub mod catalog;
pub mod component_outlet;

pub use catalog::{ComponentCatalog, ComponentFactory, PlainComponent};
pub use component_outlet::ComponentOutlet;
