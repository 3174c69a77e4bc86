//! # outlet-router
//!
//! Route-driven component rendering into named outlets.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for the
//! reactive lifecycle flags and on a single-threaded `futures` executor for
//! sequencing.
//!
//! ## Architecture
//!
//! Routes produce render requests; outlets consume them. The registry in the
//! middle matches the two, whichever arrives first:
//!
//! ```text
//! RouteBinding → RenderRegistry → ComponentOutlet → OutletQueue → RenderTask
//!                                        ▲                            │
//!                                        └──── rendered signal ───────┘
//! ```
//!
//! Inside one outlet, tasks run strictly one after another. A component may
//! hold its teardown open (for an exit animation) and the next component
//! mounts alongside it until it lets go.
//!
//! ## Modules
//!
//! - [`types`] - attributes, actions and naming helpers
//! - [`engine`] - scheduler, latches and the render registry
//! - [`pipeline`] - render tasks, hooks and the per-outlet queue
//! - [`primitives`] - the component catalog and the outlet view
//! - [`routing`] - host router contract, query params and route bindings
//! - [`config`] - router defaults loaded from TOML
//! - [`error`] - error types

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod routing;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::RouterConfig;

pub use error::{ConfigError, HookError, RenderError, RouteError};

pub use engine::{Outlet, RenderRegistry, RenderRequest, Scheduler, Spawner};

pub use pipeline::{
    ComponentHooks, ComponentInstance, HookFuture, OutletQueue, RenderTask, TaskList, TaskState,
    TeardownHandle, UnmountDecision,
};

pub use primitives::{ComponentCatalog, ComponentFactory, ComponentOutlet, PlainComponent};

pub use routing::{
    ComponentRoute, HostRouter, QueryParam, QueryParamCache, QueryParamsDiff, RenderOptions,
    RouteBinding, RouteRenderer, RouteTree, RouterContext,
};
