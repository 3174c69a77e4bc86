//! Render Engine - scheduling and the central render registry.
//!
//! The engine holds the pieces every outlet and route shares:
//! - Scheduler: the local executor all render work runs on
//! - Latch: one-shot suspension points for render tasks
//! - Registry: matches render requests against live outlets
//!
//! # Architecture
//!
//! Routes and outlets never talk to each other directly:
//!
//! ```text
//! Route ──queue_render──▶ RenderRegistry ◀──connect_outlet── ComponentOutlet
//!                               │
//!                               └──render_component──▶ matching outlets
//! ```
//!
//! Whichever side arrives second triggers the match.

mod latch;
mod registry;
mod scheduler;

pub(crate) use latch::Latch;
pub use registry::*;
pub use scheduler::*;
