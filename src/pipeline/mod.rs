//! Render Pipeline
//!
//! Sequencing of mounts and teardowns inside one outlet.
//!
//! # Pipeline Architecture
//!
//! ```text
//! render_component → OutletQueue → RenderTask::perform → rendered signal → outlet mounts
//! ```
//!
//! ## Data Flow
//!
//! 1. **OutletQueue** - decides whether a render updates, replaces or waits
//! 2. **RenderTask** - mounts, waits for registration, runs hooks, tears down
//! 3. **ComponentHooks** - the component's say in when it may leave
//!
//! ## Key Design Principles
//!
//! - **Strict FIFO**: a task starts only after the previous one finished its teardown
//! - **Flags, not calls**: tasks flip signals; whoever renders watches them
//! - **Hooks are optional**: a missing hook settles immediately

pub mod hooks;
pub mod queue;
pub mod task;

// Re-exports
pub use hooks::{ComponentHooks, ComponentInstance, HookFuture, TeardownHandle, UnmountDecision};
pub use queue::OutletQueue;
pub use task::{RenderTask, TaskList, TaskState};
