//! Scheduler - single-threaded cooperative execution.
//!
//! Every suspension point in the render lifecycle is a future polled by one
//! local executor. Nothing runs in parallel: state changes between two
//! awaits are atomic from the point of view of every other task.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Scheduler::new();
//! let registry = RenderRegistry::new();
//! let outlet = ComponentOutlet::new(registry.clone(), catalog, scheduler.spawner(), "application");
//!
//! // ... routes queue renders ...
//!
//! // Drive every pending transition as far as it can go
//! scheduler.run_until_stalled();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::{LocalSpawn, LocalSpawnExt};

// =============================================================================
// Spawner
// =============================================================================

/// Cloneable handle used to schedule render work.
///
/// Wraps any [`LocalSpawn`], so a host can plug in its own event loop.
#[derive(Clone)]
pub struct Spawner {
    inner: Rc<dyn LocalSpawn>,
}

impl Spawner {
    pub fn new(spawn: impl LocalSpawn + 'static) -> Self {
        Self {
            inner: Rc::new(spawn),
        }
    }

    /// Schedule a future on the executor.
    ///
    /// Fails only when the executor has shut down; the work is then dropped
    /// and the failure logged.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.inner.as_ref().spawn_local(future) {
            tracing::warn!(%err, "render work dropped: executor is shut down");
        }
    }
}

impl From<LocalSpawner> for Spawner {
    fn from(spawner: LocalSpawner) -> Self {
        Self::new(spawner)
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner").finish_non_exhaustive()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Owns the local executor that drives every outlet queue.
pub struct Scheduler {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl Scheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
        }
    }

    pub fn spawner(&self) -> Spawner {
        Spawner::from(self.spawner.clone())
    }

    /// Run every ready future until nothing can make progress.
    ///
    /// Must not be called from inside a future running on this scheduler.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Run ready futures one at a time. Returns false once nothing is ready.
    pub fn try_run_one(&self) -> bool {
        self.pool.borrow_mut().try_run_one()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
