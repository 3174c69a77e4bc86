//! Latch - a one-shot gate any number of futures can wait on.
//!
//! Used for the two external suspension points of a render task:
//! hook registration and teardown permission.

use std::cell::RefCell;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

/// Opens once, stays open. Opening twice is a no-op.
pub(crate) struct Latch {
    sender: RefCell<Option<oneshot::Sender<()>>>,
    receiver: Shared<oneshot::Receiver<()>>,
}

impl Latch {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            sender: RefCell::new(Some(sender)),
            receiver: receiver.shared(),
        }
    }

    pub(crate) fn open(&self) {
        if let Some(sender) = self.sender.borrow_mut().take() {
            let _ = sender.send(());
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.sender.borrow().is_none()
    }

    /// Resolves when the latch opens. Errors if the latch is dropped first.
    pub(crate) fn wait(&self) -> Shared<oneshot::Receiver<()>> {
        self.receiver.clone()
    }
}
