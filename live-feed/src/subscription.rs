use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// State shared between a [`FeedSubscription`] handle and its forwarder
/// task. The gate mutex serializes callback invocation against `cancel`,
/// which is what makes "no delivery starts after cancel() returns" hold.
pub(crate) struct SubShared {
    pub(crate) active: AtomicBool,
    pub(crate) gate: Mutex<()>,
    pub(crate) cancel: CancellationToken,
}

impl SubShared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(true),
            gate: Mutex::new(()),
            cancel: CancellationToken::new(),
        })
    }

    /// Runs one delivery under the gate; returns false once the
    /// subscription has been cancelled.
    pub(crate) fn deliver<T>(&self, value: T, on_change: &mut impl FnMut(T)) -> bool {
        let _gate = self.gate.lock();
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        on_change(value);
        true
    }
}

/// Handle to an active feed subscription.
///
/// `cancel` is idempotent. When it returns, no further callback invocation
/// will start; an invocation already in flight is waited out first.
/// Dropping the handle without cancelling leaves the subscription running.
pub struct FeedSubscription {
    id: u64,
    shared: Arc<SubShared>,
}

impl FeedSubscription {
    pub(crate) fn new(id: u64, shared: Arc<SubShared>) -> Self {
        Self { id, shared }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        !self.shared.active.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        if self.shared.active.swap(false, Ordering::SeqCst) {
            // Wait out an in-flight delivery, then stop the forwarder.
            drop(self.shared.gate.lock());
            self.shared.cancel.cancel();
        }
    }
}
