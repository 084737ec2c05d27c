//! Cancellation handle for the active transfer.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Owns the cancellation token for the active transfer.
///
/// Each upload begins a fresh token generation, so cancelling outside an
/// active transfer is a harmless no-op and a late cancel can never abort a
/// subsequent upload. Cancellation is cooperative: transports observe the
/// token at their I/O suspension points rather than being preempted.
///
/// Cloning yields a handle onto the same controller; hand a clone to UI
/// code that needs an abort button while `upload()` is in flight.
#[derive(Clone)]
pub struct CancellationController {
    inner: Arc<Mutex<ControllerInner>>,
}

struct ControllerInner {
    token: CancellationToken,
    generation: u64,
}

impl CancellationController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ControllerInner {
                token: CancellationToken::new(),
                generation: 0,
            })),
        }
    }

    /// Starts a new token generation and returns the token the transfer
    /// should observe. Any previously issued token is abandoned, not
    /// cancelled.
    pub(crate) fn begin(&self) -> CancellationToken {
        let mut inner = self.inner.lock().unwrap();
        inner.token = CancellationToken::new();
        inner.generation += 1;
        inner.token.clone()
    }

    /// Cancels the current generation's transfer.
    pub fn cancel(&self) {
        let inner = self.inner.lock().unwrap();
        inner.token.cancel();
    }

    /// Whether the current generation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.token.is_cancelled()
    }

    /// Generation counter; bumps on every [`begin`](Self::begin).
    pub fn generation(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.generation
    }
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_hits_current_generation() {
        let ctrl = CancellationController::new();
        let token = ctrl.begin();
        assert!(!token.is_cancelled());

        ctrl.cancel();
        assert!(token.is_cancelled());
        assert!(ctrl.is_cancelled());
    }

    #[test]
    fn begin_abandons_cancelled_token() {
        let ctrl = CancellationController::new();
        let old = ctrl.begin();
        ctrl.cancel();

        let fresh = ctrl.begin();
        assert!(old.is_cancelled());
        assert!(!fresh.is_cancelled());
        assert!(!ctrl.is_cancelled());
    }

    #[test]
    fn generations_count_uploads() {
        let ctrl = CancellationController::new();
        assert_eq!(ctrl.generation(), 0);
        ctrl.begin();
        ctrl.begin();
        assert_eq!(ctrl.generation(), 2);
    }

    #[test]
    fn clones_share_state() {
        let ctrl = CancellationController::new();
        let handle = ctrl.clone();
        let token = ctrl.begin();

        handle.cancel();
        assert!(token.is_cancelled());
    }
}
