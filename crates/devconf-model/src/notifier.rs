//! Shared "notification pending" flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to one pending-notification flag.
///
/// Every clone observes the same flag.  [`ResInfo`][crate::ResInfo] raises it
/// on each setter call; the lifecycle layer clears it after dispatching the
/// outbound state.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    pending: Arc<AtomicBool>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let notifier = Notifier::new();
        let other = notifier.clone();
        assert!(!other.is_pending());
        notifier.enable();
        assert!(other.is_pending());
        other.clear();
        assert!(!notifier.is_pending());
    }
}
