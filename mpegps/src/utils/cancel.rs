use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a running scan and its owner.
///
/// The scan polls the flag each time it asks the window reader for bytes and
/// stops with a partial result once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[test]
fn clones_share_state() {
    let token = CancellationToken::new();
    let observer = token.clone();
    assert!(!observer.is_cancelled());

    token.cancel();
    assert!(observer.is_cancelled());
}
