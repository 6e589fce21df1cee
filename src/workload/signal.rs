use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Advisory marker for "a fault is currently being injected".
///
/// The controller is the only writer; worker tasks read it around each
/// operation to decide which result category the attempt belongs to. Reads
/// are deliberately racy: an operation that straddles `set()`/`clear()` may
/// land on either side, and assertions tolerate that only on the set side.
/// Relaxed ordering is enough because the flag never gates correctness.
#[derive(Debug, Clone, Default)]
pub struct FaultWindow {
    flag: Arc<AtomicBool>,
}

impl FaultWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the window. Call strictly before the fault-inducing action.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Close the window. Call strictly after the cluster is confirmed
    /// recovered.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Cooperative stop signal for worker tasks, separate from the fault window.
///
/// Workers check this between iterations only; an in-flight storage call is
/// never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_set_clear() {
        let window = FaultWindow::new();
        assert!(!window.is_set());

        window.set();
        assert!(window.is_set());

        window.clear();
        assert!(!window.is_set());
    }

    #[test]
    fn test_window_clones_share_state() {
        let window = FaultWindow::new();
        let reader = window.clone();

        window.set();
        assert!(reader.is_set());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());

        token.cancel();
        assert!(observer.is_cancelled());
    }
}
