use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Guards a user action against re-invocation while a call is outstanding.
///
/// This is a debounce, not a queue: a second `try_begin` while busy is
/// refused outright.
#[derive(Clone, Default)]
pub struct BusyFlag {
    busy: Arc<AtomicBool>,
}

/// Held while the action runs; dropping it clears the flag, success or not.
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_refused_until_guard_drops() {
        let flag = BusyFlag::new();
        let guard = flag.try_begin().expect("first begin");
        assert!(flag.is_busy());
        assert!(flag.try_begin().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_begin().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = BusyFlag::new();
        let other = flag.clone();
        let _guard = flag.try_begin().expect("begin");
        assert!(other.is_busy());
        assert!(other.try_begin().is_none());
    }

    #[test]
    fn test_flag_resets_when_action_fails() {
        let flag = BusyFlag::new();
        let attempt = || -> Result<(), &'static str> {
            let _guard = flag.try_begin().ok_or("busy")?;
            Err("network down")
        };
        assert_eq!(attempt(), Err("network down"));
        assert!(!flag.is_busy());
    }
}
