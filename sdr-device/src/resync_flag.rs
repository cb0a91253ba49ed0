use std::time::{
    Duration,
    Instant,
};

use parking_lot::Mutex;

/// A boolean with a time-to-live: once `set()`, it auto-clears after
/// `interval` unless `set()` is called again in the meantime.
///
/// There is no background timer; the deadline is just a remembered instant
/// and `is_set()` compares against it lazily, which is enough in a
/// single-threaded-cooperative coordinator (see the concurrency model) and
/// avoids spawning a task per coordinator just to expire a flag.
#[derive(Debug)]
pub struct ReSyncFlag {
    interval: Duration,
    set_at: Mutex<Option<Instant>>,
}

impl ReSyncFlag {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            set_at: Mutex::new(None),
        }
    }

    pub fn set(&self) {
        *self.set_at.lock() = Some(Instant::now());
    }

    pub fn reset(&self) {
        *self.set_at.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        match *self.set_at.lock() {
            Some(set_at) => set_at.elapsed() < self.interval,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_by_default() {
        let flag = ReSyncFlag::new(Duration::from_secs(60));
        assert!(!flag.is_set());
    }

    #[test]
    fn set_then_reset() {
        let flag = ReSyncFlag::new(Duration::from_secs(60));
        flag.set();
        assert!(flag.is_set());
        flag.reset();
        assert!(!flag.is_set());
    }

    #[test]
    fn auto_clears_after_interval() {
        let flag = ReSyncFlag::new(Duration::from_millis(10));
        flag.set();
        assert!(flag.is_set());
        std::thread::sleep(Duration::from_millis(20));
        assert!(!flag.is_set());
    }
}
