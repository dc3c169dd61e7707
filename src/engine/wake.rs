//! Cross-thread wake-up primitive (§4.6).
//!
//! One-shot: a wake fulfils exactly one waiter, then the promise is
//! implicitly replaced for the next wait. Re-entrant notification from the
//! loop thread itself never blocks, since `notify` only ever stores a flag
//! and signals a condvar.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

pub struct WakeSignal {
    woken: Mutex<bool>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            woken: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Fulfil the current wake promise. Safe to call from any thread,
    /// including the loop thread itself.
    pub fn notify(&self) {
        let mut woken = self.woken.lock();
        *woken = true;
        self.condvar.notify_all();
    }

    /// Wait up to `timeout` for a notification, or return immediately if
    /// one is already pending. Consumes the wake promise on return.
    pub fn wait_timeout(&self, timeout: Duration) {
        let mut woken = self.woken.lock();
        if !*woken {
            let _ = self.condvar.wait_for(&mut woken, timeout);
        }
        *woken = false;
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn notify_wakes_a_waiter_immediately() {
        let signal = Arc::new(WakeSignal::new());
        let waiter = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            let start = Instant::now();
            waiter.wait_timeout(Duration::from_secs(5));
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(20));
        signal.notify();
        let waited = handle.join().unwrap();
        assert!(waited < Duration::from_secs(1));
    }

    #[test]
    fn wait_times_out_without_notify() {
        let signal = WakeSignal::new();
        let start = Instant::now();
        signal.wait_timeout(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wake_is_one_shot_and_replaced() {
        let signal = WakeSignal::new();
        signal.notify();
        signal.wait_timeout(Duration::from_millis(10)); // consumes the promise
        let start = Instant::now();
        signal.wait_timeout(Duration::from_millis(20)); // must actually wait again
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
