//! The gate (C6): the process-wide coordination object that lets growth run
//! single-threaded while leaving the hot insert/remove/delete path almost
//! entirely lock-free with respect to each other (they only ever contend on
//! a single bucket-group lock, never on the gate, except across a growth
//! episode).
//!
//! Every batched mutator runs [`Gate::enter`] before touching any bucket and
//! one of [`Gate::exit`] / [`Gate::try_begin_growth`] + [`Gate::finish_growth`]
//! after. `parking_lot::Condvar::wait` re-tests its predicate in a loop
//! rather than trusting a single wakeup, which is what guards against
//! spurious wakeups (spec.md §9).

use parking_lot::{Condvar, Mutex};

struct GateInner {
    open: bool,
    in_flight: u64,
}

pub(crate) struct Gate {
    inner: Mutex<GateInner>,
    gate_open_cv: Condvar,
    grow_done_cv: Condvar,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                open: true,
                in_flight: 0,
            }),
            gate_open_cv: Condvar::new(),
            grow_done_cv: Condvar::new(),
        }
    }

    /// Entry protocol: block until the gate is open, then register as
    /// in-flight. Must be called before any bucket lock is taken.
    pub(crate) fn enter(&self) {
        let mut g = self.inner.lock();
        while !g.open {
            self.gate_open_cv.wait(&mut g);
        }
        g.in_flight += 1;
    }

    /// Plain exit: this mutator is done and did not trigger growth. If the
    /// gate happens to be closed (a grower is draining), wake it in case
    /// this was the last holdout.
    pub(crate) fn exit(&self) {
        let mut g = self.inner.lock();
        g.in_flight -= 1;
        if !g.open {
            self.grow_done_cv.notify_one();
        }
    }

    /// Attempts to become the exclusive grower. Returns `false` (without
    /// touching `in_flight`) if another thread already closed the gate first
    /// — that thread owns the growth episode and this caller should fall
    /// back to a plain [`Gate::exit`]. Returns `true` once every other
    /// in-flight mutator has drained, at which point the caller — and only
    /// the caller — may touch the slot array until it calls
    /// [`Gate::finish_growth`].
    pub(crate) fn try_begin_growth(&self) -> bool {
        let mut g = self.inner.lock();
        if !g.open {
            return false;
        }
        g.open = false;
        while g.in_flight > 1 {
            self.grow_done_cv.wait(&mut g);
        }
        true
    }

    /// Re-opens the gate after a growth episode and wakes every entrant
    /// waiting on it.
    pub(crate) fn finish_growth(&self) {
        let mut g = self.inner.lock();
        g.open = true;
        g.in_flight -= 1;
        self.gate_open_cv.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> u64 {
        self.inner.lock().in_flight
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.inner.lock().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Runs `f` on its own thread and panics if it doesn't finish within
    /// `dur` — borrowed from the reference implementation's lock tests so a
    /// deadlocked gate fails the test suite instead of hanging it forever.
    fn panic_timeout<T, F>(dur: Duration, f: F) -> T
    where
        T: Send + 'static,
        F: (FnOnce() -> T) + Send + 'static,
    {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            let val = f();
            let _ = tx.send(());
            val
        });
        let start = Instant::now();
        loop {
            if rx.recv_timeout(Duration::from_millis(10)).is_ok() {
                return handle.join().expect("gate test thread panicked");
            }
            if start.elapsed() > dur {
                panic!("gate test timed out after {:?}", dur);
            }
        }
    }

    #[test]
    fn enter_exit_round_trip() {
        let gate = Gate::new();
        gate.enter();
        assert_eq!(gate.in_flight(), 1);
        gate.exit();
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.is_open());
    }

    #[test]
    fn growth_drains_other_entrants_before_proceeding() {
        let gate = Arc::new(Gate::new());
        gate.enter();
        gate.enter();
        assert_eq!(gate.in_flight(), 2);

        let g2 = Arc::clone(&gate);
        let grower = std::thread::spawn(move || {
            assert!(g2.try_begin_growth());
            g2.finish_growth();
        });

        // give the grower a chance to close the gate and start waiting
        std::thread::sleep(Duration::from_millis(20));
        assert!(!gate.is_open());

        gate.exit();
        panic_timeout(Duration::from_secs(5), move || grower.join().unwrap());
        assert!(gate.is_open());
    }

    #[test]
    fn second_grow_attempt_loses_the_race() {
        let gate = Arc::new(Gate::new());
        gate.enter();
        assert!(gate.try_begin_growth());
        // a second caller that also observed overflow must not also become
        // a grower while one is already in progress
        assert!(!gate.try_begin_growth());
        gate.finish_growth();
    }

    #[test]
    fn entrants_block_while_gate_closed() {
        let gate = Arc::new(Gate::new());
        gate.enter();
        assert!(gate.try_begin_growth());

        let g2 = Arc::clone(&gate);
        let waiter = std::thread::spawn(move || {
            g2.enter();
            g2.exit();
        });

        std::thread::sleep(Duration::from_millis(20));
        gate.finish_growth();
        panic_timeout(Duration::from_secs(5), move || waiter.join().unwrap());
    }
}
