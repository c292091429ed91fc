//! A two-tier mutex protecting the terminal state.
//!
//! Two acquisition modes exist: `normal` (the PTY reader, which may hold
//! the lock for a whole chunk of input) and `priority` (the renderer, which
//! must repaint and inject input with bounded latency). Any priority waiter
//! is served before any normal waiter; the two modes are mutually
//! exclusive otherwise.
//!
//! The implementation is a mutex-guarded waiter count plus a condition
//! variable: normal acquisition refuses to take the lock while a priority
//! waiter is queued, so a release always hands the lock to the priority
//! side first.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    locked: bool,
    priority_waiters: usize,
}

/// A mutual-exclusion lock where priority acquisitions always win over
/// normal ones.
#[derive(Debug, Default)]
pub struct PriorityLock<T> {
    state: Mutex<LockState>,
    available: Condvar,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by the locked/priority_waiters
// protocol; a guard exists for at most one thread at a time.
unsafe impl<T: Send> Send for PriorityLock<T> {}
// SAFETY: as above — the protocol gives the same exclusivity guarantees as
// a standard mutex.
unsafe impl<T: Send> Sync for PriorityLock<T> {}

impl<T> PriorityLock<T> {
    /// Wraps a value in the lock.
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            available: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock in normal mode, yielding to any queued priority
    /// waiter first.
    pub fn lock(&self) -> PriorityLockGuard<'_, T> {
        let mut state = self.state.lock().expect("priority lock poisoned");
        while state.locked || state.priority_waiters > 0 {
            state = self
                .available
                .wait(state)
                .expect("priority lock poisoned");
        }
        state.locked = true;
        PriorityLockGuard { lock: self }
    }

    /// Acquires the lock in priority mode, overtaking all normal waiters.
    pub fn lock_priority(&self) -> PriorityLockGuard<'_, T> {
        let mut state = self.state.lock().expect("priority lock poisoned");
        state.priority_waiters += 1;
        while state.locked {
            state = self
                .available
                .wait(state)
                .expect("priority lock poisoned");
        }
        state.priority_waiters -= 1;
        state.locked = true;
        PriorityLockGuard { lock: self }
    }

    /// Direct access when the lock is exclusively borrowed.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the lock, returning the inner value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn unlock(&self) {
        let mut state = self.state.lock().expect("priority lock poisoned");
        state.locked = false;
        drop(state);
        // Wake everyone; normal waiters re-check the priority count and go
        // back to sleep if a priority waiter is queued.
        self.available.notify_all();
    }
}

/// RAII guard for [`PriorityLock`]; releases the lock on drop.
#[derive(Debug)]
pub struct PriorityLockGuard<'a, T> {
    lock: &'a PriorityLock<T>,
}

impl<T> Deref for PriorityLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for PriorityLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for PriorityLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn exclusive_access() {
        let lock = Arc::new(PriorityLock::new(0usize));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *lock.lock() += 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 8000);
    }

    #[test]
    fn priority_waiter_beats_normal_waiter() {
        let lock = Arc::new(PriorityLock::new(Vec::<&str>::new()));
        let order = Arc::new(AtomicUsize::new(0));

        let guard = lock.lock();

        let normal = {
            let lock = Arc::clone(&lock);
            let order = Arc::clone(&order);
            thread::spawn(move || {
                let mut g = lock.lock();
                g.push("normal");
                order.fetch_add(1, Ordering::SeqCst);
            })
        };
        // Give the normal waiter time to queue up first.
        thread::sleep(Duration::from_millis(50));
        let priority = {
            let lock = Arc::clone(&lock);
            let order = Arc::clone(&order);
            thread::spawn(move || {
                let mut g = lock.lock_priority();
                g.push("priority");
                order.fetch_add(1, Ordering::SeqCst);
            })
        };
        thread::sleep(Duration::from_millis(50));

        drop(guard);
        priority.join().unwrap();
        normal.join().unwrap();

        let observed = lock.lock();
        assert_eq!(&*observed, &["priority", "normal"]);
    }

    #[test]
    fn get_mut_bypasses_locking() {
        let mut lock = PriorityLock::new(7);
        *lock.get_mut() = 9;
        assert_eq!(lock.into_inner(), 9);
    }
}
