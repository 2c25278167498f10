//! Per-task mutual exclusion
//!
//! [`TaskLock`] records which task ids currently have a restart in flight.
//! Acquisition is an atomic check-and-mark; release happens when the
//! returned [`TaskLockGuard`] is dropped, so every exit path of the guarded
//! body (early return, `?`, panic, or a dropped future) frees the id.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Registry of task ids that are currently locked
#[derive(Debug, Default)]
pub struct TaskLock {
    held: Mutex<HashSet<u64>>,
}

impl TaskLock {
    /// Create an empty lock registry
    pub fn new() -> Self {
        Self::default()
    }

    // The set is always left consistent, so a poisoned mutex is still usable.
    fn held(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the lock for `task_id` is currently held
    pub fn is_running(&self, task_id: u64) -> bool {
        self.held().contains(&task_id)
    }

    /// Atomically acquire the lock for `task_id`
    ///
    /// Returns `None` if another caller already holds it.
    pub fn try_acquire(&self, task_id: u64) -> Option<TaskLockGuard<'_>> {
        if self.held().insert(task_id) {
            Some(TaskLockGuard {
                lock: self,
                task_id,
            })
        } else {
            None
        }
    }

    /// Release the lock for `task_id`; idempotent
    pub fn complete(&self, task_id: u64) {
        self.held().remove(&task_id);
    }

    /// Number of ids currently held
    pub fn held_count(&self) -> usize {
        self.held().len()
    }
}

/// Scoped ownership of one task id
#[must_use = "the task lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TaskLockGuard<'a> {
    lock: &'a TaskLock,
    task_id: u64,
}

impl TaskLockGuard<'_> {
    /// The locked task id
    pub fn task_id(&self) -> u64 {
        self.task_id
    }
}

impl Drop for TaskLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.complete(self.task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_acquire_and_release() {
        let lock = TaskLock::new();
        assert!(!lock.is_running(7));

        let guard = lock.try_acquire(7).unwrap();
        assert_eq!(guard.task_id(), 7);
        assert!(lock.is_running(7));

        drop(guard);
        assert!(!lock.is_running(7));
    }

    #[test]
    fn test_second_acquire_fails() {
        let lock = TaskLock::new();
        let _guard = lock.try_acquire(7).unwrap();

        assert!(lock.try_acquire(7).is_none());
        assert!(lock.try_acquire(8).is_some());
    }

    #[test]
    fn test_complete_is_idempotent() {
        let lock = TaskLock::new();
        lock.complete(1);

        let guard = lock.try_acquire(1).unwrap();
        lock.complete(1);
        lock.complete(1);
        assert!(!lock.is_running(1));

        drop(guard);
        assert_eq!(lock.held_count(), 0);
    }

    #[test]
    fn test_released_on_early_return() {
        fn guarded(lock: &TaskLock, fail: bool) -> Result<(), &'static str> {
            let _guard = lock.try_acquire(5).ok_or("busy")?;
            if fail {
                return Err("failed");
            }
            Ok(())
        }

        let lock = TaskLock::new();
        assert_eq!(guarded(&lock, true), Err("failed"));
        assert!(!lock.is_running(5));
        assert_eq!(guarded(&lock, false), Ok(()));
        assert!(!lock.is_running(5));
    }

    #[test]
    fn test_released_on_panic() {
        let lock = Arc::new(TaskLock::new());
        let inner = lock.clone();

        let result = std::thread::spawn(move || {
            let _guard = inner.try_acquire(9).unwrap();
            panic!("boom");
        })
        .join();

        assert!(result.is_err());
        assert!(!lock.is_running(9));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let lock = Arc::new(TaskLock::new());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));
        let gate = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let lock = lock.clone();
                let barrier = barrier.clone();
                let gate = gate.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let guard = lock.try_acquire(42);
                    let won = guard.is_some();
                    // Hold until every thread has tried
                    gate.wait();
                    won
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(!lock.is_running(42));
    }
}
