//! Wait/wake primitive keyed on a 32-bit control word.
//!
//! Thin layer over `atomic-wait` (futex on Linux, `WaitOnAddress` on Windows,
//! `__ulock` on macOS):
//!
//! 1. Waiter calls `wait_while(word, expected)` and parks at 0% CPU
//! 2. Other side stores a new value, then `wake_one(word)`
//! 3. Waiter re-checks the word and returns once it differs
//!
//! The kernel wait returns immediately when the word no longer holds
//! `expected`, so a store + wake that lands before the waiter parks is
//! never lost.

use std::sync::atomic::{AtomicU32, Ordering};

/// Park the calling thread until `word` no longer holds `expected`.
///
/// Spurious wakeups are absorbed here: the word is re-checked after every
/// return from the kernel and the thread parks again if it still matches.
pub fn wait_while(word: &AtomicU32, expected: u32) {
    while word.load(Ordering::SeqCst) == expected {
        atomic_wait::wait(word, expected);
    }
}

/// Wake at most one thread parked on `word`.
#[inline]
pub fn wake_one(word: &AtomicU32) {
    atomic_wait::wake_one(word);
}

/// Wake every thread parked on `word`.
#[inline]
pub fn wake_all(word: &AtomicU32) {
    atomic_wait::wake_all(word);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_immediately_when_value_differs() {
        let word = AtomicU32::new(2);
        wait_while(&word, 1);
        assert_eq!(word.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wake_one_releases_waiter() {
        let word = Arc::new(AtomicU32::new(1));
        let waiter_word = word.clone();

        let waiter = thread::spawn(move || {
            wait_while(&waiter_word, 1);
            waiter_word.load(Ordering::SeqCst)
        });

        thread::sleep(Duration::from_millis(20));
        word.store(2, Ordering::SeqCst);
        wake_one(&word);

        assert_eq!(waiter.join().unwrap(), 2);
    }

    #[test]
    fn test_wake_without_change_keeps_waiter_parked() {
        let word = Arc::new(AtomicU32::new(1));
        let waiter_word = word.clone();
        let (tx, rx) = std::sync::mpsc::channel();

        let waiter = thread::spawn(move || {
            wait_while(&waiter_word, 1);
            tx.send(()).unwrap();
        });

        // A wake with the word unchanged looks spurious and must not release.
        thread::sleep(Duration::from_millis(10));
        wake_all(&word);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        word.store(0, Ordering::SeqCst);
        wake_all(&word);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }
}
