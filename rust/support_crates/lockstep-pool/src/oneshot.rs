//! A thread-safe oneshot channel for single-value communication.
//!
//! This module provides a channel that transmits exactly one value from a
//! single sender to a single receiver. It is the delivery mechanism behind
//! join handles: a work item sends its outcome through the sender half, and
//! whichever thread joins the handle blocks on the receiver half.
//!
//! ## Channel Lifecycle
//!
//! The channel moves through these states:
//!
//! 1. Pending: no value has been sent yet
//! 2. Ready: a value has been sent and is waiting to be consumed
//! 3. Closed: the value has been taken, or the sender was dropped without
//!    sending one
//!
//! Both [`send`](OneshotSender::send) and [`recv`](OneshotReceiver::recv)
//! consume their half, so a value cannot be sent or received twice. Dropping
//! the sender without sending closes the channel and wakes the receiver.
//!
//! ## Thread Safety
//!
//! `OneshotSender<T>` and `OneshotReceiver<T>` are `Send` and `Sync` when
//! `T: Send`. Synchronization is handled with a `Mutex` and a `Condvar`;
//! waiting never spins.

use std::sync::{Arc, Condvar, Mutex};

/// Creates a new oneshot channel, returning a sender and receiver pair.
pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let cell = Arc::new(OneshotCell::new());
    (
        OneshotSender {
            cell: cell.clone(),
            sent: false,
        },
        OneshotReceiver(cell),
    )
}

/// The sending half of a oneshot channel.
///
/// If the sender is dropped without sending, the channel is closed and the
/// receiver observes `None`.
pub struct OneshotSender<T> {
    cell: Arc<OneshotCell<T>>,
    sent: bool,
}

impl<T> OneshotSender<T> {
    /// Sends a value through the channel, waking the receiver if it is
    /// already blocked. Consumes the sender.
    pub fn send(mut self, value: T) {
        self.cell.set(value);
        self.sent = true;
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        if !self.sent {
            self.cell.close();
        }
    }
}

/// The receiving half of a oneshot channel.
pub struct OneshotReceiver<T>(Arc<OneshotCell<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until a value is received or the channel is closed.
    ///
    /// Returns `Some(value)` if a value was sent, or `None` if the sender
    /// was dropped without sending one.
    pub fn recv(self) -> Option<T> {
        self.0.wait()
    }

    /// Checks if the channel is still pending (no value sent yet).
    pub fn is_pending(&self) -> bool {
        self.0.is_pending()
    }
}

/// Internal cell that carries the state and synchronization for the channel.
struct OneshotCell<T> {
    value: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> OneshotCell<T> {
    fn new() -> OneshotCell<T> {
        OneshotCell {
            value: Mutex::new(State::Pending),
            ready: Condvar::new(),
        }
    }

    /// Stores the value and wakes the receiver. Only reachable while the
    /// state is `Pending`: sending consumes the sender, and the sender only
    /// closes the cell when it did not send.
    fn set(&self, value: T) {
        let mut state = self.value.lock().unwrap();
        *state = State::Ready(value);
        drop(state);
        self.ready.notify_all();
    }

    /// Transitions a `Pending` cell to `Closed` and wakes the receiver.
    fn close(&self) {
        let mut state = self.value.lock().unwrap();
        if state.is_pending() {
            *state = State::Closed;
        }
        drop(state);
        self.ready.notify_all();
    }

    fn is_pending(&self) -> bool {
        self.value.lock().unwrap().is_pending()
    }

    /// Blocks until a value is available or the channel is closed.
    fn wait(&self) -> Option<T> {
        let guard = self.value.lock().unwrap();
        let mut guard = self
            .ready
            .wait_while(guard, |state| state.is_pending())
            .unwrap();
        guard.take()
    }
}

/// Internal state of the oneshot channel.
///
/// The state transitions are:
/// - `Pending` -> `Ready(T)` when a value is sent
/// - `Pending` -> `Closed` when the sender is dropped without sending
/// - `Ready(T)` -> `Closed` when the value is taken
enum State<T> {
    Pending,
    Ready(T),
    Closed,
}

impl<T> State<T> {
    fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    /// Takes the value out, leaving the state `Closed`.
    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, State::Closed) {
            State::Ready(value) => Some(value),
            State::Closed => None,
            State::Pending => unreachable!("woken while the channel is still pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::UnsafeCell, time::Duration};

    use crate::oneshot::{self, OneshotReceiver, OneshotSender};

    #[test]
    fn test_oneshot_send_sync() {
        fn is_send_sync<T: Send + Sync>() {}

        fn test<T: Send>() {
            is_send_sync::<OneshotReceiver<T>>();
            is_send_sync::<OneshotSender<T>>();
        }

        test::<usize>();
        test::<UnsafeCell<usize>>();
    }

    #[test]
    fn test_oneshot_basics() {
        let (tx, rx) = oneshot::channel::<usize>();
        assert!(rx.is_pending());
        tx.send(1);
        assert_eq!(rx.recv(), Some(1));

        let (tx, rx) = oneshot::channel::<usize>();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            tx.send(1);
        });
        assert_eq!(rx.recv(), Some(1));
    }

    #[test]
    fn test_oneshot_sender_dropped_without_sending() {
        let (tx, rx) = oneshot::channel::<usize>();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            drop(tx);
        });
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_oneshot_receiver_dropped_before_send() {
        let (tx, rx) = oneshot::channel::<String>();
        drop(rx);
        tx.send("nobody listening".to_string());
    }
}
