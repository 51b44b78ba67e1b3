//! A blocking work queue shared by the pool's worker threads.
//!
//! This is a minimal multi-consumer queue built on `Mutex` and `Condvar`.
//! Unlike `std::sync::mpsc`, the receiving half can be cloned so that every
//! worker thread blocks on the same queue. The queue is unbounded and can be
//! closed: once closed, further sends are refused while receivers keep
//! draining whatever is already buffered, then observe the end of the queue.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Creates a work queue, returning the sender/receiver halves.
///
/// Items become available on the [`Receiver`] in the order they were sent.
/// [`recv`](Receiver::recv) blocks until an item is available or the queue
/// is closed and drained. Dropping the [`Sender`] closes the queue.
pub(crate) fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            items: VecDeque::new(),
            closed: false,
        }),
        available: Condvar::new(),
    });
    (Sender(shared.clone()), Receiver(shared))
}

/// The sending half of the work queue.
pub(crate) struct Sender<T>(Arc<Shared<T>>);

impl<T> Sender<T> {
    /// Enqueues an item, returning it back if the queue has been closed.
    pub(crate) fn send(&self, item: T) -> Result<(), T> {
        let mut state = self.0.state.lock().unwrap();
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.0.available.notify_one();
        Ok(())
    }

    /// Closes the queue.
    ///
    /// Subsequent sends fail. Receivers drain the remaining items and then
    /// observe the end of the queue. Closing an already closed queue is a
    /// no-op.
    pub(crate) fn close(&self) {
        let mut state = self.0.state.lock().unwrap();
        state.closed = true;
        drop(state);
        self.0.available.notify_all();
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The receiving half of the work queue. Worker threads share the queue by
/// cloning this handle.
pub(crate) struct Receiver<T>(Arc<Shared<T>>);

impl<T> Receiver<T> {
    /// Dequeues the next item, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub(crate) fn recv(&self) -> Option<T> {
        let mut state = self.0.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self.0.available.wait(state).unwrap();
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Receiver<T> {
        Receiver(self.0.clone())
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_recv_in_order() {
        let (tx, rx) = channel::<i32>();
        for i in 0..100 {
            tx.send(i).unwrap();
        }
        for i in 0..100 {
            assert_eq!(rx.recv(), Some(i));
        }
    }

    #[test]
    fn test_recv_blocks_until_send() {
        let (tx, rx) = channel::<&str>();

        let handle = thread::spawn(move || rx.recv());

        thread::sleep(Duration::from_millis(50));
        tx.send("late").unwrap();

        assert_eq!(handle.join().unwrap(), Some("late"));
    }

    #[test]
    fn test_close_drains_then_ends() {
        let (tx, rx) = channel::<i32>();
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        tx.close();

        assert_eq!(tx.send(3), Err(3));

        assert_eq!(rx.recv(), Some(1));
        assert_eq!(rx.recv(), Some(2));
        assert_eq!(rx.recv(), None);
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_drop_sender_closes_queue() {
        let (tx, rx) = channel::<i32>();
        tx.send(7).unwrap();
        drop(tx);

        assert_eq!(rx.recv(), Some(7));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_close_wakes_all_blocked_receivers() {
        let (tx, rx) = channel::<i32>();
        let rx2 = rx.clone();

        let h1 = thread::spawn(move || rx.recv());
        let h2 = thread::spawn(move || rx2.recv());

        thread::sleep(Duration::from_millis(50));
        tx.close();

        assert_eq!(h1.join().unwrap(), None);
        assert_eq!(h2.join().unwrap(), None);
    }

    #[test]
    fn test_multiple_receivers_share_items() {
        const TOTAL: usize = 1000;

        let (tx, rx) = channel::<usize>();
        for i in 0..TOTAL {
            tx.send(i).unwrap();
        }
        drop(tx);

        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let rx = rx.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(item) = rx.recv() {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<usize> = receivers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        let expected: Vec<usize> = (0..TOTAL).collect();
        assert_eq!(all, expected);
    }
}
