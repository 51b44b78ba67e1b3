//! Thread pool implementation for bounded-concurrency work execution.
//!
//! This module provides a fixed-size pool of worker threads. Work items can
//! be submitted for execution and waited on for their outcome using
//! [`JoinHandle`], or spawned inside a [`Scope`] when they borrow data from
//! the caller's stack frame.
//!
//! The pool owns its worker threads: dropping the pool closes the work
//! queue, lets the workers drain whatever was already submitted, and joins
//! every worker thread before the drop returns. No threads outlive the pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::{
    join_handle::{JoinHandle, ScopedJoinHandle},
    oneshot,
    queue::{self, Receiver, Sender},
};

/// A boxed work item that can be executed by a worker thread.
type Task = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads for executing work items.
///
/// `ThreadPool` manages `num_threads` worker threads that execute work items
/// submitted through [`submit`](Self::submit) or through a
/// [`scope`](Self::scope). Work items are distributed among the workers via
/// an internal queue; at most `num_threads` items run at any instant.
///
/// ## Panic Handling
///
/// A work item that panics does not kill its worker thread. The panic is
/// caught at the work item boundary and delivered through the item's join
/// handle, where the joining thread can inspect or resume it.
///
/// ## Lifecycle
///
/// The pool is owned, not shared: dropping it releases every worker thread.
/// Work items still queued at drop time are executed before the workers
/// exit, so an outcome that was promised by a handle is always delivered.
pub struct ThreadPool {
    queue: Sender<Task>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Creates a new `ThreadPool` with the specified number of worker
    /// threads.
    ///
    /// This constructor spawns `num_threads` worker threads that process
    /// work items as they become available. Each worker runs in a loop,
    /// blocking on the shared queue between items.
    ///
    /// # Arguments
    ///
    /// * `num_threads` - The number of worker threads to spawn. Must be
    ///   greater than 0.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is 0.
    pub fn new(num_threads: usize) -> ThreadPool {
        assert_ne!(num_threads, 0);

        let (tx, rx) = queue::channel::<Task>();
        let workers = (0..num_threads)
            .map(|i| {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("lockstep-worker-{i}"))
                    .spawn(move || Self::thread_fn(rx))
                    .expect("spawn thread")
            })
            .collect();

        ThreadPool { queue: tx, workers }
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submits a work item and returns a handle to wait for its outcome.
    ///
    /// The provided function `f` is executed on one of the worker threads.
    /// The returned [`JoinHandle`] resolves to `Ok` with the function's
    /// return value, or to `Err` with the panic payload if the function
    /// panicked.
    ///
    /// # Arguments
    ///
    /// * `f` - The function to execute on a worker thread.
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been shut down. Submitting to a pool
    /// that no longer runs work is a lifecycle bug, not a recoverable
    /// condition.
    pub fn submit<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<thread::Result<R>>();
        let task: Task = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            tx.send(outcome);
        });
        if self.queue.send(task).is_err() {
            panic!("work submitted to a terminated pool");
        }
        JoinHandle::new(rx)
    }

    /// Creates a scope for executing work items that borrow local data.
    ///
    /// All work items submitted within the scope are guaranteed to have
    /// finished before this method returns, which is what makes it sound
    /// for them to capture references to variables on the caller's stack.
    ///
    /// The guarantee holds even when `f` itself panics: the pool first
    /// waits for every submitted item to finish and only then resumes the
    /// panic on the calling thread.
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that receives a [`Scope`] reference and can submit
    ///   work items within that scope.
    ///
    /// # Returns
    ///
    /// The return value of the closure `f`.
    pub fn scope<'env, F, T>(&self, f: F) -> T
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> T,
    {
        let scope = Scope {
            queue: &self.queue,
            tracker: Arc::new(ScopeTracker::new()),
            scope: std::marker::PhantomData,
            env: std::marker::PhantomData,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));
        scope.tracker.wait();
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Worker thread body: processes work items until the queue is closed
    /// and drained.
    fn thread_fn(rx: Receiver<Task>) {
        while let Some(task) = rx.recv() {
            task();
        }
    }
}

impl Drop for ThreadPool {
    /// Shuts the pool down, joining every worker thread.
    ///
    /// Work items that were already submitted are still executed; new
    /// submissions are refused from this point on.
    fn drop(&mut self) {
        self.queue.close();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// A scope for executing work items that borrow from the local environment.
///
/// `Scope` allows submitting closures that capture references to
/// stack-allocated data, without the `'static` requirement of
/// [`ThreadPool::submit`]. The enclosing [`scope`](ThreadPool::scope) call
/// waits for every submitted item before returning, so borrowed data always
/// outlives the work that uses it.
pub struct Scope<'scope, 'env: 'scope> {
    queue: &'scope Sender<Task>,
    tracker: Arc<ScopeTracker>,
    scope: std::marker::PhantomData<&'scope mut &'scope ()>,
    env: std::marker::PhantomData<&'env mut &'env ()>,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    /// Submits a work item to the pool from within the scope.
    ///
    /// The closure may capture references to data that lives at least as
    /// long as the scope's environment. The returned handle resolves to the
    /// closure's outcome, with panics carried in the `Err` arm exactly as
    /// for [`ThreadPool::submit`].
    ///
    /// Dropping the handle without joining it is allowed; the scope still
    /// waits for the work item itself.
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been shut down, like
    /// [`ThreadPool::submit`].
    pub fn submit<F, R>(&'scope self, f: F) -> ScopedJoinHandle<'scope, R>
    where
        F: FnOnce() -> R + Send + 'scope,
        R: Send + 'scope,
    {
        let tracker = self.tracker.clone();
        tracker.task_spawned();
        let (tx, rx) = oneshot::channel::<thread::Result<R>>();
        let work_fn = move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            tx.send(outcome);
            tracker.task_completed();
        };
        let work_fn = Box::into_raw(Box::new(work_fn) as Box<dyn FnOnce() + Send + 'scope>);
        // casting away the 'scope lifetime, pretending our F is 'static.
        // Sound because the scope waits on the tracker before returning,
        // so the closure cannot outlive the data it borrows.
        let work_fn = unsafe {
            Box::from_raw(std::mem::transmute::<
                *mut (dyn FnOnce() + Send + 'scope),
                *mut (dyn FnOnce() + Send + 'static),
            >(work_fn))
        };
        if self.queue.send(work_fn).is_err() {
            self.tracker.task_completed();
            panic!("work submitted to a terminated pool");
        }
        ScopedJoinHandle::new(rx)
    }
}

/// Tracks the number of in-flight work items belonging to a scope.
///
/// The scope increments the counter when an item is submitted; the worker
/// decrements it after the item's outcome has been delivered. [`wait`]
/// blocks until the counter reaches zero.
///
/// [`wait`]: ScopeTracker::wait
struct ScopeTracker {
    active: Mutex<usize>,
    idle: Condvar,
}

impl ScopeTracker {
    fn new() -> ScopeTracker {
        ScopeTracker {
            active: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    fn task_spawned(&self) {
        *self.active.lock().unwrap() += 1;
    }

    fn task_completed(&self) {
        let mut active = self.active.lock().unwrap();
        *active -= 1;
        if *active == 0 {
            drop(active);
            self.idle.notify_all();
        }
    }

    /// Blocks until every tracked work item has completed.
    fn wait(&self) {
        let guard = self.active.lock().unwrap();
        let _guard = self.idle.wait_while(guard, |active| *active > 0).unwrap();
    }
}
