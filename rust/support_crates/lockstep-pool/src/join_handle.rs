//! Join handle implementations for worker pool outcomes.
//!
//! This module provides handle types for waiting on work items executed by
//! the pool. It offers both unrestricted lifetime ([`JoinHandle`]) and scoped
//! lifetime ([`ScopedJoinHandle`]) variants to support different execution
//! patterns.
//!
//! A handle resolves to a [`std::thread::Result`]: `Ok` carries the work
//! item's return value, `Err` carries the payload of a panic raised inside
//! the work item. Panics are never swallowed by the pool; the thread that
//! joins the handle decides whether to resume them.

use std::thread;

use crate::oneshot::OneshotReceiver;

/// A handle for waiting on the outcome of a work item with `'static`
/// lifetime.
///
/// `JoinHandle` represents a work item that has been submitted for execution
/// and provides methods to check whether it finished and to retrieve its
/// outcome. The handle is backed by a oneshot channel receiver fed by the
/// worker thread that ran the item.
///
/// ## Lifecycle
///
/// 1. **Created**: submitting a work item returns a `JoinHandle`
/// 2. **Pending**: the item is queued or running
/// 3. **Ready**: the item finished and its outcome is available
/// 4. **Consumed**: the outcome has been retrieved via [`join()`](Self::join)
pub struct JoinHandle<R>(OneshotReceiver<thread::Result<R>>);

impl<R> JoinHandle<R> {
    /// Creates a new `JoinHandle` from a oneshot receiver.
    pub(crate) fn new(rx: OneshotReceiver<thread::Result<R>>) -> JoinHandle<R> {
        JoinHandle(rx)
    }

    /// Checks if the outcome is ready without blocking.
    pub fn is_ready(&self) -> bool {
        !self.0.is_pending()
    }

    /// Waits for the work item to finish and returns its outcome.
    ///
    /// Blocks the current thread until the item has run to completion on a
    /// worker thread. Returns `Ok(value)` if the item returned normally and
    /// `Err(payload)` if it panicked. Consumes the handle.
    pub fn join(self) -> thread::Result<R> {
        self.0.recv().expect("recv")
    }

    /// Waits for all handles and collects their outcomes into a vector.
    ///
    /// Every handle is joined before this method returns, even when earlier
    /// handles resolve to panics. Outcomes are collected in the same order
    /// as the input handles.
    pub fn join_all(handles: impl IntoIterator<Item = JoinHandle<R>>) -> Vec<thread::Result<R>> {
        handles.into_iter().map(|h| h.join()).collect()
    }
}

/// A handle for waiting on the outcome of a scoped work item.
///
/// `ScopedJoinHandle` is the counterpart of [`JoinHandle`] for work items
/// submitted within a [`Scope`](crate::thread_pool::Scope). The `'scope`
/// lifetime ties the handle to its scope, which is what allows the work item
/// to borrow data from the enclosing environment.
pub struct ScopedJoinHandle<'scope, R>(
    OneshotReceiver<thread::Result<R>>,
    std::marker::PhantomData<&'scope ()>,
);

impl<'scope, R> ScopedJoinHandle<'scope, R> {
    /// Creates a new `ScopedJoinHandle` from a oneshot receiver.
    pub(crate) fn new(rx: OneshotReceiver<thread::Result<R>>) -> ScopedJoinHandle<'scope, R> {
        ScopedJoinHandle(rx, Default::default())
    }

    /// Checks if the outcome is ready without blocking.
    pub fn is_ready(&self) -> bool {
        !self.0.is_pending()
    }

    /// Waits for the scoped work item to finish and returns its outcome.
    ///
    /// Behaves like [`JoinHandle::join`], including the panic-carrying
    /// `Err` arm.
    pub fn join(self) -> thread::Result<R> {
        self.0.recv().expect("recv")
    }

    /// Waits for all handles and collects their outcomes into a vector.
    ///
    /// Every handle is joined before this method returns. This is the
    /// building block for group-synchronous dispatch: a batch of work items
    /// is submitted, then the whole batch is awaited at once, in order.
    pub fn join_all(
        handles: impl IntoIterator<Item = ScopedJoinHandle<'scope, R>>,
    ) -> Vec<thread::Result<R>> {
        handles.into_iter().map(|h| h.join()).collect()
    }
}
