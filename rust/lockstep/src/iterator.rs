//! Order-preserving batch iteration over a borrowed sequence.
//!
//! This module provides [`BatchIterator`], the engine that partitions an
//! ordered sequence into fixed-size groups and runs a caller-supplied
//! function over each group on a bounded pool of worker threads. One group
//! runs to completion before the next is dispatched, outcomes are
//! re-assembled in the original element order, and short-circuiting
//! operations stop at group boundaries.

use std::ops::ControlFlow;
use std::panic;
use std::thread;

use log::{debug, trace};

use lockstep_common::{Result, error::Error};
use lockstep_pool::{join_handle::ScopedJoinHandle, thread_pool::ThreadPool};

use crate::config::{self, Concurrency};

/// A bounded-concurrency iterator over an ordered sequence.
///
/// `BatchIterator` borrows a slice and applies caller-supplied functions to
/// its elements, at most `concurrency` at a time. The slice is processed in
/// consecutive groups of at most `concurrency` elements. Dispatch is
/// group-synchronous: every work item of the current group finishes before
/// any item of the next group starts. Within a group, items run concurrently
/// in no particular order; across groups, execution is strictly sequential.
///
/// The iterator owns a pool of exactly `concurrency` worker threads, created
/// at construction and reused by every operation invoked on it. Dropping the
/// iterator joins the workers.
///
/// ## Ordering
///
/// All results are reported in the original element order, regardless of the
/// order in which work items completed: [`map`](Self::map) returns `out`
/// with `out[i] == f(&items[i])`, [`detect`](Self::detect) returns the
/// lowest-indexed match of the earliest matching group, and
/// [`select`](Self::select) preserves the relative order of the kept
/// elements.
///
/// ## Failure
///
/// A panic in the caller-supplied function does not kill a worker thread and
/// is not swallowed: once the failing element's group has completed, the
/// panic resumes on the calling thread and the iteration is abandoned. The
/// `try_` operations accept fallible functions instead and surface the first
/// failure as an error carrying the offending element's index.
///
/// ## Usage
///
/// ```
/// use lockstep::{BatchIterator, Concurrency};
///
/// let records = vec!["alpha", "beta", "gamma", "delta"];
/// let batch = BatchIterator::with_concurrency(&records, Concurrency::new(2).unwrap());
///
/// let lengths = batch.map(|r| r.len());
/// assert_eq!(lengths, vec![5, 4, 5, 5]);
///
/// let long_ones = batch.select(|r| r.len() > 4);
/// assert_eq!(long_ones, vec![&"alpha", &"gamma", &"delta"]);
/// ```
pub struct BatchIterator<'a, T> {
    items: &'a [T],
    concurrency: Concurrency,
    pool: ThreadPool,
}

impl<'a, T> BatchIterator<'a, T> {
    /// Creates a batch iterator over `items` using the process-wide default
    /// concurrency (see
    /// [`set_default_concurrency`](crate::set_default_concurrency)).
    pub fn new(items: &'a [T]) -> BatchIterator<'a, T> {
        Self::with_concurrency(items, config::default_concurrency())
    }

    /// Creates a batch iterator over `items` with an explicit concurrency.
    ///
    /// Spawns `concurrency` worker threads that live as long as the
    /// iterator.
    pub fn with_concurrency(items: &'a [T], concurrency: Concurrency) -> BatchIterator<'a, T> {
        debug!(
            "creating batch iterator: {} items, concurrency {concurrency}",
            items.len()
        );
        BatchIterator {
            items,
            concurrency,
            pool: ThreadPool::new(concurrency.get()),
        }
    }

    /// Returns the iterator's degree of concurrency: the group size and the
    /// number of worker threads.
    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Returns the number of elements in the underlying sequence.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the underlying sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T: Sync> BatchIterator<'a, T> {
    /// Applies `f` to every element for its side effects.
    ///
    /// Every element is visited exactly once. Within a group invocations run
    /// concurrently; across groups they are strictly sequenced, so an
    /// element's group must fully finish before any later element is
    /// touched.
    ///
    /// # Panics
    ///
    /// If `f` panics, the panic resumes on the calling thread once the
    /// failing element's group has completed, and no later group is
    /// dispatched.
    pub fn each<F>(&self, f: F)
    where
        F: Fn(&'a T) + Sync,
    {
        self.run_groups(f, |_, _| ControlFlow::Continue(()));
    }

    /// Applies `f` to every element and collects the results in the original
    /// element order.
    ///
    /// The output has exactly one entry per input element, with
    /// `out[i] == f(&items[i])` regardless of the order in which the work
    /// items completed.
    pub fn map<R, F>(&self, f: F) -> Vec<R>
    where
        F: Fn(&'a T) -> R + Sync,
        R: Send,
    {
        let mut results = Vec::with_capacity(self.items.len());
        self.run_groups(
            f,
            |_, outcomes| {
                results.extend(outcomes);
                ControlFlow::Continue(())
            },
        );
        results
    }

    /// Returns the first element for which `f` returns `true`, or `None` if
    /// there is no match.
    ///
    /// "First" means lowest index: within the earliest group containing a
    /// match, the lowest-indexed match wins even if a later element's work
    /// item finished sooner. Groups after the matching group are never
    /// dispatched; `f` is still invoked for every element of the matching
    /// group itself.
    pub fn detect<F>(&self, f: F) -> Option<&'a T>
    where
        F: Fn(&'a T) -> bool + Sync,
    {
        let mut found = None;
        self.run_groups(
            f,
            |group_start, outcomes| match outcomes.iter().position(|hit| *hit) {
                Some(offset) => {
                    found = Some(&self.items[group_start + offset]);
                    ControlFlow::Break(())
                }
                None => ControlFlow::Continue(()),
            },
        );
        found
    }

    /// Returns every element for which `f` returns `true`, preserving the
    /// elements' original relative order.
    ///
    /// All groups are dispatched; `select` never short-circuits.
    pub fn select<F>(&self, f: F) -> Vec<&'a T>
    where
        F: Fn(&'a T) -> bool + Sync,
    {
        let mut selected = Vec::new();
        self.run_groups(
            f,
            |group_start, outcomes| {
                for (offset, hit) in outcomes.into_iter().enumerate() {
                    if hit {
                        selected.push(&self.items[group_start + offset]);
                    }
                }
                ControlFlow::Continue(())
            },
        );
        selected
    }

    /// Returns `true` if `f` returns `true` for every element.
    ///
    /// Stops after the first group containing a `false` outcome; later
    /// groups are never dispatched. Vacuously `true` for an empty sequence.
    pub fn all<F>(&self, f: F) -> bool
    where
        F: Fn(&'a T) -> bool + Sync,
    {
        let mut all_hold = true;
        self.run_groups(
            f,
            |_, outcomes| {
                if outcomes.iter().any(|hit| !hit) {
                    all_hold = false;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );
        all_hold
    }

    /// Returns `true` if `f` returns `true` for at least one element.
    ///
    /// Stops after the first group containing a `true` outcome; later groups
    /// are never dispatched. Vacuously `false` for an empty sequence.
    pub fn any<F>(&self, f: F) -> bool
    where
        F: Fn(&'a T) -> bool + Sync,
    {
        let mut any_holds = false;
        self.run_groups(
            f,
            |_, outcomes| {
                if outcomes.iter().any(|hit| *hit) {
                    any_holds = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );
        any_holds
    }

    /// Fallible form of [`each`](Self::each).
    ///
    /// Stops at the first failing element, scanned in index order at the
    /// group boundary, and returns an error carrying that element's index
    /// and the underlying cause. Later groups are never dispatched.
    pub fn try_each<F, E>(&self, f: F) -> Result<()>
    where
        F: Fn(&'a T) -> std::result::Result<(), E> + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut failure = None;
        self.run_groups(
            f,
            |group_start, outcomes| match resolve_group_errors(group_start, outcomes) {
                Ok(_) => ControlFlow::Continue(()),
                Err(err) => {
                    failure = Some(err);
                    ControlFlow::Break(())
                }
            },
        );
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Fallible form of [`map`](Self::map).
    ///
    /// On success the output matches [`map`](Self::map). On the first
    /// failure, scanned in index order at the group boundary, the partially
    /// computed results are dropped and the error is returned with the
    /// failing element's index.
    pub fn try_map<R, F, E>(&self, f: F) -> Result<Vec<R>>
    where
        F: Fn(&'a T) -> std::result::Result<R, E> + Sync,
        R: Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut results = Vec::with_capacity(self.items.len());
        let mut failure = None;
        self.run_groups(
            f,
            |group_start, outcomes| match resolve_group_errors(group_start, outcomes) {
                Ok(values) => {
                    results.extend(values);
                    ControlFlow::Continue(())
                }
                Err(err) => {
                    failure = Some(err);
                    ControlFlow::Break(())
                }
            },
        );
        match failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }

    /// Fallible form of [`detect`](Self::detect).
    ///
    /// Within a group, outcomes are scanned in index order and the first
    /// terminal event wins: a match at a lower index beats a failure at a
    /// higher index, and vice versa. This reproduces what a sequential scan
    /// would have observed.
    pub fn try_detect<F, E>(&self, f: F) -> Result<Option<&'a T>>
    where
        F: Fn(&'a T) -> std::result::Result<bool, E> + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut resolution = Ok(None);
        self.run_groups(
            f,
            |group_start, outcomes| {
                for (offset, outcome) in outcomes.into_iter().enumerate() {
                    match outcome {
                        Ok(true) => {
                            resolution = Ok(Some(&self.items[group_start + offset]));
                            return ControlFlow::Break(());
                        }
                        Ok(false) => {}
                        Err(source) => {
                            resolution = Err(Error::worker(group_start + offset, source));
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            },
        );
        resolution
    }

    /// Fallible form of [`select`](Self::select).
    ///
    /// On the first failure, scanned in index order at the group boundary,
    /// the partially selected elements are dropped and the error is
    /// returned.
    pub fn try_select<F, E>(&self, f: F) -> Result<Vec<&'a T>>
    where
        F: Fn(&'a T) -> std::result::Result<bool, E> + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut selected = Vec::new();
        let mut failure = None;
        self.run_groups(
            f,
            |group_start, outcomes| {
                for (offset, outcome) in outcomes.into_iter().enumerate() {
                    match outcome {
                        Ok(true) => selected.push(&self.items[group_start + offset]),
                        Ok(false) => {}
                        Err(source) => {
                            failure = Some(Error::worker(group_start + offset, source));
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            },
        );
        match failure {
            Some(err) => Err(err),
            None => Ok(selected),
        }
    }

    /// Fallible form of [`all`](Self::all).
    ///
    /// Within a group, outcomes are scanned in index order and the first
    /// terminal event wins: a `false` outcome at a lower index resolves the
    /// operation to `Ok(false)` even when a later element of the same group
    /// failed.
    pub fn try_all<F, E>(&self, f: F) -> Result<bool>
    where
        F: Fn(&'a T) -> std::result::Result<bool, E> + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut resolution = Ok(true);
        self.run_groups(
            f,
            |group_start, outcomes| {
                for (offset, outcome) in outcomes.into_iter().enumerate() {
                    match outcome {
                        Ok(true) => {}
                        Ok(false) => {
                            resolution = Ok(false);
                            return ControlFlow::Break(());
                        }
                        Err(source) => {
                            resolution = Err(Error::worker(group_start + offset, source));
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            },
        );
        resolution
    }

    /// Fallible form of [`any`](Self::any).
    ///
    /// Within a group, outcomes are scanned in index order and the first
    /// terminal event wins, exactly as for [`try_all`](Self::try_all).
    pub fn try_any<F, E>(&self, f: F) -> Result<bool>
    where
        F: Fn(&'a T) -> std::result::Result<bool, E> + Sync,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut resolution = Ok(false);
        self.run_groups(
            f,
            |group_start, outcomes| {
                for (offset, outcome) in outcomes.into_iter().enumerate() {
                    match outcome {
                        Ok(true) => {
                            resolution = Ok(true);
                            return ControlFlow::Break(());
                        }
                        Ok(false) => {}
                        Err(source) => {
                            resolution = Err(Error::worker(group_start + offset, source));
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            },
        );
        resolution
    }

    /// The dispatch loop shared by all operations.
    ///
    /// Partitions the sequence into consecutive groups of at most
    /// `concurrency` elements. For each group, one work item per element is
    /// submitted to the pool, then every handle is joined in submission
    /// order. Joining in submission order is what re-assembles outcomes in
    /// element order, and joining the whole group is what makes dispatch
    /// group-synchronous: the calling thread blocks here exactly once per
    /// group.
    ///
    /// If any work item panicked, the lowest-indexed panic resumes on the
    /// calling thread after the group has completed. Otherwise `handle`
    /// receives the group's starting index and its outcomes, updates the
    /// aggregate on the calling thread, and decides whether the next group
    /// is dispatched at all.
    fn run_groups<R, V, H>(&self, visit: V, mut handle: H)
    where
        V: Fn(&'a T) -> R + Sync,
        R: Send,
        H: FnMut(usize, Vec<R>) -> ControlFlow<()>,
    {
        let group_size = self.concurrency.get();
        let mut group_start = 0;
        for group in self.items.chunks(group_size) {
            trace!(
                "dispatching group of {} at index {group_start}",
                group.len()
            );
            let outcomes = self.pool.scope(|scope| {
                let handles: Vec<_> = group
                    .iter()
                    .map(|item| {
                        let visit = &visit;
                        scope.submit(move || visit(item))
                    })
                    .collect();
                ScopedJoinHandle::join_all(handles)
            });
            let outcomes = resolve_group_panics(outcomes);
            if handle(group_start, outcomes).is_break() {
                break;
            }
            group_start += group.len();
        }
    }
}

/// Unwraps a completed group's outcomes, resuming the lowest-indexed panic
/// if any work item panicked. Outcomes arrive in element order, so the
/// first `Err` is the lowest-indexed one.
fn resolve_group_panics<R>(outcomes: Vec<thread::Result<R>>) -> Vec<R> {
    let mut values = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
    values
}

/// Collects a completed group's fallible outcomes, converting the first
/// failure in element order into a worker error carrying the element's
/// absolute index.
fn resolve_group_errors<V, E>(
    group_start: usize,
    outcomes: Vec<std::result::Result<V, E>>,
) -> Result<Vec<V>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let mut values = Vec::with_capacity(outcomes.len());
    for (offset, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => values.push(value),
            Err(source) => return Err(Error::worker(group_start + offset, source)),
        }
    }
    Ok(values)
}
