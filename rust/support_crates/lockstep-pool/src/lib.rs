//! A fixed-size worker pool for executing batches of blocking work.
//!
//! This crate provides the threading primitives behind bounded-concurrency
//! batch iteration. Work items are submitted to a pool of long-lived worker
//! threads and waited on through join handles that preserve the submission
//! order chosen by the caller.
//!
//! # Key Components
//!
//! ## Thread Pool
//!
//! - [`thread_pool::ThreadPool`] - A fixed-size pool of worker threads with an
//!   owned lifecycle: dropping the pool drains outstanding work and joins
//!   every worker
//!
//! ## Communication Channels
//!
//! - [`oneshot`] - Single-value communication between a work item and the
//!   thread waiting on its handle
//!
//! ## Task Management
//!
//! - [`join_handle`] - Handles for waiting on work item outcomes, with both
//!   static and scoped lifetime variants. Outcomes carry panics out of the
//!   worker thread instead of swallowing them.
//!
//! # Design Philosophy
//!
//! The pool never drops a work item outcome on the floor. A work item that
//! panics poisons nothing: the panic payload travels through the handle to
//! whichever thread joins it, and the worker thread lives on to serve the
//! next item. Waiting is always blocking and condition-variable based, never
//! a poll loop.

pub mod join_handle;
pub mod oneshot;
pub mod thread_pool;

mod queue;
