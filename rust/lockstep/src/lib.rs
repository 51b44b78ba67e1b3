//! Bounded-concurrency, order-preserving batch iteration.
//!
//! This crate applies caller-supplied functions to the elements of an ordered
//! sequence using a fixed-size pool of worker threads. The sequence is
//! processed in consecutive groups of at most `concurrency` elements: a group
//! is dispatched to the workers, runs to completion, and only then does the
//! next group start. Results always come back in the original element order,
//! no matter how the work items completed in time.
//!
//! # Key Components
//!
//! - [`BatchIterator`] - The iteration engine: `each`, `map`, `detect`,
//!   `select`, `all`, `any`, plus fallible `try_` variants that surface the
//!   failing element's index
//! - [`Concurrency`] - A validated degree of concurrency (group size and
//!   worker count)
//! - [`set_default_concurrency`] / [`default_concurrency`] - The process-wide
//!   default consulted by [`BatchIterator::new`]
//!
//! # Example
//!
//! ```
//! use lockstep::{BatchIterator, Concurrency};
//!
//! let items = vec![1, 2, 3, 4, 5];
//! let batch = BatchIterator::with_concurrency(&items, Concurrency::new(2).unwrap());
//!
//! let doubled = batch.map(|n| n * 2);
//! assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
//!
//! let first_even = batch.detect(|n| n % 2 == 0);
//! assert_eq!(first_even, Some(&2));
//! ```
//!
//! # Concurrency Model
//!
//! Each iterator owns its pool of worker threads, created at construction and
//! reused by every operation invoked on the iterator. Dropping the iterator
//! joins the workers. The calling thread blocks exactly once per group while
//! the group's work items run; aggregation happens on the calling thread
//! only, after the group has completed.

pub mod config;
pub mod iterator;

pub use config::{Concurrency, DEFAULT_CONCURRENCY, default_concurrency, set_default_concurrency};
pub use iterator::BatchIterator;

pub use lockstep_common::{Result, error};
pub use lockstep_pool as pool;
