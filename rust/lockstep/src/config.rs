//! Concurrency configuration for batch iterators.
//!
//! Concurrency is both the number of worker threads an iterator owns and the
//! size of the groups it partitions its sequence into. The value is captured
//! by a validated [`Concurrency`] type so that an invalid setting is rejected
//! where it is written, not where it is eventually used.
//!
//! A process-wide default (initially [`DEFAULT_CONCURRENCY`]) can be adjusted
//! with [`set_default_concurrency`]; it is consulted only by
//! [`BatchIterator::new`](crate::BatchIterator::new). Iterators constructed
//! with an explicit value never read it.

use std::sync::atomic::{AtomicUsize, Ordering};

use lockstep_common::{Result, error::Error};

/// The built-in concurrency used when no process-wide default has been set.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// A validated degree of concurrency.
///
/// Wraps a positive group size / worker count. Zero is rejected at
/// construction; there is no silent substitution of a fallback value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concurrency(usize);

impl Concurrency {
    /// Creates a `Concurrency` from the given value.
    ///
    /// Returns a configuration error if `value` is zero.
    pub fn new(value: usize) -> Result<Concurrency> {
        if value == 0 {
            return Err(Error::configuration("concurrency must be a positive integer"));
        }
        Ok(Concurrency(value))
    }

    /// Returns the underlying value.
    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for Concurrency {
    fn default() -> Concurrency {
        Concurrency(DEFAULT_CONCURRENCY)
    }
}

impl std::fmt::Display for Concurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Process-wide default concurrency for iterators constructed without an
/// explicit value. Always holds a validated (positive) number.
static GLOBAL_CONCURRENCY: AtomicUsize = AtomicUsize::new(DEFAULT_CONCURRENCY);

/// Sets the process-wide default concurrency.
///
/// Affects iterators constructed with
/// [`BatchIterator::new`](crate::BatchIterator::new) from this point on.
/// Existing iterators keep the concurrency they were created with.
///
/// # Thread Safety
///
/// This function is thread-safe and can be called from multiple threads
/// concurrently.
pub fn set_default_concurrency(concurrency: Concurrency) {
    GLOBAL_CONCURRENCY.store(concurrency.get(), Ordering::SeqCst);
}

/// Returns the current process-wide default concurrency.
pub fn default_concurrency() -> Concurrency {
    Concurrency(GLOBAL_CONCURRENCY.load(Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_common::error::ErrorKind;

    #[test]
    fn test_concurrency_accepts_positive_values() {
        assert_eq!(Concurrency::new(1).unwrap().get(), 1);
        assert_eq!(Concurrency::new(64).unwrap().get(), 64);
    }

    #[test]
    fn test_concurrency_rejects_zero() {
        let err = Concurrency::new(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Configuration { .. }));
    }

    #[test]
    fn test_concurrency_default() {
        assert_eq!(Concurrency::default().get(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_default_round_trip() {
        let original = default_concurrency();

        set_default_concurrency(Concurrency::new(3).unwrap());
        assert_eq!(default_concurrency().get(), 3);

        set_default_concurrency(original);
        assert_eq!(default_concurrency().get(), original.get());
    }
}
