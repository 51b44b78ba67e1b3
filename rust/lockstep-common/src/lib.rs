//! Core definitions (error and result types), relied upon by the lockstep crates.

pub mod error;
pub mod result;

pub use result::Result;
