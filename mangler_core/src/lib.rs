//! AFL-style byte-buffer mutation primitives and a havoc stacking driver.
//!
//! The caller owns a mutable buffer (its length is the capacity), the logical
//! value occupying a prefix of it, and a random generator; [`HavocEngine`]
//! applies a randomized stack of mutation operators and returns the new value
//! size. Everything is synchronous, allocation-light, and exactly
//! reproducible under a fixed generator seed.

pub mod accessor;
pub mod config;
pub mod havoc;
pub mod interesting;
pub mod mutation;
pub mod select;

pub use accessor::{Scalar, ScalarAccessor};
pub use config::{HavocSettings, MutatorConfig};
pub use havoc::{HavocEngine, HavocError};
pub use mutation::{MutationOp, SizeEffect};
