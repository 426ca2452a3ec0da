//! Deterministic random and quasi-random sequence generators.
//!
//! The NA search needs three generator families, all scoped to one search
//! invocation so that concurrent searches never share state:
//!
//! 1. [`Fibonacci`] — a lagged-Fibonacci pseudo-random generator (55-element
//!    lag table, seeded from a 64-bit xorshift-multiply generator). Supplies
//!    the array-shuffle (`jumble`) used for randomized tie-breaking and the
//!    seed deviates for the SAS direction-number tables.
//! 2. [`Sobol1`] — the classic 6-dimension bit-reversal Sobol generator with
//!    hard-coded direction-number seeds; one coordinate set per call.
//! 3. [`SasGenerator`] — an n-dimensional Sobol–Antonov–Saleev family, one
//!    independent sequence per (axis, cell) pair of the NA walk, advanced
//!    either as a vector or one sequence at a time.
//!
//! These exist for **reproducibility**, not statistical or cryptographic
//! quality: a search with the same seed and configuration must produce
//! bit-identical sample sequences.

mod fibonacci;
mod sas;
mod sobol;

pub use fibonacci::Fibonacci;
pub use sas::{SasGenerator, MAX_SEQ};
pub use sobol::Sobol1;
