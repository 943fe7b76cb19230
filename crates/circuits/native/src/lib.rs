//! Native evaluation of the rollup circuits.
//!
//! Nothing here is zero knowledge: each circuit's relation is checked and its
//! public outputs computed directly, and the "proof" is the borsh encoding of
//! those outputs.  Recursive circuits check that the proofs they consume
//! commit to the outputs they are given.

mod circuits;
mod proof;
mod prover;

pub use circuits::*;
pub use proof::*;
pub use prover::*;
