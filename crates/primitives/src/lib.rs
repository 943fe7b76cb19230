//! Collection of data types shared by the rollup circuits, the tree store and
//! the proving orchestrator.

#[macro_use]
mod macros;

pub mod block;
pub mod buf;
pub mod circuits;
pub mod hash;
pub mod merkle;
pub mod params;
pub mod tree;
pub mod tx;

pub mod prelude;
