//! Core compute primitives (Vector, Matrix).
//!
//! Feature tables are turned into these types before scaling and fitting.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
