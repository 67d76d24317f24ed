//! [`Solver`](crate::Solver) implementations approximating gravity with an octree.

mod adaptive;
mod dense;

pub use adaptive::{BarnesHut, Bounds};
pub use dense::DenseBarnesHut;
