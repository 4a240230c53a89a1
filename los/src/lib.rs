//! Generic line-of-sight computation over a square window.

mod raycast;
pub use raycast::{Los, OPAQUE, TRANSPARENT};
