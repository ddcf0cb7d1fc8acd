//! # meshsmooth pipeline
//!
//! Ties the stages together: one [`Reducer`] pass turns a triangle soup into
//! a reconstructed, cleaned mesh, and the [`RefinementDriver`] repeats that
//! pass over files with progress reporting and cancellation.

pub mod config;
pub mod reduce;
pub mod driver;

pub use config::*;
pub use reduce::*;
pub use driver::*;
