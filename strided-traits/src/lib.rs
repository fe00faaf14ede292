//! Shared traits for the strided-criterion workspace.
//!
//! This crate holds the element-type bounds shared by `strided-view`,
//! `strided-kernel`, and the criterion kernels, so downstream crates can
//! name them without depending on the traversal engine.

pub mod scalar;

pub use scalar::Real;
