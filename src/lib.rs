//! Nested todos and habits with per-task countdown timers.
//!
//! The forest of tasks is an immutable value: every operation in [`ops`]
//! returns a new [`model::Forest`] that shares untouched subtrees with the
//! old one. [`controller::Controller`] owns the current forest and saves
//! each change through an [`io::store::Store`].

pub mod cli;
pub mod controller;
pub mod io;
pub mod model;
pub mod ops;
pub mod util;
