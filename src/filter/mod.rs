//! Recursive filters.

pub mod lores;
