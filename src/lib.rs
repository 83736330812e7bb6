//! Bookstore application library
//!
//! Wires the kernel, the store and the HTTP layer together around the
//! project modules.
#![recursion_limit = "256"]

pub mod app;
pub mod modules;

pub use app::App;
