//! Helpers shared by the tests of this crate and of the crates depending on it.

#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod pipeline;
