//! Host-facing service implementations: built-in tools and test fixtures.

pub mod mock;
pub mod stdio_tools;
