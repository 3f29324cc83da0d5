//! Shared helpers.

pub mod exec;
pub mod plural;

pub use plural::plural_count;
