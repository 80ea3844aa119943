//! Filesystem primitives for filesem.
//!
//! Every create and delete of a lock file goes through this module so the
//! exclusive-create rule has exactly one implementation.

pub mod exclusive;

pub use exclusive::{CreateOutcome, create_exclusive, remove_if_exists, remove_if_unchanged};
