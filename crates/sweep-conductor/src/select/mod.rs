//! Collaborators that decide what a run works on.

pub mod files;
pub mod intent;
pub mod modified;
