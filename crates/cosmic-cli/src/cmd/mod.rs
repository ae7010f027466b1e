//! Command implementations

pub mod add;
pub mod hash;
