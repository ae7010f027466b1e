//! IO modules - side effects (network, filesystem, child processes)

pub mod download;
pub mod extract;
